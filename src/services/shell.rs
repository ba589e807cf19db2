//! Default presenters that log instead of drawing
//!
//! The daemon runs headless; whatever desktop integration consumes
//! `/status` decides how banners and the overlay actually look.

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info};

use crate::{
    notifications::{Banner, BannerId, BannerPresenter},
    overlay::OverlayPresenter,
};

/// Banner presenter keeping the list of banners currently on screen
#[derive(Debug, Default)]
pub struct LoggingBanners {
    visible: Mutex<Vec<Banner>>,
}

impl LoggingBanners {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Banner>> {
        self.visible
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn visible(&self) -> Vec<Banner> {
        self.lock().clone()
    }
}

impl BannerPresenter for LoggingBanners {
    fn register_source(&self) {
        debug!("Notification source registered");
    }

    fn unregister_source(&self) {
        debug!("Notification source unregistered");
    }

    fn show(&self, banner: &Banner) {
        info!(
            "Banner {} [{:?}]: {} {}",
            banner.id,
            banner.urgency,
            banner.title,
            banner.body.as_deref().unwrap_or("")
        );

        let mut visible = self.lock();
        visible.retain(|shown| shown.id != banner.id);
        visible.push(banner.clone());
    }

    fn update(&self, banner: &Banner) {
        debug!(
            "Banner {} updated: {}",
            banner.id,
            banner.body.as_deref().unwrap_or("")
        );

        if let Some(shown) = self.lock().iter_mut().find(|shown| shown.id == banner.id) {
            *shown = banner.clone();
        }
    }

    fn expire(&self, id: BannerId) {
        debug!("Banner {} expired", id);
        self.lock().retain(|shown| shown.id != id);
    }
}

/// Overlay presenter that always gets the input grab
#[derive(Debug, Default)]
pub struct LoggingOverlay {
    grabbed: Mutex<bool>,
}

impl LoggingOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_grab(&self) -> bool {
        *self.grabbed.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl OverlayPresenter for LoggingOverlay {
    fn show(&self, animate: bool) {
        info!("Screen overlay shown (animate={})", animate);
    }

    fn hide(&self, animate: bool) {
        info!("Screen overlay hidden (animate={})", animate);
    }

    fn grab_input(&self) -> bool {
        *self.grabbed.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = true;
        true
    }

    fn release_input(&self) {
        *self.grabbed.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = false;
    }

    fn set_acknowledged(&self, acknowledged: bool) {
        if acknowledged {
            debug!("Screen overlay acknowledged");
        }
    }
}
