//! Focused window inspection

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// What is known about the window holding focus
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusedWindowInfo {
    /// Window belongs to a video player or game
    pub is_player: bool,
    pub is_fullscreen: bool,
}

impl FocusedWindowInfo {
    /// A fullscreen player should never be covered or nagged
    pub fn is_fullscreen_player(&self) -> bool {
        self.is_player && self.is_fullscreen
    }
}

pub trait WindowProbe: Send + Sync {
    fn focused_window(&self) -> FocusedWindowInfo;
}

/// Window probe holding whatever the host last reported
#[derive(Debug, Default)]
pub struct ReportedWindow {
    info: Mutex<FocusedWindowInfo>,
}

impl ReportedWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, info: FocusedWindowInfo) {
        *self.info.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = info;
    }
}

impl WindowProbe for ReportedWindow {
    fn focused_window(&self) -> FocusedWindowInfo {
        *self.info.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
