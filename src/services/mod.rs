//! Desktop-side collaborators of the notification core
//!
//! Everything the core needs from the host (drawing, idle time, focused
//! window, presence) sits behind a narrow trait here.

pub mod idle;
pub mod presence;
pub mod shell;
pub mod window;

use std::sync::Arc;

use crate::{notifications::BannerPresenter, overlay::OverlayPresenter};

pub use idle::{ActivityMonitor, IdleMonitor};
pub use presence::{LoggingPresence, Presence};
pub use shell::{LoggingBanners, LoggingOverlay};
pub use window::{FocusedWindowInfo, ReportedWindow, WindowProbe};

/// Host capabilities handed to the notification manager
#[derive(Clone)]
pub struct ShellServices {
    pub banners: Arc<dyn BannerPresenter>,
    pub overlays: Arc<dyn OverlayPresenter>,
    pub presence: Arc<dyn Presence>,
    pub idle: Arc<dyn IdleMonitor>,
    pub windows: Arc<dyn WindowProbe>,
}
