//! Pomodoro Notifier - a pomodoro timer daemon deciding when and how to
//! interrupt the user
//!
//! The timer facade normalises the authoritative timer, the notification
//! manager turns timer events into banners and a full-screen break overlay,
//! and a small HTTP API drives it all.

pub mod api;
pub mod config;
pub mod notifications;
pub mod overlay;
pub mod services;
pub mod state;
pub mod tasks;
pub mod timer;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use notifications::{NotificationManager, NotificationView};
pub use overlay::ScreenOverlay;
pub use state::{AppState, TimerSnapshot, TimerState};
pub use timer::{LocalTimer, TimerFacade};
pub use utils::signals::shutdown_signal;
