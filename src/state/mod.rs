//! State management module
//!
//! Timer snapshots, the control-plane messages and the state shared with
//! the HTTP handlers.

pub mod app_state;
pub mod control;
pub mod timer_state;

// Re-export main types
pub use app_state::{AppState, ControlError, ControlHandle};
pub use control::{BannerAction, ControlCommand, ControlRequest, DaemonStatus, TimerAction};
pub use timer_state::{
    TimerSnapshot, TimerState, ANNOUNCEMENT_LEAD_SECS, ENDING_SOON_MARGIN_SECS,
    STARTING_TOLERANCE_SECS,
};
