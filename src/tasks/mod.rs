//! Background tasks module
//!
//! This module contains the long-running tasks: the timer ticker and the
//! control loop that owns the notification state.

pub mod control_loop;
pub mod timer_ticker;

// Re-export task entry points
pub use control_loop::ControlLoop;
pub use timer_ticker::timer_ticker_task;
