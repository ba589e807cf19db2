//! Full-screen break overlay
//!
//! The overlay is a pure state machine here. Drawing, fading and input
//! grabbing are delegated to an [`OverlayPresenter`]; time is passed in by
//! the caller so every transition is driven from the control loop.

pub mod gestures;
pub mod screen;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use gestures::{AcknowledgeGesture, DismissGesture};
pub use screen::ScreenOverlay;

/// Continuous inactivity needed before an open overlay may be dismissed
pub const IDLE_ACKNOWLEDGE_THRESHOLD: Duration = Duration::from_millis(600);

/// Inactivity after which a closed overlay comes back on its own
pub const IDLE_OPEN_THRESHOLD: Duration = Duration::from_secs(30);

/// Pointer travel (px) that counts as a deliberate move
pub const MOTION_DISTANCE_TO_DISMISS: f64 = 20.0;

/// Do not open for a break that is about to finish anyway
pub const OPEN_MIN_REMAINING_SECS: f64 = 3.0;

pub const FADE_IN_TIME: Duration = Duration::from_millis(500);
pub const FADE_OUT_TIME: Duration = Duration::from_millis(350);

/// Interval between attempts to grab input
pub const GRAB_RETRY_INTERVAL: Duration = Duration::from_micros(16_667);

/// Give up grabbing input after this long
pub const GRAB_TIME_LIMIT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayState {
    #[default]
    Closed,
    Opening,
    Opened,
    Closing,
}

impl OverlayState {
    pub fn is_open(self) -> bool {
        matches!(self, OverlayState::Opening | OverlayState::Opened)
    }
}

/// Lifecycle notifications drained by the owner after each call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayEvent {
    Opening,
    Opened,
    Acknowledged,
    Closing,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputKind {
    ButtonPress,
    ButtonRelease,
    KeyPress,
    KeyRelease,
    Motion,
    Scroll,
    TouchBegin,
    TouchUpdate,
    TouchEnd,
    TouchCancel,
    TouchpadSwipe,
    TouchpadPinch,
}

/// A user input event as delivered by the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    pub kind: InputKind,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    /// Key press of the Escape key
    #[serde(default)]
    pub escape: bool,
}

impl InputEvent {
    pub fn new(kind: InputKind) -> Self {
        Self {
            kind,
            x: 0.0,
            y: 0.0,
            escape: false,
        }
    }

    pub fn motion(x: f64, y: f64) -> Self {
        Self {
            kind: InputKind::Motion,
            x,
            y,
            escape: false,
        }
    }

    pub fn escape() -> Self {
        Self {
            kind: InputKind::KeyPress,
            x: 0.0,
            y: 0.0,
            escape: true,
        }
    }
}

/// Rendering and input side of the overlay
pub trait OverlayPresenter: Send + Sync {
    fn show(&self, animate: bool);
    fn hide(&self, animate: bool);
    /// Take an exclusive input grab; false if another grab is active
    fn grab_input(&self) -> bool;
    fn release_input(&self);
    /// Acknowledgement changed; used to hide the "do not touch" hint
    fn set_acknowledged(&self, _acknowledged: bool) {}
}
