//! Two-phase gesture detection guarding the overlay against stray input

use std::time::Duration;

use tokio::time::Instant;

use super::{InputEvent, InputKind, MOTION_DISTANCE_TO_DISMISS};

/// Completes once the user stayed inactive for `threshold`.
///
/// Polled every tenth of the threshold while running; any input event
/// restarts the quiet period.
#[derive(Debug)]
pub struct AcknowledgeGesture {
    threshold: Duration,
    last_active: Option<Instant>,
    next_poll: Option<Instant>,
}

impl AcknowledgeGesture {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            last_active: None,
            next_poll: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.last_active.is_some()
    }

    pub fn begin(&mut self, now: Instant) {
        if self.is_active() {
            return;
        }

        self.last_active = Some(now);
        self.next_poll = Some(now + self.threshold / 10);
    }

    pub fn end(&mut self) {
        self.last_active = None;
        self.next_poll = None;
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_poll
    }

    /// Swallow input while running; returns whether the event was consumed
    pub fn handle_event(&mut self, _event: &InputEvent, now: Instant) -> bool {
        if !self.is_active() {
            return false;
        }

        // Every kind of input counts as activity here.
        self.last_active = Some(now);
        true
    }

    /// Returns true once, when the quiet period is complete
    pub fn poll(&mut self, now: Instant) -> bool {
        let (Some(last_active), Some(next_poll)) = (self.last_active, self.next_poll) else {
            return false;
        };

        if now < next_poll {
            return false;
        }

        if now.saturating_duration_since(last_active) >= self.threshold {
            self.end();
            return true;
        }

        self.next_poll = Some(now + self.threshold / 10);
        false
    }
}

/// Completes on the first deliberate user action
#[derive(Debug, Default)]
pub struct DismissGesture {
    began: bool,
    origin: Option<(f64, f64)>,
}

impl DismissGesture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.began
    }

    pub fn begin(&mut self) {
        if self.began {
            return;
        }

        self.began = true;
        self.origin = None;
    }

    pub fn end(&mut self) {
        self.began = false;
        self.origin = None;
    }

    /// Returns true when the event dismisses; the gesture then ends
    pub fn handle_event(&mut self, event: &InputEvent) -> bool {
        if !self.began {
            return false;
        }

        let dismissed = match event.kind {
            InputKind::ButtonPress
            | InputKind::KeyPress
            | InputKind::TouchBegin
            | InputKind::TouchpadSwipe => true,
            // Small pointer jitter is not enough.
            InputKind::Motion => match self.origin {
                None => {
                    self.origin = Some((event.x, event.y));
                    false
                }
                Some((x, y)) => {
                    let (dx, dy) = (event.x - x, event.y - y);
                    dx * dx + dy * dy > MOTION_DISTANCE_TO_DISMISS * MOTION_DISTANCE_TO_DISMISS
                }
            },
            _ => false,
        };

        if dismissed {
            self.end();
        }

        dismissed
    }
}
