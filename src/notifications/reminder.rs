//! Nudges about a break the user keeps ignoring

use std::{sync::Arc, time::Duration};

use tokio::time::Instant;
use tracing::debug;

use crate::{
    services::{IdleMonitor, WindowProbe},
    state::TimerSnapshot,
};

/// Delay between scheduling and showing a reminder
pub const REMINDER_TIMEOUT: Duration = Duration::from_secs(75);

/// Being idle this long counts as taking the break
pub const IDLE_TIME_TO_ACKNOWLEDGE: Duration = Duration::from_secs(45);

/// Not worth reminding when the break is almost over
pub const REMINDER_MIN_REMAINING_SECS: f64 = 60.0;

/// Single-slot reminder timer with an idle watch.
pub struct Reminder {
    idle: Arc<dyn IdleMonitor>,
    windows: Arc<dyn WindowProbe>,
    fire_at: Option<Instant>,
    idle_check_at: Option<Instant>,
    acknowledged: bool,
}

impl Reminder {
    pub fn new(idle: Arc<dyn IdleMonitor>, windows: Arc<dyn WindowProbe>) -> Self {
        Self {
            idle,
            windows,
            fire_at: None,
            idle_check_at: None,
            acknowledged: false,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.fire_at.is_some()
    }

    pub fn acknowledged(&self) -> bool {
        self.acknowledged
    }

    /// (Re)arm the reminder; replaces a pending one
    pub fn schedule(&mut self, now: Instant) {
        self.acknowledged = false;
        self.fire_at = Some(now + REMINDER_TIMEOUT);
        if self.idle_check_at.is_none() {
            self.idle_check_at = Some(self.next_idle_check(now));
        }
        debug!("Reminder scheduled in {:?}", REMINDER_TIMEOUT);
    }

    pub fn unschedule(&mut self) {
        self.fire_at = None;
        self.idle_check_at = None;
    }

    /// Forget about an earlier acknowledgement, for a new break
    pub fn reset(&mut self) {
        self.acknowledged = false;
        self.unschedule();
    }

    /// The user took the break one way or another
    pub fn dismiss(&mut self) {
        self.acknowledged = true;
        self.unschedule();
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        [self.fire_at, self.idle_check_at].into_iter().flatten().min()
    }

    /// Returns true when a reminder banner should be shown now
    pub fn poll(&mut self, snapshot: &TimerSnapshot, now: Instant) -> bool {
        if let Some(at) = self.idle_check_at {
            if now >= at {
                if self.idle.idle_time() >= IDLE_TIME_TO_ACKNOWLEDGE {
                    debug!("User went idle, reminder acknowledged");
                    self.dismiss();
                    return false;
                }
                self.idle_check_at = Some(self.next_idle_check(now));
            }
        }

        let Some(at) = self.fire_at else {
            return false;
        };
        if now < at {
            return false;
        }

        self.unschedule();

        if self.windows.focused_window().is_fullscreen_player() {
            self.acknowledged = true;
        }

        !self.acknowledged && snapshot.remaining() > REMINDER_MIN_REMAINING_SECS
    }

    fn next_idle_check(&self, now: Instant) -> Instant {
        now + IDLE_TIME_TO_ACKNOWLEDGE.saturating_sub(self.idle.idle_time())
    }
}
