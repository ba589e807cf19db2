//! User idle time tracking

use std::{
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use tokio::time::Instant;

/// Reports how long the user has been inactive
pub trait IdleMonitor: Send + Sync {
    fn idle_time(&self) -> Duration;
}

/// Idle monitor fed by input events reported to the daemon
#[derive(Debug)]
pub struct ActivityMonitor {
    last_activity: Mutex<Instant>,
}

impl ActivityMonitor {
    pub fn new() -> Self {
        Self {
            last_activity: Mutex::new(Instant::now()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Instant> {
        self.last_activity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record user activity at `now`
    pub fn record_activity(&self, now: Instant) {
        let mut last = self.lock();
        if now > *last {
            *last = now;
        }
    }
}

impl Default for ActivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl IdleMonitor for ActivityMonitor {
    fn idle_time(&self) -> Duration {
        Instant::now().saturating_duration_since(*self.lock())
    }
}
