//! Session presence (busy / do-not-disturb) control

use std::sync::Mutex;

use tracing::info;

/// Capability to flip the session into busy mode and back
pub trait Presence: Send + Sync {
    fn set_busy(&self, busy: bool);

    /// Restore whatever the user had before we touched it
    fn set_default(&self);
}

/// Presence that only records and logs the requested status
#[derive(Debug, Default)]
pub struct LoggingPresence {
    busy: Mutex<Option<bool>>,
}

impl LoggingPresence {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when presence is left at its default
    pub fn busy(&self) -> Option<bool> {
        *self.busy.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Presence for LoggingPresence {
    fn set_busy(&self, busy: bool) {
        let mut current = self.busy.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *current != Some(busy) {
            info!("Presence set to {}", if busy { "busy" } else { "available" });
            *current = Some(busy);
        }
    }

    fn set_default(&self) {
        let mut current = self.busy.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if current.is_some() {
            info!("Presence restored to default");
            *current = None;
        }
    }
}
