//! Shared state handed to the HTTP handlers

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::warn;

use super::{ControlCommand, ControlRequest, DaemonStatus};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    #[error("control loop is not running")]
    Unavailable,
}

/// Channels connecting the API to the control loop
#[derive(Debug, Clone)]
pub struct ControlHandle {
    pub commands: mpsc::Sender<ControlRequest>,
    pub status: watch::Receiver<DaemonStatus>,
}

/// Application state shared by the handlers.
///
/// The timer and notifications live in the control loop; this only holds
/// the way to reach it plus server metadata.
#[derive(Debug)]
pub struct AppState {
    control: ControlHandle,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl AppState {
    pub fn new(port: u16, host: String, control: ControlHandle) -> Self {
        Self {
            control,
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
        }
    }

    /// Run a command on the control loop and wait for its outcome
    pub async fn execute(&self, action: &str, command: ControlCommand) -> Result<bool, ControlError> {
        let (reply, outcome) = oneshot::channel();

        self.control
            .commands
            .send(ControlRequest { command, reply })
            .await
            .map_err(|_| ControlError::Unavailable)?;

        let handled = outcome.await.map_err(|_| {
            warn!("Control loop dropped the {} request", action);
            ControlError::Unavailable
        })?;

        *self
            .last_action
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(action.to_string());
        *self
            .last_action_time
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Utc::now());

        Ok(handled)
    }

    /// Latest status published by the control loop
    pub fn status(&self) -> DaemonStatus {
        self.control.status.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        !self.control.commands.is_closed()
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}
