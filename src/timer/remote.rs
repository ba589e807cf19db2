//! Contract of the process that owns the authoritative timer

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::state::TimerState;

/// Property set published by the remote timer.
///
/// `state` is `None` while the remote has not reported a phase yet.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RemoteProperties {
    pub state: Option<TimerState>,
    pub state_duration: f64,
    pub elapsed: f64,
    pub is_paused: bool,
}

/// Push notifications coming from the remote side
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteSignal {
    /// The service became reachable
    NameAppeared,
    /// The service went away
    NameVanished,
    /// One or more properties changed; carries the full property set
    PropertiesChanged(RemoteProperties),
}

/// Imperative operations understood by the remote timer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum TimerCommand {
    Start,
    Stop,
    Pause,
    Resume,
    Skip,
    Reset,
    SetState { state: TimerState, timestamp: f64 },
    SetStateDuration { duration: f64 },
}

impl TimerCommand {
    pub fn name(&self) -> &'static str {
        match self {
            TimerCommand::Start => "start",
            TimerCommand::Stop => "stop",
            TimerCommand::Pause => "pause",
            TimerCommand::Resume => "resume",
            TimerCommand::Skip => "skip",
            TimerCommand::Reset => "reset",
            TimerCommand::SetState { .. } => "set-state",
            TimerCommand::SetStateDuration { .. } => "set-state-duration",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemoteError {
    #[error("timer service is not reachable")]
    Disconnected,

    #[error("cannot switch timer to {0}")]
    InvalidState(TimerState),

    #[error("invalid state duration: {0}")]
    InvalidDuration(f64),

    #[error("timer service rejected {command}: {reason}")]
    Rejected { command: &'static str, reason: String },
}

/// Handle to the authoritative timer.
///
/// Calls resolve once the remote acknowledged them. Callers treat them as
/// fire-and-forget: the effect is only observed through the next
/// `PropertiesChanged` signal.
pub trait RemoteTimer: Send + Sync + 'static {
    /// Whether the service is currently reachable
    fn is_connected(&self) -> bool;

    /// Latest property set known to the remote proxy
    fn properties(&self) -> RemoteProperties;

    /// Subscribe to push notifications. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<RemoteSignal>;

    fn call(&self, command: TimerCommand) -> BoxFuture<'static, Result<(), RemoteError>>;
}
