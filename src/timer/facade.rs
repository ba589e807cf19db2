//! Normalising wrapper around the remote timer

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::remote::{RemoteProperties, RemoteSignal, RemoteTimer, TimerCommand};
use crate::{
    config::TimerSettings,
    state::{TimerSnapshot, TimerState},
};

/// Events emitted by [`TimerFacade`].
///
/// For a single remote update the order is always `StateChanged`, then
/// `Paused`/`Resumed`, then `Update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimerEvent {
    StateChanged,
    Paused,
    Resumed,
    Update,
    ServiceConnected,
    ServiceDisconnected,
}

pub struct TimerFacade {
    remote: Arc<dyn RemoteTimer>,
    connected: bool,
    properties: RemoteProperties,
    last: TimerSnapshot,
    short_break_duration: f64,
    long_break_duration: f64,
    events_tx: broadcast::Sender<TimerEvent>,
}

impl TimerFacade {
    pub fn new(remote: Arc<dyn RemoteTimer>, settings: &TimerSettings) -> Self {
        let (events_tx, _) = broadcast::channel(64);

        Self {
            connected: remote.is_connected(),
            properties: remote.properties(),
            remote,
            last: TimerSnapshot::null(),
            short_break_duration: settings.short_break_duration,
            long_break_duration: settings.long_break_duration,
            events_tx,
        }
    }

    /// Subscribe to facade events. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events_tx.subscribe()
    }

    /// Re-read the remote properties and emit whatever changed since the
    /// last emission. Used once after construction.
    pub fn sync(&mut self) -> Vec<TimerEvent> {
        self.connected = self.remote.is_connected();
        self.properties = self.remote.properties();

        let mut events = Vec::new();
        self.detect_changes(&mut events);
        self.publish(&events);
        events
    }

    /// Fold a remote signal into the facade and return the events it
    /// produced, in emission order.
    pub fn apply(&mut self, signal: RemoteSignal) -> Vec<TimerEvent> {
        let mut events = Vec::new();

        match signal {
            RemoteSignal::NameAppeared => {
                info!("Timer service connected");
                self.connected = true;
                self.properties = self.remote.properties();
                events.push(TimerEvent::ServiceConnected);
                self.detect_changes(&mut events);
            }
            RemoteSignal::NameVanished => {
                warn!("Timer service disconnected");
                self.connected = false;
                self.detect_changes(&mut events);
                events.push(TimerEvent::ServiceDisconnected);
            }
            RemoteSignal::PropertiesChanged(properties) => {
                self.properties = properties;
                self.detect_changes(&mut events);
            }
        }

        self.publish(&events);
        events
    }

    fn detect_changes(&mut self, events: &mut Vec<TimerEvent>) {
        let current = self.snapshot();
        let previous = self.last;

        let restarted = current.state == previous.state
            && current.state != TimerState::Null
            && current.elapsed < previous.elapsed;

        if current.state != previous.state
            || current.state_duration != previous.state_duration
            || restarted
        {
            debug!(
                "Timer state changed: {} -> {} (duration={}, restarted={})",
                previous.state, current.state, current.state_duration, restarted
            );
            events.push(TimerEvent::StateChanged);
        }

        if current.is_paused != previous.is_paused {
            events.push(if current.is_paused {
                TimerEvent::Paused
            } else {
                TimerEvent::Resumed
            });
        }

        events.push(TimerEvent::Update);
        self.last = current;
    }

    fn publish(&self, events: &[TimerEvent]) {
        for event in events {
            // No receivers is fine; the control loop consumes the returned events.
            let _ = self.events_tx.send(*event);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn state(&self) -> TimerState {
        if !self.connected {
            return TimerState::Null;
        }

        self.properties.state.unwrap_or(TimerState::Null)
    }

    pub fn state_duration(&self) -> f64 {
        self.properties.state_duration
    }

    pub fn elapsed(&self) -> f64 {
        self.properties.elapsed
    }

    pub fn remaining(&self) -> f64 {
        self.snapshot().remaining()
    }

    pub fn progress(&self) -> f64 {
        self.snapshot().progress()
    }

    pub fn is_paused(&self) -> bool {
        self.connected && self.properties.is_paused
    }

    pub fn is_break(&self) -> bool {
        self.state().is_break()
    }

    /// Current normalised view of the timer
    pub fn snapshot(&self) -> TimerSnapshot {
        match self.state() {
            TimerState::Null => TimerSnapshot::null(),
            state => TimerSnapshot::new(
                state,
                self.properties.state_duration,
                self.properties.elapsed,
                self.is_paused(),
            ),
        }
    }

    pub fn start(&self) {
        self.dispatch(TimerCommand::Start);
    }

    pub fn stop(&self) {
        self.dispatch(TimerCommand::Stop);
    }

    pub fn pause(&self) {
        self.dispatch(TimerCommand::Pause);
    }

    pub fn resume(&self) {
        self.dispatch(TimerCommand::Resume);
    }

    pub fn skip(&self) {
        self.dispatch(TimerCommand::Skip);
    }

    pub fn reset(&self) {
        self.dispatch(TimerCommand::Reset);
    }

    pub fn set_state(&self, state: TimerState, timestamp: f64) {
        self.dispatch(TimerCommand::SetState { state, timestamp });
    }

    pub fn set_state_duration(&self, duration: f64) {
        self.dispatch(TimerCommand::SetStateDuration { duration });
    }

    pub fn toggle(&self) {
        if self.state() == TimerState::Null {
            self.start();
        } else {
            self.stop();
        }
    }

    /// Whether a short break can still be turned into a long one, or back
    pub fn can_switch_break(&self) -> bool {
        self.elapsed() < self.short_break_duration
            && self.short_break_duration < self.long_break_duration
    }

    pub fn switch_break(&self) {
        match self.state() {
            TimerState::ShortBreak => self.set_state(TimerState::LongBreak, 0.0),
            TimerState::LongBreak => self.set_state(TimerState::ShortBreak, 0.0),
            _ => {}
        }
    }

    /// Send a command to the remote timer without waiting for it.
    ///
    /// Local state is not touched; the outcome shows up with the next
    /// property push. Failures are only logged.
    pub fn dispatch(&self, command: TimerCommand) {
        let name = command.name();
        let call = self.remote.call(command);

        tokio::spawn(async move {
            match call.await {
                Ok(()) => debug!("Timer {} acknowledged", name),
                Err(e) => warn!("Timer {} failed: {}", name, e),
            }
        });
    }
}
