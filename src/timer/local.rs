//! In-process timer service
//!
//! Owns the authoritative pomodoro cycle when no external timer service is
//! available. It speaks the same [`RemoteTimer`] contract, so the
//! notification core cannot tell the difference.

use std::sync::{Mutex, MutexGuard};

use futures::{future::BoxFuture, FutureExt};
use tokio::{sync::broadcast, time::Instant};
use tracing::{debug, info};

use super::remote::{RemoteError, RemoteProperties, RemoteSignal, RemoteTimer, TimerCommand};
use crate::{config::TimerSettings, state::TimerState};

/// Share of a pomodoro that must elapse for it to count as completed.
const POMODORO_ACCEPTANCE: f64 = 0.8;

/// A break skipped within this share of the short break duration brings
/// the long break one pomodoro closer.
const SHORT_BREAK_ACCEPTANCE: f64 = 0.2;

/// Weight between short and long break duration that decides whether a
/// long break (or time spent stopped) was long enough to reset the cycle.
const LONG_BREAK_ACCEPTANCE: f64 = 0.5;

#[derive(Debug)]
struct Inner {
    settings: TimerSettings,
    connected: bool,
    state: TimerState,
    state_duration: f64,
    /// Elapsed seconds accumulated up to `running_since`
    elapsed_base: f64,
    /// Set while the phase is counting down
    running_since: Option<Instant>,
    is_paused: bool,
    session_count: u32,
    state_changed_at: Option<Instant>,
}

impl Inner {
    fn elapsed(&self, now: Instant) -> f64 {
        match self.running_since {
            Some(since) => self.elapsed_base + now.saturating_duration_since(since).as_secs_f64(),
            None => self.elapsed_base,
        }
    }

    fn properties(&self, now: Instant) -> RemoteProperties {
        RemoteProperties {
            state: Some(self.state),
            state_duration: self.state_duration,
            elapsed: self.elapsed(now),
            is_paused: self.is_paused,
        }
    }

    fn long_break_acceptance_time(&self) -> f64 {
        (1.0 - LONG_BREAK_ACCEPTANCE) * self.settings.short_break_duration
            + LONG_BREAK_ACCEPTANCE * self.settings.long_break_duration
    }

    fn duration_for(&self, state: TimerState) -> f64 {
        match state {
            TimerState::Null => 0.0,
            TimerState::Pomodoro => self.settings.pomodoro_duration,
            TimerState::ShortBreak => self.settings.short_break_duration,
            TimerState::LongBreak => self.settings.long_break_duration,
        }
    }

    fn next_break(&self) -> TimerState {
        if self.session_count >= self.settings.long_break_interval {
            TimerState::LongBreak
        } else {
            TimerState::ShortBreak
        }
    }

    /// Switch phase, updating the session count the way a finished or
    /// abandoned phase deserves.
    fn enter(&mut self, new_state: TimerState, elapsed: f64, paused: bool, now: Instant) {
        let elapsed_before = self.elapsed(now);

        match (self.state, new_state) {
            (TimerState::Pomodoro, TimerState::Pomodoro) => {}
            (TimerState::Pomodoro, _) => {
                if elapsed_before >= POMODORO_ACCEPTANCE * self.settings.pomodoro_duration {
                    self.session_count += 1;
                }
            }
            (previous, TimerState::Pomodoro) if previous.is_break() => {
                if elapsed_before < SHORT_BREAK_ACCEPTANCE * self.settings.short_break_duration {
                    self.session_count += 1;
                }
                if elapsed_before >= self.long_break_acceptance_time() {
                    self.session_count = 0;
                }
            }
            (TimerState::Null, TimerState::Pomodoro) => {
                let idle = self
                    .state_changed_at
                    .map(|at| now.saturating_duration_since(at).as_secs_f64());

                if idle.is_some_and(|idle| idle >= self.long_break_acceptance_time()) {
                    self.session_count = 0;
                }
            }
            _ => {}
        }

        self.state = new_state;
        self.state_duration = self.duration_for(new_state);
        self.elapsed_base = elapsed.clamp(0.0, self.state_duration.max(0.0));
        self.is_paused = paused && new_state != TimerState::Null;
        self.running_since = if new_state == TimerState::Null || self.is_paused {
            None
        } else {
            Some(now)
        };
        self.state_changed_at = Some(now);

        info!(
            "Local timer entered {} (duration={}s, sessions={})",
            new_state, self.state_duration, self.session_count
        );
    }

    fn apply(&mut self, command: TimerCommand, now: Instant) -> Result<(), RemoteError> {
        if !self.connected {
            return Err(RemoteError::Disconnected);
        }

        match command {
            TimerCommand::Start => {
                if self.state == TimerState::Null {
                    self.enter(TimerState::Pomodoro, 0.0, false, now);
                }
            }
            TimerCommand::Stop => {
                if self.state != TimerState::Null {
                    self.enter(TimerState::Null, 0.0, false, now);
                }
            }
            TimerCommand::Pause => {
                if self.state == TimerState::Null {
                    return Err(RemoteError::Rejected {
                        command: command.name(),
                        reason: "timer is not running".to_string(),
                    });
                }
                if !self.is_paused {
                    self.elapsed_base = self.elapsed(now);
                    self.running_since = None;
                    self.is_paused = true;
                }
            }
            TimerCommand::Resume => {
                if self.state == TimerState::Null {
                    return Err(RemoteError::Rejected {
                        command: command.name(),
                        reason: "timer is not running".to_string(),
                    });
                }
                if self.is_paused {
                    self.running_since = Some(now);
                    self.is_paused = false;
                }
            }
            TimerCommand::Skip => match self.state {
                TimerState::Null => {}
                TimerState::Pomodoro => {
                    let next = self.next_break_after_pomodoro(now);
                    self.enter(next, 0.0, false, now);
                }
                _ => self.enter(TimerState::Pomodoro, 0.0, false, now),
            },
            TimerCommand::Reset => {
                let was_running = self.state != TimerState::Null;
                self.enter(TimerState::Null, 0.0, false, now);
                self.session_count = 0;
                if was_running {
                    self.enter(TimerState::Pomodoro, 0.0, false, now);
                }
            }
            TimerCommand::SetState { state, timestamp } => {
                if state == TimerState::Null {
                    self.enter(TimerState::Null, 0.0, false, now);
                } else {
                    let elapsed = elapsed_since_timestamp(timestamp);
                    self.enter(state, elapsed, false, now);
                }
            }
            TimerCommand::SetStateDuration { duration } => {
                if !duration.is_finite() || duration <= 0.0 {
                    return Err(RemoteError::InvalidDuration(duration));
                }
                if self.state == TimerState::Null {
                    return Err(RemoteError::InvalidState(TimerState::Null));
                }
                self.state_duration = duration;
            }
        }

        Ok(())
    }

    fn next_break_after_pomodoro(&self, now: Instant) -> TimerState {
        // The pomodoro being left may complete the cycle.
        let completes = self.elapsed(now) >= POMODORO_ACCEPTANCE * self.settings.pomodoro_duration;
        if completes && self.session_count + 1 >= self.settings.long_break_interval {
            TimerState::LongBreak
        } else {
            self.next_break()
        }
    }

    /// Advance the clock; returns true when a phase boundary was crossed.
    fn tick(&mut self, now: Instant) -> bool {
        if !self.connected || self.state == TimerState::Null || self.is_paused {
            return false;
        }

        if self.elapsed(now) < self.state_duration {
            return false;
        }

        match self.state {
            TimerState::Pomodoro => {
                let next = self.next_break_after_pomodoro(now);
                self.enter(next, 0.0, false, now);
            }
            _ => {
                let wait = self.settings.wait_for_activity;
                self.enter(TimerState::Pomodoro, 0.0, wait, now);
                if wait {
                    debug!("Waiting for user activity before starting the pomodoro");
                }
            }
        }

        true
    }
}

/// Seconds between a unix timestamp and now; zero when unset or in the future
fn elapsed_since_timestamp(timestamp: f64) -> f64 {
    if timestamp <= 0.0 || !timestamp.is_finite() {
        return 0.0;
    }

    let now = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
    (now - timestamp).max(0.0)
}

/// Authoritative in-process pomodoro timer
#[derive(Debug)]
pub struct LocalTimer {
    inner: Mutex<Inner>,
    signals: broadcast::Sender<RemoteSignal>,
}

impl LocalTimer {
    pub fn new(settings: TimerSettings) -> Self {
        let (signals, _) = broadcast::channel(256);

        Self {
            inner: Mutex::new(Inner {
                settings: settings.sanitized(),
                connected: true,
                state: TimerState::Null,
                state_duration: 0.0,
                elapsed_base: 0.0,
                running_since: None,
                is_paused: false,
                session_count: 0,
                state_changed_at: None,
            }),
            signals,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(&self, inner: &Inner, now: Instant) {
        if inner.connected {
            let _ = self
                .signals
                .send(RemoteSignal::PropertiesChanged(inner.properties(now)));
        }
    }

    /// Apply a command right away
    pub fn execute(&self, command: TimerCommand) -> Result<(), RemoteError> {
        let now = Instant::now();
        let mut inner = self.lock();
        inner.apply(command, now)?;
        self.notify(&inner, now);
        Ok(())
    }

    /// Advance the countdown and publish the new properties
    pub fn tick(&self) {
        let now = Instant::now();
        let mut inner = self.lock();

        if inner.state == TimerState::Null || !inner.connected {
            return;
        }

        inner.tick(now);
        self.notify(&inner, now);
    }

    pub fn session_count(&self) -> u32 {
        self.lock().session_count
    }

    /// Simulate the service going away
    pub fn disconnect(&self) {
        let mut inner = self.lock();
        if inner.connected {
            inner.connected = false;
            let _ = self.signals.send(RemoteSignal::NameVanished);
        }
    }

    /// Simulate the service coming back
    pub fn connect(&self) {
        let mut inner = self.lock();
        if !inner.connected {
            inner.connected = true;
            let _ = self.signals.send(RemoteSignal::NameAppeared);
        }
    }
}

impl RemoteTimer for LocalTimer {
    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    fn properties(&self) -> RemoteProperties {
        self.lock().properties(Instant::now())
    }

    fn subscribe(&self) -> broadcast::Receiver<RemoteSignal> {
        self.signals.subscribe()
    }

    fn call(&self, command: TimerCommand) -> BoxFuture<'static, Result<(), RemoteError>> {
        futures::future::ready(self.execute(command)).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings() -> TimerSettings {
        TimerSettings {
            pomodoro_duration: 1500.0,
            short_break_duration: 300.0,
            long_break_duration: 900.0,
            long_break_interval: 4,
            wait_for_activity: true,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn start_runs_a_pomodoro_and_pause_freezes_elapsed() {
        let timer = LocalTimer::new(settings());
        timer.execute(TimerCommand::Start).unwrap();

        tokio::time::advance(Duration::from_secs(100)).await;
        let props = timer.properties();
        assert_eq!(props.state, Some(TimerState::Pomodoro));
        assert_eq!(props.state_duration, 1500.0);
        assert!((props.elapsed - 100.0).abs() < 0.01);

        timer.execute(TimerCommand::Pause).unwrap();
        tokio::time::advance(Duration::from_secs(50)).await;
        let props = timer.properties();
        assert!(props.is_paused);
        assert!((props.elapsed - 100.0).abs() < 0.01);

        timer.execute(TimerCommand::Resume).unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!((timer.properties().elapsed - 110.0).abs() < 0.01);
    }

    #[tokio::test(start_paused = true)]
    async fn pomodoro_rolls_into_break_and_break_waits_for_activity() {
        let timer = LocalTimer::new(settings());
        timer.execute(TimerCommand::Start).unwrap();

        tokio::time::advance(Duration::from_secs(1500)).await;
        timer.tick();
        let props = timer.properties();
        assert_eq!(props.state, Some(TimerState::ShortBreak));
        assert_eq!(timer.session_count(), 1);

        tokio::time::advance(Duration::from_secs(300)).await;
        timer.tick();
        let props = timer.properties();
        assert_eq!(props.state, Some(TimerState::Pomodoro));
        assert!(props.is_paused);
        assert_eq!(props.elapsed, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn every_fourth_pomodoro_earns_a_long_break() {
        let mut settings = settings();
        settings.wait_for_activity = false;
        let timer = LocalTimer::new(settings);
        timer.execute(TimerCommand::Start).unwrap();

        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(1500)).await;
            timer.tick();
            assert_eq!(timer.properties().state, Some(TimerState::ShortBreak));
            tokio::time::advance(Duration::from_secs(300)).await;
            timer.tick();
        }

        tokio::time::advance(Duration::from_secs(1500)).await;
        timer.tick();
        assert_eq!(timer.properties().state, Some(TimerState::LongBreak));

        tokio::time::advance(Duration::from_secs(900)).await;
        timer.tick();
        assert_eq!(timer.properties().state, Some(TimerState::Pomodoro));
        assert_eq!(timer.session_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_pomodoro_does_not_count() {
        let timer = LocalTimer::new(settings());
        timer.execute(TimerCommand::Start).unwrap();
        tokio::time::advance(Duration::from_secs(60)).await;

        timer.execute(TimerCommand::Skip).unwrap();
        assert_eq!(timer.properties().state, Some(TimerState::ShortBreak));
        assert_eq!(timer.session_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn set_state_duration_validates_input() {
        let timer = LocalTimer::new(settings());
        assert_eq!(
            timer.execute(TimerCommand::SetStateDuration { duration: 60.0 }),
            Err(RemoteError::InvalidState(TimerState::Null))
        );

        timer.execute(TimerCommand::Start).unwrap();
        assert_eq!(
            timer.execute(TimerCommand::SetStateDuration { duration: -1.0 }),
            Err(RemoteError::InvalidDuration(-1.0))
        );
        timer
            .execute(TimerCommand::SetStateDuration { duration: 1800.0 })
            .unwrap();
        assert_eq!(timer.properties().state_duration, 1800.0);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnected_timer_rejects_commands_and_signals_loss() {
        let timer = LocalTimer::new(settings());
        let mut rx = timer.subscribe();

        timer.disconnect();
        assert_eq!(rx.try_recv().unwrap(), RemoteSignal::NameVanished);
        assert_eq!(
            timer.execute(TimerCommand::Start),
            Err(RemoteError::Disconnected)
        );

        timer.connect();
        assert_eq!(rx.try_recv().unwrap(), RemoteSignal::NameAppeared);
        timer.execute(TimerCommand::Start).unwrap();
        assert!(matches!(
            rx.try_recv().unwrap(),
            RemoteSignal::PropertiesChanged(RemoteProperties {
                state: Some(TimerState::Pomodoro),
                ..
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_restarts_a_running_cycle() {
        let timer = LocalTimer::new(settings());
        timer.execute(TimerCommand::Start).unwrap();
        tokio::time::advance(Duration::from_secs(1400)).await;

        timer.execute(TimerCommand::Reset).unwrap();
        let props = timer.properties();
        assert_eq!(props.state, Some(TimerState::Pomodoro));
        assert_eq!(props.elapsed, 0.0);
        assert_eq!(timer.session_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn negative_phase_durations_fall_back_to_defaults() {
        let timer = LocalTimer::new(TimerSettings {
            pomodoro_duration: -60.0,
            short_break_duration: f64::NAN,
            ..settings()
        });

        timer.execute(TimerCommand::Start).unwrap();
        let props = timer.properties();
        assert_eq!(props.state, Some(TimerState::Pomodoro));
        assert_eq!(props.state_duration, 1500.0);

        timer.execute(TimerCommand::Skip).unwrap();
        assert_eq!(timer.properties().state_duration, 300.0);
    }
}
