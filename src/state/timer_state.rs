//! Timer phase and the property snapshot mirrored from the remote timer

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Elapsed time below which a phase is considered to be just starting.
/// Covers the latency between a transition and the first property push.
pub const STARTING_TOLERANCE_SECS: f64 = 0.1;

/// How long before the end of a phase the announcement fires.
pub const ANNOUNCEMENT_LEAD_SECS: f64 = 10.0;

/// Extra lookahead on top of the announcement lead used to decide whether
/// a phase is ending soon.
pub const ENDING_SOON_MARGIN_SECS: f64 = 5.0;

/// Phase reported by the authoritative timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimerState {
    /// No session is active, either stopped or disconnected
    #[default]
    Null,
    Pomodoro,
    ShortBreak,
    LongBreak,
}

impl TimerState {
    pub fn is_break(self) -> bool {
        matches!(self, TimerState::ShortBreak | TimerState::LongBreak)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimerState::Null => "null",
            TimerState::Pomodoro => "pomodoro",
            TimerState::ShortBreak => "short-break",
            TimerState::LongBreak => "long-break",
        }
    }
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "null" => Ok(TimerState::Null),
            "pomodoro" => Ok(TimerState::Pomodoro),
            "short-break" => Ok(TimerState::ShortBreak),
            "long-break" => Ok(TimerState::LongBreak),
            other => Err(format!("Unknown timer state: {}", other)),
        }
    }
}

/// Timer properties as seen by the notification core.
///
/// Refreshed on every property push. Durations are in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub state_duration: f64,
    pub elapsed: f64,
    pub is_paused: bool,
}

impl TimerSnapshot {
    /// Snapshot of a stopped or unreachable timer
    pub fn null() -> Self {
        Self::default()
    }

    pub fn new(state: TimerState, state_duration: f64, elapsed: f64, is_paused: bool) -> Self {
        Self {
            state,
            state_duration,
            elapsed,
            is_paused,
        }
    }

    /// Seconds left in the current phase, rounded up.
    ///
    /// Zero for the null state. May go negative right at a phase boundary,
    /// so callers that display it should clamp.
    pub fn remaining(&self) -> f64 {
        if self.state == TimerState::Null {
            return 0.0;
        }

        (self.state_duration - self.elapsed).ceil()
    }

    /// Fraction of the phase that has elapsed, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        if self.state == TimerState::Null || self.state_duration <= 0.0 {
            return 0.0;
        }

        (self.elapsed / self.state_duration).clamp(0.0, 1.0)
    }

    pub fn is_break(&self) -> bool {
        self.state.is_break()
    }

    pub fn is_starting(&self) -> bool {
        self.elapsed < STARTING_TOLERANCE_SECS
    }

    pub fn is_ending_soon(&self) -> bool {
        self.state != TimerState::Null
            && self.remaining() <= ANNOUNCEMENT_LEAD_SECS + ENDING_SOON_MARGIN_SECS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_rounds_up_and_is_zero_when_stopped() {
        let snapshot = TimerSnapshot::new(TimerState::Pomodoro, 1500.0, 1489.4, false);
        assert_eq!(snapshot.remaining(), 11.0);

        let stopped = TimerSnapshot::new(TimerState::Null, 1500.0, 10.0, false);
        assert_eq!(stopped.remaining(), 0.0);
    }

    #[test]
    fn remaining_can_be_negative_past_the_boundary() {
        let snapshot = TimerSnapshot::new(TimerState::ShortBreak, 300.0, 302.0, false);
        assert_eq!(snapshot.remaining(), -2.0);
    }

    #[test]
    fn progress_is_zero_without_duration() {
        let snapshot = TimerSnapshot::new(TimerState::Pomodoro, 0.0, 12.0, false);
        assert_eq!(snapshot.progress(), 0.0);

        let half = TimerSnapshot::new(TimerState::Pomodoro, 100.0, 50.0, false);
        assert_eq!(half.progress(), 0.5);
    }

    #[test]
    fn ending_soon_window_is_fifteen_seconds() {
        assert!(TimerSnapshot::new(TimerState::Pomodoro, 1500.0, 1485.0, false).is_ending_soon());
        assert!(!TimerSnapshot::new(TimerState::Pomodoro, 1500.0, 1484.0, false).is_ending_soon());
        assert!(!TimerSnapshot::null().is_ending_soon());
    }

    #[test]
    fn state_names_round_trip_through_strings() {
        for state in [
            TimerState::Null,
            TimerState::Pomodoro,
            TimerState::ShortBreak,
            TimerState::LongBreak,
        ] {
            assert_eq!(state.as_str().parse::<TimerState>(), Ok(state));
        }
        assert!("coffee".parse::<TimerState>().is_err());
    }
}
