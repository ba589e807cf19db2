//! Mapping from timer properties to what the user should be told

use serde::{Deserialize, Serialize};

use crate::state::{TimerSnapshot, TimerState};

/// Notification intent for the current moment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationView {
    #[default]
    Null,
    Pomodoro,
    PomodoroAboutToEnd,
    Break,
    BreakAboutToEnd,
    BreakEnded,
}

/// Coarse grouping of views used to tell a phase change from a countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    None,
    Pomodoro,
    Break,
    BreakEnded,
}

impl NotificationView {
    pub fn phase(self) -> ViewPhase {
        match self {
            NotificationView::Null => ViewPhase::None,
            NotificationView::Pomodoro | NotificationView::PomodoroAboutToEnd => {
                ViewPhase::Pomodoro
            }
            NotificationView::Break | NotificationView::BreakAboutToEnd => ViewPhase::Break,
            NotificationView::BreakEnded => ViewPhase::BreakEnded,
        }
    }

    pub fn is_about_to_end(self) -> bool {
        matches!(
            self,
            NotificationView::PomodoroAboutToEnd | NotificationView::BreakAboutToEnd
        )
    }

    /// The running view an about-to-end view falls back to when the phase
    /// gets extended
    pub fn without_ending(self) -> Self {
        match self {
            NotificationView::PomodoroAboutToEnd => NotificationView::Pomodoro,
            NotificationView::BreakAboutToEnd => NotificationView::Break,
            other => other,
        }
    }

    /// Views during which the announcement timer is armed
    pub fn awaits_announcement(self) -> bool {
        matches!(self, NotificationView::Pomodoro | NotificationView::Break)
    }

    pub fn from_snapshot(snapshot: &TimerSnapshot) -> Self {
        resolve_view(
            snapshot.state,
            snapshot.is_paused,
            snapshot.is_starting(),
            snapshot.is_ending_soon(),
        )
    }
}

/// Pick the view for a timer moment.
///
/// A paused timer only produces a view at the very start of a pomodoro,
/// which is how a finished break waiting for the user looks.
pub fn resolve_view(
    state: TimerState,
    is_paused: bool,
    is_starting: bool,
    is_ending_soon: bool,
) -> NotificationView {
    if is_paused {
        return if state == TimerState::Pomodoro && is_starting {
            NotificationView::BreakEnded
        } else {
            NotificationView::Null
        };
    }

    match state {
        TimerState::Pomodoro if is_ending_soon => NotificationView::PomodoroAboutToEnd,
        TimerState::Pomodoro => NotificationView::Pomodoro,
        TimerState::ShortBreak | TimerState::LongBreak if is_ending_soon => {
            NotificationView::BreakAboutToEnd
        }
        TimerState::ShortBreak | TimerState::LongBreak => NotificationView::Break,
        TimerState::Null => NotificationView::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATES: [TimerState; 4] = [
        TimerState::Null,
        TimerState::Pomodoro,
        TimerState::ShortBreak,
        TimerState::LongBreak,
    ];

    fn expected(state: TimerState, paused: bool, starting: bool, ending: bool) -> NotificationView {
        use NotificationView::*;

        match (state, paused) {
            (TimerState::Pomodoro, true) if starting => BreakEnded,
            (_, true) => Null,
            (TimerState::Null, false) => Null,
            (TimerState::Pomodoro, false) => {
                if ending { PomodoroAboutToEnd } else { Pomodoro }
            }
            (_, false) => {
                if ending { BreakAboutToEnd } else { Break }
            }
        }
    }

    #[test]
    fn resolves_every_combination() {
        for state in STATES {
            for paused in [false, true] {
                for starting in [false, true] {
                    for ending in [false, true] {
                        assert_eq!(
                            resolve_view(state, paused, starting, ending),
                            expected(state, paused, starting, ending),
                            "state={state} paused={paused} starting={starting} ending={ending}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn paused_pomodoro_at_start_means_break_ended() {
        assert_eq!(
            resolve_view(TimerState::Pomodoro, true, true, false),
            NotificationView::BreakEnded
        );
        assert_eq!(
            resolve_view(TimerState::Pomodoro, true, true, true),
            NotificationView::BreakEnded
        );
        assert_eq!(
            resolve_view(TimerState::ShortBreak, false, false, true),
            NotificationView::BreakAboutToEnd
        );
    }

    #[test]
    fn snapshot_flags_feed_the_resolver() {
        let waiting = TimerSnapshot::new(TimerState::Pomodoro, 1500.0, 0.05, true);
        assert_eq!(NotificationView::from_snapshot(&waiting), NotificationView::BreakEnded);

        let paused_midway = TimerSnapshot::new(TimerState::Pomodoro, 1500.0, 600.0, true);
        assert_eq!(NotificationView::from_snapshot(&paused_midway), NotificationView::Null);

        let closing = TimerSnapshot::new(TimerState::LongBreak, 900.0, 890.0, false);
        assert_eq!(NotificationView::from_snapshot(&closing), NotificationView::BreakAboutToEnd);
    }

    #[test]
    fn phases_group_running_and_ending_views() {
        assert_eq!(NotificationView::PomodoroAboutToEnd.phase(), ViewPhase::Pomodoro);
        assert_eq!(NotificationView::BreakAboutToEnd.without_ending(), NotificationView::Break);
        assert_eq!(NotificationView::BreakEnded.without_ending(), NotificationView::BreakEnded);
        assert!(NotificationView::Break.awaits_announcement());
        assert!(!NotificationView::BreakEnded.awaits_announcement());
    }
}
