//! Banner notifications and the source that carries them

use std::{fmt, sync::Arc};

use serde::Serialize;
use tracing::debug;

use super::view::NotificationView;
use crate::state::{TimerSnapshot, TimerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BannerId(pub u64);

impl fmt::Display for BannerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "banner-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerKind {
    /// Tracks the timer view and its countdown
    Timer,
    /// One-off nudge about an ignored break
    Reminder,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Banner {
    pub id: BannerId,
    pub kind: BannerKind,
    pub view: NotificationView,
    pub timer_state: TimerState,
    pub urgency: Urgency,
    pub is_transient: bool,
    pub resident: bool,
    /// The user engaged with the banner (hovered, focused, clicked)
    pub acknowledged: bool,
    pub title: String,
    pub body: Option<String>,
}

impl Banner {
    pub fn for_view(id: BannerId, view: NotificationView, snapshot: &TimerSnapshot) -> Self {
        debug_assert!(
            view != NotificationView::Null,
            "banners are never created for the null view"
        );

        let urgency = if view.is_about_to_end()
            || view == NotificationView::BreakEnded
            || snapshot.is_starting()
        {
            Urgency::Critical
        } else {
            Urgency::High
        };

        Self {
            id,
            kind: BannerKind::Timer,
            view,
            timer_state: snapshot.state,
            urgency,
            is_transient: false,
            resident: true,
            acknowledged: false,
            title: title_for(view).to_string(),
            body: body_for(view, snapshot),
        }
    }

    pub fn reminder(id: BannerId, snapshot: &TimerSnapshot) -> Self {
        Self {
            id,
            kind: BannerKind::Reminder,
            view: NotificationView::Break,
            timer_state: snapshot.state,
            urgency: Urgency::Low,
            is_transient: true,
            resident: false,
            acknowledged: false,
            title: "Hey!".to_string(),
            body: Some("You're missing out on a break".to_string()),
        }
    }

    /// Recompute the countdown text; returns true if it changed
    pub fn refresh(&mut self, snapshot: &TimerSnapshot) -> bool {
        if self.kind != BannerKind::Timer {
            return false;
        }

        let body = body_for(self.view, snapshot);
        if body != self.body {
            self.body = body;
            true
        } else {
            false
        }
    }
}

fn title_for(view: NotificationView) -> &'static str {
    match view {
        NotificationView::Null | NotificationView::Pomodoro => "Pomodoro",
        NotificationView::PomodoroAboutToEnd => "Pomodoro is about to end",
        NotificationView::Break => "Take a break!",
        NotificationView::BreakAboutToEnd => "Break is about to end",
        NotificationView::BreakEnded => "Break is over",
    }
}

fn body_for(view: NotificationView, snapshot: &TimerSnapshot) -> Option<String> {
    match view {
        NotificationView::Null => None,
        NotificationView::Pomodoro => Some("Focus on your task.".to_string()),
        NotificationView::PomodoroAboutToEnd => {
            Some(format!("{} until break.", format_remaining(snapshot.remaining())))
        }
        NotificationView::Break | NotificationView::BreakAboutToEnd => Some(format!(
            "You have {} until next pomodoro.",
            format_remaining(snapshot.remaining())
        )),
        NotificationView::BreakEnded => Some("Get ready…".to_string()),
    }
}

/// Coarse countdown text: minutes above 45s, otherwise seconds rounded up
/// to quarter minutes while above 15s.
pub fn format_remaining(remaining: f64) -> String {
    let remaining = remaining.max(0.0);

    if remaining > 45.0 {
        let minutes = (remaining / 60.0).round() as u64;
        return plural(minutes, "minute");
    }

    let mut seconds = remaining.round() as u64;
    if remaining > 15.0 {
        seconds = seconds.div_ceil(15) * 15;
    }
    plural(seconds, "second")
}

fn plural(count: u64, unit: &str) -> String {
    if count == 1 {
        format!("{} {}", count, unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

/// Rendering side of banners
pub trait BannerPresenter: Send + Sync {
    /// The source appears in the shell's notification list
    fn register_source(&self);
    fn unregister_source(&self);
    /// Pop the banner up, drawing attention
    fn show(&self, banner: &Banner);
    /// Change the banner contents without re-alerting
    fn update(&self, banner: &Banner);
    fn expire(&self, id: BannerId);
}

/// Notification source with an explicit lifetime: registered with the
/// presenter on its first banner and unregistered after the last one goes.
pub struct NotificationSource {
    presenter: Arc<dyn BannerPresenter>,
    live: Vec<BannerId>,
    registered: bool,
}

impl NotificationSource {
    pub fn new(presenter: Arc<dyn BannerPresenter>) -> Self {
        Self {
            presenter,
            live: Vec::new(),
            registered: false,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn count(&self) -> usize {
        self.live.len()
    }

    pub fn contains(&self, id: BannerId) -> bool {
        self.live.contains(&id)
    }

    pub fn notify(&mut self, banner: &Banner) {
        if !self.registered {
            debug!("Registering notification source");
            self.presenter.register_source();
            self.registered = true;
        }

        if !self.live.contains(&banner.id) {
            self.live.push(banner.id);
        }

        self.presenter.show(banner);
    }

    pub fn update(&self, banner: &Banner) {
        if self.live.contains(&banner.id) {
            self.presenter.update(banner);
        }
    }

    pub fn remove(&mut self, id: BannerId) {
        let Some(index) = self.live.iter().position(|live| *live == id) else {
            return;
        };

        self.live.remove(index);
        self.presenter.expire(id);

        if self.live.is_empty() {
            self.unregister();
        }
    }

    pub fn destroy(&mut self) {
        for id in std::mem::take(&mut self.live) {
            self.presenter.expire(id);
        }
        self.unregister();
    }

    fn unregister(&mut self) {
        if self.registered {
            debug!("Last banner removed, unregistering notification source");
            self.presenter.unregister_source();
            self.registered = false;
        }
    }
}
