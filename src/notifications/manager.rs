//! Decides when and how to interrupt the user
//!
//! The manager owns the single banner slot and the single overlay slot.
//! It is driven by timer events, by its own timers (announcement,
//! reminder, overlay transitions) and by user input, always from one task.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{
    banner::{Banner, BannerId, BannerKind, NotificationSource},
    reminder::Reminder,
    view::NotificationView,
};
use crate::{
    config::NotificationSettings,
    overlay::{InputEvent, OverlayEvent, OverlayState, ScreenOverlay},
    services::ShellServices,
    state::{TimerSnapshot, TimerState, ANNOUNCEMENT_LEAD_SECS},
    timer::TimerEvent,
};

/// What the manager currently shows, as reported by `/status`
#[derive(Debug, Clone, Serialize)]
pub struct NotificationStatus {
    pub timer_state: TimerState,
    pub view: NotificationView,
    pub banner: Option<Banner>,
    pub banner_visible: bool,
    pub overlay: OverlayState,
    pub overlay_acknowledged: bool,
    /// Seconds until the announcement fires
    pub announcement_in: Option<f64>,
    pub reminder_scheduled: bool,
    pub busy: Option<bool>,
}

pub struct NotificationManager {
    settings: NotificationSettings,
    services: ShellServices,
    source: NotificationSource,
    banner: Option<Banner>,
    next_banner_id: u64,
    overlay: Option<ScreenOverlay>,
    timer_state: TimerState,
    view: NotificationView,
    snapshot: TimerSnapshot,
    snapshot_at: Instant,
    announcement: Option<Instant>,
    reminder: Reminder,
    busy: Option<bool>,
    destroyed: bool,
}

impl NotificationManager {
    /// Create the manager and evaluate the initial timer snapshot
    pub fn new(
        settings: NotificationSettings,
        services: ShellServices,
        snapshot: TimerSnapshot,
        now: Instant,
    ) -> Self {
        let mut manager = Self {
            source: NotificationSource::new(services.banners.clone()),
            reminder: Reminder::new(services.idle.clone(), services.windows.clone()),
            settings,
            services,
            banner: None,
            next_banner_id: 1,
            overlay: None,
            timer_state: TimerState::Null,
            view: NotificationView::Null,
            snapshot,
            snapshot_at: now,
            announcement: None,
            busy: None,
            destroyed: false,
        };

        manager.update(now);
        manager
    }

    pub fn view(&self) -> NotificationView {
        self.view
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn is_banner_visible(&self) -> bool {
        self.banner
            .as_ref()
            .is_some_and(|banner| self.source.contains(banner.id))
    }

    pub fn overlay_state(&self) -> OverlayState {
        self.overlay
            .as_ref()
            .map(ScreenOverlay::state)
            .unwrap_or_default()
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    pub fn announcement_deadline(&self) -> Option<Instant> {
        self.announcement
    }

    pub fn is_reminder_scheduled(&self) -> bool {
        self.reminder.is_scheduled()
    }

    pub fn settings(&self) -> NotificationSettings {
        self.settings
    }

    /// Feed one facade event together with the snapshot it was emitted for
    pub fn handle_event(&mut self, event: TimerEvent, snapshot: TimerSnapshot, now: Instant) {
        if self.destroyed {
            return;
        }

        self.snapshot = snapshot;
        self.snapshot_at = now;

        match event {
            TimerEvent::StateChanged | TimerEvent::Paused | TimerEvent::Resumed => {
                self.update(now)
            }
            TimerEvent::Update => self.on_tick(now),
            TimerEvent::ServiceDisconnected => {
                self.snapshot = TimerSnapshot::null();
                self.update(now);
            }
            TimerEvent::ServiceConnected => debug!("Timer service available"),
        }
    }

    /// Full policy evaluation against the current snapshot
    fn update(&mut self, now: Instant) {
        let snapshot = self.snapshot;
        let view = NotificationView::from_snapshot(&snapshot);
        let previous_state = self.timer_state;
        let previous_view = self.view;

        self.timer_state = snapshot.state;
        self.view = view;
        self.update_presence();

        if snapshot.state == TimerState::Null {
            self.teardown();
            return;
        }

        if previous_state != snapshot.state {
            self.reminder.reset();
        }

        if !snapshot.is_break() || snapshot.is_paused {
            self.reminder.unschedule();
            if let Some(overlay) = self.overlay.as_mut() {
                overlay.close(now, true);
            }
        }

        if !self.should_notify(previous_state, previous_view, view) {
            if view == NotificationView::Null {
                self.expire_banner();
            } else {
                self.refresh_banner();
            }
        } else if view == NotificationView::Break && self.settings.screen_notifications {
            // The banner is kept ready but stays hidden behind the overlay.
            self.notify_banner(view, false);
            if !self.open_overlay(now, false) {
                self.show_banner(now);
            }
        } else {
            self.notify_banner(view, true);
            if view == NotificationView::Break {
                self.schedule_reminder(now);
            }
        }

        self.reschedule_announcement(now);
        self.drain_overlay_events(now);
    }

    fn should_notify(
        &self,
        previous_state: TimerState,
        previous_view: NotificationView,
        view: NotificationView,
    ) -> bool {
        let snapshot = &self.snapshot;

        if view == NotificationView::Null {
            return false;
        }

        // Phase got extended rather than restarted.
        if previous_view.is_about_to_end()
            && view == previous_view.without_ending()
            && previous_state == snapshot.state
            && !snapshot.is_starting()
        {
            return false;
        }

        let overlay_open = self.overlay.as_ref().is_some_and(ScreenOverlay::is_open);
        if overlay_open && snapshot.is_break() {
            return false;
        }

        // A user-initiated start needs no announcement.
        if previous_state == TimerState::Null && view == NotificationView::Pomodoro {
            return false;
        }

        let engaged = self.banner.as_ref().is_some_and(|banner| {
            banner.acknowledged
                && banner.kind == BannerKind::Timer
                && banner.view == NotificationView::Pomodoro
        });
        if engaged && view == NotificationView::Pomodoro && snapshot.is_starting() {
            return false;
        }

        previous_state != snapshot.state || previous_view != view || snapshot.is_starting()
    }

    /// Put a banner for `view` in the slot, replacing one from another
    /// phase or showing it again in place.
    fn notify_banner(&mut self, view: NotificationView, show: bool) {
        let snapshot = self.snapshot;

        let in_place = self.banner.as_ref().is_some_and(|banner| {
            banner.kind == BannerKind::Timer
                && banner.view == view
                && banner.timer_state == snapshot.state
        });

        if !in_place {
            self.expire_banner();
            let banner = Banner::for_view(self.allocate_banner_id(), view, &snapshot);
            info!("Notifying {:?} ({})", view, banner.id);
            if show {
                self.source.notify(&banner);
            }
            self.banner = Some(banner);
            return;
        }

        let Some(current) = self.banner.as_mut() else {
            return;
        };

        let mut updated = Banner::for_view(current.id, view, &snapshot);
        updated.acknowledged = current.acknowledged;
        let changed = updated != *current;
        *current = updated;

        let live = self.source.contains(current.id);
        if show && !live {
            self.source.notify(current);
        } else if live && changed {
            self.source.update(current);
        }
    }

    /// Make the banner for the current view visible
    fn show_banner(&mut self, now: Instant) {
        if self.view == NotificationView::Null {
            return;
        }

        self.notify_banner(self.view, true);
        if self.view == NotificationView::Break {
            self.schedule_reminder(now);
        }
    }

    /// Take the banner off screen but keep it in the slot
    fn hide_banner(&mut self) {
        if let Some(banner) = self.banner.as_ref() {
            self.source.remove(banner.id);
        }
    }

    fn expire_banner(&mut self) {
        if let Some(banner) = self.banner.take() {
            debug!("Expiring {}", banner.id);
            self.source.remove(banner.id);
        }
    }

    fn refresh_banner(&mut self) {
        let snapshot = self.snapshot;
        let Some(banner) = self.banner.as_mut() else {
            return;
        };

        if banner.refresh(&snapshot) {
            self.source.update(banner);
        }
    }

    fn allocate_banner_id(&mut self) -> BannerId {
        let id = BannerId(self.next_banner_id);
        self.next_banner_id += 1;
        id
    }

    fn open_overlay(&mut self, now: Instant, animate: bool) -> bool {
        if !self.settings.screen_notifications || self.destroyed {
            return false;
        }

        let services = &self.services;
        let use_gestures = self.settings.dismiss_gesture;
        let overlay = self.overlay.get_or_insert_with(|| {
            ScreenOverlay::new(
                services.overlays.clone(),
                services.idle.clone(),
                services.windows.clone(),
                use_gestures,
            )
        });

        overlay.open(&self.snapshot, now, animate)
    }

    fn drain_overlay_events(&mut self, now: Instant) {
        let events = match self.overlay.as_mut() {
            Some(overlay) => overlay.take_events(),
            None => return,
        };

        for event in events {
            match event {
                OverlayEvent::Opening => {
                    self.hide_banner();
                    self.reminder.unschedule();
                }
                OverlayEvent::Closing => {
                    let snapshot = self.snapshot;
                    if snapshot.is_break() && !snapshot.is_paused {
                        self.show_banner(now);
                        if let Some(overlay) = self.overlay.as_mut() {
                            overlay.open_when_idle(now);
                        }
                    }
                }
                OverlayEvent::Opened | OverlayEvent::Acknowledged | OverlayEvent::Closed => {
                    debug!("Overlay {:?}", event);
                }
            }
        }
    }

    fn is_break_banner_visible(&self) -> bool {
        self.snapshot.is_break()
            && !self.snapshot.is_paused
            && self.view == NotificationView::Break
            && self.is_banner_visible()
    }

    fn schedule_reminder(&mut self, now: Instant) {
        if self.settings.reminders && !self.reminder.acknowledged() {
            self.reminder.schedule(now);
        }
    }

    fn reschedule_announcement(&mut self, now: Instant) {
        self.announcement = None;

        if !self.view.awaits_announcement() {
            return;
        }

        let snapshot = &self.snapshot;
        let delay = (snapshot.state_duration - snapshot.elapsed - ANNOUNCEMENT_LEAD_SECS).max(0.0);
        let at = Duration::try_from_secs_f64(delay)
            .ok()
            .and_then(|delay| now.checked_add(delay));

        match at {
            Some(at) => {
                debug!("Announcement in {:.1}s", delay);
                self.announcement = Some(at);
            }
            None => warn!("Phase too long to announce ({}s left)", snapshot.remaining()),
        }
    }

    /// Periodic update: refresh countdown text in place
    fn on_tick(&mut self, now: Instant) {
        let view = NotificationView::from_snapshot(&self.snapshot);

        // Catch up when the announcement could not fire in time.
        if view.is_about_to_end()
            && !self.view.is_about_to_end()
            && self.snapshot.remaining() <= ANNOUNCEMENT_LEAD_SECS
        {
            self.update(now);
            return;
        }

        self.refresh_banner();
    }

    fn update_presence(&mut self) {
        let state = self.snapshot.state;

        if !self.settings.hide_system_notifications || state == TimerState::Null {
            if self.busy.take().is_some() {
                self.services.presence.set_default();
            }
            return;
        }

        let busy = state == TimerState::Pomodoro && !self.snapshot.is_paused;
        if self.busy != Some(busy) {
            self.services.presence.set_busy(busy);
            self.busy = Some(busy);
        }
    }

    /// Timer stopped or went away: drop everything
    fn teardown(&mut self) {
        self.announcement = None;
        self.reminder.reset();

        if let Some(mut overlay) = self.overlay.take() {
            overlay.destroy();
        }

        self.expire_banner();
    }

    /// Snapshot advanced by the time passed since it was taken
    fn projected_snapshot(&self, now: Instant) -> TimerSnapshot {
        let mut snapshot = self.snapshot;
        if snapshot.state != TimerState::Null && !snapshot.is_paused {
            snapshot.elapsed += now.saturating_duration_since(self.snapshot_at).as_secs_f64();
        }
        snapshot
    }

    /// Earliest moment [`poll_timers`](Self::poll_timers) has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.announcement,
            self.reminder.next_deadline(),
            self.overlay.as_ref().and_then(ScreenOverlay::next_deadline),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Run every timer that is due at `now`
    pub fn poll_timers(&mut self, now: Instant) {
        if self.destroyed {
            return;
        }

        if self.announcement.is_some_and(|at| now >= at) {
            self.announcement = None;
            self.snapshot = self.projected_snapshot(now);
            self.snapshot_at = now;
            debug!("Announcement due, remaining {}s", self.snapshot.remaining());
            self.update(now);
        }

        let projected = self.projected_snapshot(now);

        if self.reminder.poll(&projected, now) {
            self.show_reminder();
        }

        if let Some(overlay) = self.overlay.as_mut() {
            overlay.poll(&projected, now);
        }
        self.drain_overlay_events(now);
    }

    fn show_reminder(&mut self) {
        if self.overlay.as_ref().is_some_and(ScreenOverlay::is_open) {
            return;
        }

        self.expire_banner();
        let banner = Banner::reminder(self.allocate_banner_id(), &self.snapshot);
        info!("Reminding about the break ({})", banner.id);
        self.source.notify(&banner);
        self.banner = Some(banner);
    }

    /// User input for the overlay gestures; true if the overlay used it
    pub fn handle_input(&mut self, event: &InputEvent, now: Instant) -> bool {
        let consumed = self
            .overlay
            .as_mut()
            .is_some_and(|overlay| overlay.handle_input(event, now));
        self.drain_overlay_events(now);
        consumed
    }

    /// The user engaged with the banner (hover, focus)
    pub fn acknowledge_banner(&mut self) -> bool {
        match self.banner.as_mut() {
            Some(banner) => {
                banner.acknowledged = true;
                true
            }
            None => false,
        }
    }

    /// Banner clicked: during a running break bring the overlay back
    pub fn activate_banner(&mut self, now: Instant) -> bool {
        if self.banner.is_none() {
            return false;
        }

        let snapshot = self.snapshot;
        if !snapshot.is_break() || snapshot.is_paused {
            return false;
        }

        self.reminder.dismiss();

        if self
            .banner
            .as_ref()
            .is_some_and(|banner| banner.kind == BannerKind::Reminder)
        {
            self.expire_banner();
            self.notify_banner(self.view, true);
        }

        let opened = self.open_overlay(now, true);
        self.drain_overlay_events(now);
        opened
    }

    /// The user closed the banner
    pub fn dismiss_banner(&mut self) -> bool {
        if self
            .banner
            .as_ref()
            .is_some_and(|banner| banner.kind == BannerKind::Reminder)
        {
            self.reminder.dismiss();
        }

        match self.banner.take() {
            Some(banner) => {
                self.source.remove(banner.id);
                true
            }
            None => false,
        }
    }

    pub fn close_overlay(&mut self, now: Instant) -> bool {
        let Some(overlay) = self.overlay.as_mut() else {
            return false;
        };

        let was_open = overlay.is_open();
        overlay.close(now, true);
        self.drain_overlay_events(now);
        was_open
    }

    /// Apply changed settings to whatever is live
    pub fn set_settings(&mut self, settings: NotificationSettings, now: Instant) {
        let previous = self.settings;
        self.settings = settings;

        if previous.screen_notifications && !settings.screen_notifications {
            if let Some(mut overlay) = self.overlay.take() {
                let was_open = overlay.is_open();
                overlay.destroy();
                if was_open && self.snapshot.is_break() && !self.snapshot.is_paused {
                    self.show_banner(now);
                }
            }
        }

        if previous.dismiss_gesture != settings.dismiss_gesture {
            if let Some(overlay) = self.overlay.as_mut() {
                overlay.set_use_gestures(settings.dismiss_gesture);
            }
        }

        if previous.reminders && !settings.reminders {
            self.reminder.unschedule();
        }

        if !previous.reminders && settings.reminders && self.is_break_banner_visible() {
            self.schedule_reminder(now);
        }

        if previous.hide_system_notifications != settings.hide_system_notifications {
            self.update_presence();
        }
    }

    pub fn status(&self, now: Instant) -> NotificationStatus {
        NotificationStatus {
            timer_state: self.timer_state,
            view: self.view,
            banner: self.banner.clone(),
            banner_visible: self.is_banner_visible(),
            overlay: self.overlay_state(),
            overlay_acknowledged: self
                .overlay
                .as_ref()
                .is_some_and(ScreenOverlay::acknowledged),
            announcement_in: self
                .announcement
                .map(|at| at.saturating_duration_since(now).as_secs_f64()),
            reminder_scheduled: self.reminder.is_scheduled(),
            busy: self.busy,
        }
    }

    /// Deterministic teardown: timers, overlay, banner, source, presence
    pub fn shutdown(&mut self) {
        if self.destroyed {
            return;
        }

        info!("Shutting down notifications");
        self.announcement = None;
        self.reminder.unschedule();

        if let Some(mut overlay) = self.overlay.take() {
            overlay.destroy();
        }

        self.expire_banner();
        self.source.destroy();

        if self.busy.take().is_some() {
            self.services.presence.set_default();
        }

        self.destroyed = true;
    }
}
