//! Overlay lifecycle: CLOSED -> OPENING -> OPENED -> CLOSING -> CLOSED

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, warn};

use super::{
    gestures::{AcknowledgeGesture, DismissGesture},
    InputEvent, InputKind, OverlayEvent, OverlayPresenter, OverlayState, FADE_IN_TIME,
    FADE_OUT_TIME, GRAB_RETRY_INTERVAL, GRAB_TIME_LIMIT, IDLE_ACKNOWLEDGE_THRESHOLD,
    IDLE_OPEN_THRESHOLD, OPEN_MIN_REMAINING_SECS,
};
use crate::{
    services::{IdleMonitor, WindowProbe},
    state::TimerSnapshot,
};

/// What to start once the input grab succeeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AfterGrab {
    Nothing,
    BeginAcknowledge,
    BeginDismiss,
}

#[derive(Debug, Clone, Copy)]
struct GrabRetry {
    started: Instant,
    next_attempt: Instant,
    then: AfterGrab,
}

pub struct ScreenOverlay {
    state: OverlayState,
    acknowledged: bool,
    has_modal: bool,
    destroyed: bool,
    use_gestures: bool,
    presenter: Arc<dyn OverlayPresenter>,
    idle: Arc<dyn IdleMonitor>,
    windows: Arc<dyn WindowProbe>,
    acknowledge_gesture: AcknowledgeGesture,
    dismiss_gesture: DismissGesture,
    transition_at: Option<Instant>,
    grab: Option<GrabRetry>,
    open_when_idle_at: Option<Instant>,
    events: Vec<OverlayEvent>,
}

impl ScreenOverlay {
    pub fn new(
        presenter: Arc<dyn OverlayPresenter>,
        idle: Arc<dyn IdleMonitor>,
        windows: Arc<dyn WindowProbe>,
        use_gestures: bool,
    ) -> Self {
        Self {
            state: OverlayState::Closed,
            acknowledged: false,
            has_modal: false,
            destroyed: false,
            use_gestures,
            presenter,
            idle,
            windows,
            acknowledge_gesture: AcknowledgeGesture::new(IDLE_ACKNOWLEDGE_THRESHOLD),
            dismiss_gesture: DismissGesture::new(),
            transition_at: None,
            grab: None,
            open_when_idle_at: None,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn acknowledged(&self) -> bool {
        self.acknowledged
    }

    pub fn has_modal(&self) -> bool {
        self.has_modal
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn is_waiting_for_idle(&self) -> bool {
        self.open_when_idle_at.is_some()
    }

    pub fn set_use_gestures(&mut self, use_gestures: bool) {
        self.use_gestures = use_gestures;
    }

    /// Drain lifecycle events produced since the last call
    pub fn take_events(&mut self) -> Vec<OverlayEvent> {
        std::mem::take(&mut self.events)
    }

    /// Only an unpaused break with some time left, and never on top of a
    /// fullscreen video.
    pub fn can_open(&self, snapshot: &TimerSnapshot) -> bool {
        if self.destroyed {
            return false;
        }

        if !snapshot.is_break()
            || snapshot.is_paused
            || snapshot.remaining() < OPEN_MIN_REMAINING_SECS
        {
            return false;
        }

        !self.windows.focused_window().is_fullscreen_player()
    }

    /// Start opening. Returns false when the guard refuses.
    pub fn open(&mut self, snapshot: &TimerSnapshot, now: Instant, animate: bool) -> bool {
        if self.state.is_open() {
            return true;
        }

        if !self.can_open(snapshot) {
            debug!("Overlay refused to open");
            return false;
        }

        self.transition_at = None;
        self.open_when_idle_at = None;
        self.state = OverlayState::Opening;
        self.set_acknowledged(false);
        self.events.push(OverlayEvent::Opening);
        self.presenter.show(animate);

        if animate {
            if self.use_gestures && self.idle.idle_time() >= IDLE_ACKNOWLEDGE_THRESHOLD {
                self.acknowledge(now);
            }
            self.transition_at = Some(now + FADE_IN_TIME);
        } else {
            self.complete_open(now);
        }

        true
    }

    /// Arm a watch that opens the overlay once the user went idle
    pub fn open_when_idle(&mut self, now: Instant) {
        if self.state.is_open() || self.destroyed {
            return;
        }

        if self.open_when_idle_at.is_none() {
            self.open_when_idle_at = Some(now);
        }
    }

    pub fn close(&mut self, now: Instant, animate: bool) {
        if matches!(self.state, OverlayState::Closed | OverlayState::Closing) {
            return;
        }

        self.pop_modal();
        self.grab = None;
        self.acknowledge_gesture.end();
        self.dismiss_gesture.end();
        self.state = OverlayState::Closing;
        self.events.push(OverlayEvent::Closing);
        self.presenter.hide(animate);

        if animate {
            self.transition_at = Some(now + FADE_OUT_TIME);
        } else {
            self.complete_close();
        }
    }

    pub fn acknowledge(&mut self, now: Instant) {
        if self.acknowledged {
            return;
        }

        self.set_acknowledged(true);
        self.events.push(OverlayEvent::Acknowledged);

        let then = if self.use_gestures {
            AfterGrab::BeginDismiss
        } else {
            AfterGrab::Nothing
        };
        self.push_modal(now, then);
    }

    pub fn dismiss(&mut self, now: Instant) {
        if self.acknowledged {
            self.close(now, true);
        }
    }

    /// Feed a user input event. Returns whether the overlay consumed it.
    pub fn handle_input(&mut self, event: &InputEvent, now: Instant) -> bool {
        if !self.state.is_open() {
            return false;
        }

        if event.kind == InputKind::KeyPress && event.escape && self.state == OverlayState::Opened {
            self.close(now, true);
            return true;
        }

        if self.acknowledge_gesture.handle_event(event, now) {
            return true;
        }

        if event.kind == InputKind::KeyPress
            && self.acknowledged
            && !self.dismiss_gesture.is_active()
        {
            self.close(now, true);
            return true;
        }

        if self.dismiss_gesture.handle_event(event) {
            self.dismiss(now);
        }

        true
    }

    /// Earliest moment [`poll`](Self::poll) has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.transition_at,
            self.grab.map(|grab| grab.next_attempt),
            self.acknowledge_gesture.next_deadline(),
            self.open_when_idle_at,
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Run whatever became due at `now`
    pub fn poll(&mut self, snapshot: &TimerSnapshot, now: Instant) {
        if let Some(at) = self.transition_at {
            if now >= at {
                self.transition_at = None;
                match self.state {
                    OverlayState::Opening => self.complete_open(now),
                    OverlayState::Closing => self.complete_close(),
                    _ => {}
                }
            }
        }

        if let Some(grab) = self.grab {
            if now >= grab.next_attempt {
                self.retry_grab(grab, now);
            }
        }

        if self.acknowledge_gesture.poll(now) {
            self.acknowledge(now);
        }

        if let Some(at) = self.open_when_idle_at {
            if now >= at {
                let idle = self.idle.idle_time();
                if idle >= IDLE_OPEN_THRESHOLD {
                    self.open_when_idle_at = None;
                    debug!("User idle for {:?}, reopening overlay", idle);
                    self.open(snapshot, now, true);
                } else {
                    self.open_when_idle_at = Some(now + (IDLE_OPEN_THRESHOLD - idle));
                }
            }
        }
    }

    /// Tear down without animation. The overlay cannot be reopened.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }

        self.transition_at = None;
        self.grab = None;
        self.open_when_idle_at = None;
        self.acknowledge_gesture.end();
        self.dismiss_gesture.end();
        self.pop_modal();

        if self.state != OverlayState::Closed {
            self.presenter.hide(false);
            self.state = OverlayState::Closed;
        }

        self.destroyed = true;
        self.events.clear();
    }

    fn set_acknowledged(&mut self, acknowledged: bool) {
        self.acknowledged = acknowledged;
        self.presenter.set_acknowledged(acknowledged);
    }

    fn complete_open(&mut self, now: Instant) {
        self.state = OverlayState::Opened;
        self.events.push(OverlayEvent::Opened);
        self.begin_acknowledge_gesture(now);
    }

    fn complete_close(&mut self) {
        self.transition_at = None;
        self.state = OverlayState::Closed;
        self.events.push(OverlayEvent::Closed);
    }

    fn begin_acknowledge_gesture(&mut self, now: Instant) {
        if self.acknowledged || self.state != OverlayState::Opened {
            return;
        }

        if !self.use_gestures || self.idle.idle_time() >= IDLE_ACKNOWLEDGE_THRESHOLD {
            self.acknowledge(now);
            return;
        }

        self.push_modal(now, AfterGrab::BeginAcknowledge);
    }

    fn push_modal(&mut self, now: Instant, then: AfterGrab) {
        if self.has_modal {
            self.after_grab(then, now);
            return;
        }

        if matches!(self.state, OverlayState::Closed | OverlayState::Closing) || self.destroyed {
            return;
        }

        if self.presenter.grab_input() {
            self.has_modal = true;
            self.after_grab(then, now);
            return;
        }

        match self.grab.as_mut() {
            Some(grab) => grab.then = then,
            None => {
                debug!("Input grab refused, retrying");
                self.grab = Some(GrabRetry {
                    started: now,
                    next_attempt: now + GRAB_RETRY_INTERVAL,
                    then,
                });
            }
        }
    }

    fn retry_grab(&mut self, grab: GrabRetry, now: Instant) {
        if self.presenter.grab_input() {
            self.grab = None;
            self.has_modal = true;
            self.after_grab(grab.then, now);
        } else if now.saturating_duration_since(grab.started) >= GRAB_TIME_LIMIT {
            warn!("Unable to become fully modal, closing overlay");
            self.grab = None;
            self.close(now, true);
        } else {
            self.grab = Some(GrabRetry {
                next_attempt: now + GRAB_RETRY_INTERVAL,
                ..grab
            });
        }
    }

    fn after_grab(&mut self, then: AfterGrab, now: Instant) {
        match then {
            AfterGrab::Nothing => {}
            AfterGrab::BeginAcknowledge => self.acknowledge_gesture.begin(now),
            AfterGrab::BeginDismiss => self.dismiss_gesture.begin(),
        }
    }

    fn pop_modal(&mut self) {
        if self.has_modal {
            self.presenter.release_input();
            self.has_modal = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        services::{FocusedWindowInfo, ReportedWindow},
        state::TimerState,
    };
    use std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Mutex,
        },
        time::Duration,
    };

    struct FakePresenter {
        grab_ok: AtomicBool,
        calls: Mutex<Vec<&'static str>>,
    }

    impl FakePresenter {
        fn new(grab_ok: bool) -> Arc<Self> {
            Arc::new(Self {
                grab_ok: AtomicBool::new(grab_ok),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    impl OverlayPresenter for FakePresenter {
        fn show(&self, _animate: bool) {
            self.calls.lock().unwrap().push("show");
        }
        fn hide(&self, _animate: bool) {
            self.calls.lock().unwrap().push("hide");
        }
        fn grab_input(&self) -> bool {
            self.grab_ok.load(Ordering::SeqCst)
        }
        fn release_input(&self) {
            self.calls.lock().unwrap().push("release");
        }
    }

    struct FixedIdle(Mutex<Duration>);

    impl IdleMonitor for FixedIdle {
        fn idle_time(&self) -> Duration {
            *self.0.lock().unwrap()
        }
    }

    struct Harness {
        overlay: ScreenOverlay,
        presenter: Arc<FakePresenter>,
        idle: Arc<FixedIdle>,
        windows: Arc<ReportedWindow>,
    }

    fn harness(grab_ok: bool, use_gestures: bool) -> Harness {
        let presenter = FakePresenter::new(grab_ok);
        let idle = Arc::new(FixedIdle(Mutex::new(Duration::ZERO)));
        let windows = Arc::new(ReportedWindow::new());
        let overlay = ScreenOverlay::new(
            presenter.clone(),
            idle.clone(),
            windows.clone(),
            use_gestures,
        );
        Harness {
            overlay,
            presenter,
            idle,
            windows,
        }
    }

    fn short_break() -> TimerSnapshot {
        TimerSnapshot::new(TimerState::ShortBreak, 300.0, 0.0, false)
    }

    #[test]
    fn refuses_outside_a_running_break() {
        let mut h = harness(true, true);
        let now = Instant::now();

        let pomodoro = TimerSnapshot::new(TimerState::Pomodoro, 1500.0, 0.0, false);
        assert!(!h.overlay.open(&pomodoro, now, false));

        let paused = TimerSnapshot::new(TimerState::ShortBreak, 300.0, 10.0, true);
        assert!(!h.overlay.open(&paused, now, false));

        let almost_over = TimerSnapshot::new(TimerState::ShortBreak, 300.0, 298.0, false);
        assert!(!h.overlay.open(&almost_over, now, false));

        h.windows.report(FocusedWindowInfo {
            is_player: true,
            is_fullscreen: true,
        });
        assert!(!h.overlay.open(&short_break(), now, false));
        assert_eq!(h.overlay.state(), OverlayState::Closed);
        assert!(h.overlay.take_events().is_empty());
    }

    #[test]
    fn open_and_close_are_idempotent() {
        let mut h = harness(true, true);
        let now = Instant::now();

        h.overlay.close(now, true);
        assert!(h.overlay.take_events().is_empty());

        assert!(h.overlay.open(&short_break(), now, true));
        assert_eq!(h.overlay.state(), OverlayState::Opening);
        assert!(h.overlay.open(&short_break(), now, true));
        assert_eq!(h.overlay.take_events(), vec![OverlayEvent::Opening]);

        h.overlay.poll(&short_break(), now + FADE_IN_TIME);
        assert_eq!(h.overlay.state(), OverlayState::Opened);
        assert!(h.overlay.open(&short_break(), now, true));
        assert_eq!(h.overlay.take_events(), vec![OverlayEvent::Opened]);

        h.overlay.close(now, false);
        h.overlay.close(now, false);
        assert_eq!(
            h.overlay.take_events(),
            vec![OverlayEvent::Closing, OverlayEvent::Closed]
        );
        assert_eq!(*h.presenter.calls.lock().unwrap(), vec!["show", "release", "hide"]);
    }

    #[test]
    fn close_interrupts_opening() {
        let mut h = harness(true, true);
        let now = Instant::now();

        h.overlay.open(&short_break(), now, true);
        h.overlay.close(now + Duration::from_millis(100), true);
        assert_eq!(h.overlay.state(), OverlayState::Closing);

        h.overlay.poll(&short_break(), now + Duration::from_secs(1));
        assert_eq!(h.overlay.state(), OverlayState::Closed);
        assert_eq!(
            h.overlay.take_events(),
            vec![OverlayEvent::Opening, OverlayEvent::Closing, OverlayEvent::Closed]
        );
    }

    #[test]
    fn stray_input_right_after_opening_does_not_dismiss() {
        let mut h = harness(true, true);
        let now = Instant::now();

        h.overlay.open(&short_break(), now, false);
        assert!(h.overlay.has_modal());
        assert!(!h.overlay.acknowledged());

        // Typing continues: each key press restarts the quiet period.
        let key = InputEvent::new(InputKind::KeyPress);
        for ms in [100, 300, 500] {
            assert!(h.overlay.handle_input(&key, now + Duration::from_millis(ms)));
            h.overlay.poll(&short_break(), now + Duration::from_millis(ms + 60));
        }
        assert_eq!(h.overlay.state(), OverlayState::Opened);
        assert!(!h.overlay.acknowledged());

        // Quiet for the threshold: acknowledged, and the next action closes.
        let mut t = now + Duration::from_millis(500);
        while !h.overlay.acknowledged() {
            t += Duration::from_millis(60);
            h.overlay.poll(&short_break(), t);
        }
        assert!(t >= now + Duration::from_millis(1100));

        h.overlay.handle_input(&InputEvent::new(InputKind::ButtonPress), t);
        assert_eq!(h.overlay.state(), OverlayState::Closing);
    }

    #[test]
    fn idle_user_is_acknowledged_immediately() {
        let mut h = harness(true, true);
        *h.idle.0.lock().unwrap() = Duration::from_secs(5);
        let now = Instant::now();

        h.overlay.open(&short_break(), now, false);
        assert!(h.overlay.acknowledged());

        h.overlay.handle_input(&InputEvent::motion(10.0, 10.0), now);
        h.overlay.handle_input(&InputEvent::motion(50.0, 10.0), now);
        assert_eq!(h.overlay.state(), OverlayState::Closing);
    }

    #[test]
    fn escape_closes_an_opened_overlay() {
        let mut h = harness(true, true);
        let now = Instant::now();

        h.overlay.open(&short_break(), now, false);
        h.overlay.handle_input(&InputEvent::escape(), now);
        assert!(!h.overlay.is_open());
    }

    #[test]
    fn without_gestures_only_explicit_actions_close() {
        let mut h = harness(true, false);
        let now = Instant::now();

        h.overlay.open(&short_break(), now, false);
        assert!(h.overlay.acknowledged());

        h.overlay.handle_input(&InputEvent::motion(0.0, 0.0), now);
        h.overlay.handle_input(&InputEvent::motion(500.0, 500.0), now);
        assert_eq!(h.overlay.state(), OverlayState::Opened);
    }

    #[test]
    fn gives_up_when_input_cannot_be_grabbed() {
        let mut h = harness(false, true);
        let now = Instant::now();

        h.overlay.open(&short_break(), now, false);
        assert_eq!(h.overlay.state(), OverlayState::Opened);

        let mut t = now;
        while h.overlay.state() == OverlayState::Opened {
            t = h.overlay.next_deadline().expect("grab retry pending");
            h.overlay.poll(&short_break(), t);
        }
        assert!(t >= now + GRAB_TIME_LIMIT);
        assert_eq!(h.overlay.state(), OverlayState::Closing);
    }

    #[test]
    fn late_grab_still_starts_the_gesture() {
        let mut h = harness(false, true);
        let now = Instant::now();

        h.overlay.open(&short_break(), now, false);
        h.presenter.grab_ok.store(true, Ordering::SeqCst);
        h.overlay.poll(&short_break(), now + GRAB_RETRY_INTERVAL);

        assert!(h.overlay.has_modal());
        assert!(h.overlay.next_deadline().is_some());
    }

    #[test]
    fn reopens_once_the_user_goes_idle() {
        let mut h = harness(true, true);
        let now = Instant::now();

        h.overlay.open_when_idle(now);
        h.overlay.poll(&short_break(), now);
        assert_eq!(h.overlay.state(), OverlayState::Closed);
        assert_eq!(h.overlay.next_deadline(), Some(now + IDLE_OPEN_THRESHOLD));

        *h.idle.0.lock().unwrap() = IDLE_OPEN_THRESHOLD;
        h.overlay.poll(&short_break(), now + IDLE_OPEN_THRESHOLD);
        assert_eq!(h.overlay.state(), OverlayState::Opening);
        assert!(!h.overlay.is_waiting_for_idle());
    }

    #[test]
    fn destroyed_overlay_stays_closed() {
        let mut h = harness(true, true);
        let now = Instant::now();

        h.overlay.open(&short_break(), now, true);
        h.overlay.destroy();
        assert_eq!(h.overlay.state(), OverlayState::Closed);
        assert!(!h.overlay.open(&short_break(), now, false));
        assert_eq!(h.overlay.next_deadline(), None);
    }
}
