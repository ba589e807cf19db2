//! The control loop: single owner of the timer facade and notifications

use std::sync::Arc;

use tokio::{
    sync::{
        broadcast::{self, error::RecvError},
        mpsc, watch,
    },
    time::{sleep_until, Instant},
};
use tracing::{debug, info, warn};

use crate::{
    config::{NotificationSettings, TimerSettings},
    notifications::{NotificationManager, NotificationView},
    services::{ActivityMonitor, ReportedWindow, ShellServices},
    state::{
        BannerAction, ControlCommand, ControlHandle, ControlRequest, DaemonStatus, TimerAction,
    },
    timer::{RemoteSignal, RemoteTimer, TimerEvent, TimerFacade},
};

const COMMAND_QUEUE: usize = 32;

/// Actor owning [`TimerFacade`] and [`NotificationManager`].
///
/// Remote signals, API commands and notification timers are all handled
/// here one at a time, so policy evaluation never interleaves.
pub struct ControlLoop {
    facade: TimerFacade,
    manager: NotificationManager,
    activity: Arc<ActivityMonitor>,
    windows: Arc<ReportedWindow>,
    signals: broadcast::Receiver<RemoteSignal>,
    commands: mpsc::Receiver<ControlRequest>,
    status_tx: watch::Sender<DaemonStatus>,
}

impl ControlLoop {
    pub fn new(
        remote: Arc<dyn RemoteTimer>,
        timer_settings: &TimerSettings,
        settings: NotificationSettings,
        services: ShellServices,
        activity: Arc<ActivityMonitor>,
        windows: Arc<ReportedWindow>,
    ) -> (Self, ControlHandle) {
        // Subscribe before the first sync so no push is lost in between.
        let signals = remote.subscribe();
        let mut facade = TimerFacade::new(remote, timer_settings);
        facade.sync();

        let manager = NotificationManager::new(settings, services, facade.snapshot(), Instant::now());
        let (commands_tx, commands) = mpsc::channel(COMMAND_QUEUE);
        let (status_tx, status_rx) = watch::channel(Self::status_of(&facade, &manager));

        let control = Self {
            facade,
            manager,
            activity,
            windows,
            signals,
            commands,
            status_tx,
        };
        let handle = ControlHandle {
            commands: commands_tx,
            status: status_rx,
        };

        (control, handle)
    }

    fn status_of(facade: &TimerFacade, manager: &NotificationManager) -> DaemonStatus {
        DaemonStatus {
            connected: facade.is_connected(),
            timer: facade.snapshot(),
            remaining: facade.remaining(),
            progress: facade.progress(),
            settings: manager.settings(),
            notifications: manager.status(Instant::now()),
        }
    }

    /// Run until a shutdown command arrives or every handle is dropped
    pub async fn run(mut self) {
        info!("Starting control loop");

        let mut signals_open = true;

        loop {
            let deadline = self.manager.next_deadline();

            tokio::select! {
                signal = self.signals.recv(), if signals_open => match signal {
                    Ok(signal) => self.apply_signal(signal),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Missed {} timer signals, resyncing", skipped);
                        let events = self.facade.sync();
                        self.dispatch_events(events);
                    }
                    Err(RecvError::Closed) => {
                        warn!("Timer signal channel closed");
                        signals_open = false;
                        self.apply_signal(RemoteSignal::NameVanished);
                    }
                },
                request = self.commands.recv() => match request {
                    Some(request) => {
                        if !self.handle_request(request) {
                            break;
                        }
                    }
                    None => {
                        info!("Control handles dropped, shutting down");
                        self.manager.shutdown();
                        break;
                    }
                },
                _ = wait_for(deadline) => {
                    self.manager.poll_timers(Instant::now());
                }
            }

            self.publish_status();
        }

        info!("Control loop stopped");
    }

    fn apply_signal(&mut self, signal: RemoteSignal) {
        let events = self.facade.apply(signal);
        self.dispatch_events(events);
    }

    fn dispatch_events(&mut self, events: Vec<TimerEvent>) {
        let snapshot = self.facade.snapshot();
        let now = Instant::now();

        for event in events {
            self.manager.handle_event(event, snapshot, now);
        }
    }

    /// Returns false once the loop should stop
    fn handle_request(&mut self, request: ControlRequest) -> bool {
        let ControlRequest { command, reply } = request;
        let now = Instant::now();
        let mut keep_running = true;

        let handled = match command {
            ControlCommand::Timer(action) => self.run_timer_action(action),
            ControlCommand::SetStateDuration(duration) => {
                self.facade.set_state_duration(duration);
                true
            }
            ControlCommand::Input(event) => {
                self.activity.record_activity(now);
                let consumed = self.manager.handle_input(&event, now);

                // First activity after a break starts the waiting pomodoro.
                if !consumed && self.manager.view() == NotificationView::BreakEnded {
                    info!("Activity detected, starting pomodoro");
                    self.facade.resume();
                    true
                } else {
                    consumed
                }
            }
            ControlCommand::Banner(action) => match action {
                BannerAction::Acknowledge => self.manager.acknowledge_banner(),
                BannerAction::Activate => self.manager.activate_banner(now),
                BannerAction::Dismiss => self.manager.dismiss_banner(),
            },
            ControlCommand::CloseOverlay => self.manager.close_overlay(now),
            ControlCommand::FocusedWindow(info) => {
                debug!("Focused window: {:?}", info);
                self.windows.report(info);
                true
            }
            ControlCommand::Settings(settings) => {
                info!("Notification settings changed: {:?}", settings);
                self.manager.set_settings(settings, now);
                true
            }
            ControlCommand::Shutdown => {
                self.manager.shutdown();
                keep_running = false;
                true
            }
        };

        // Publish before replying so the caller reads its own effect.
        self.publish_status();
        if reply.send(handled).is_err() {
            debug!("Requester went away before the reply");
        }

        keep_running
    }

    fn run_timer_action(&mut self, action: TimerAction) -> bool {
        debug!("Timer action: {}", action.as_str());

        match action {
            TimerAction::Start => self.facade.start(),
            TimerAction::Stop => self.facade.stop(),
            TimerAction::Pause => self.facade.pause(),
            TimerAction::Resume => self.facade.resume(),
            TimerAction::Skip => self.facade.skip(),
            TimerAction::Reset => self.facade.reset(),
            TimerAction::Toggle => self.facade.toggle(),
            TimerAction::SwitchBreak => {
                if !self.facade.is_break() || !self.facade.can_switch_break() {
                    return false;
                }
                self.facade.switch_break();
            }
        }

        true
    }

    fn publish_status(&self) {
        let status = Self::status_of(&self.facade, &self.manager);
        if self.status_tx.send(status).is_err() {
            debug!("No status receivers left");
        }
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
