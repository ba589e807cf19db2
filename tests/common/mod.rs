//! Shared daemon wiring for the integration tests

#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;

use pomodoro_notifier::{
    config::{NotificationSettings, TimerSettings},
    services::{
        ActivityMonitor, LoggingBanners, LoggingOverlay, LoggingPresence, ReportedWindow,
        ShellServices,
    },
    state::AppState,
    tasks::{timer_ticker_task, ControlLoop},
    timer::LocalTimer,
};

pub struct Daemon {
    pub state: Arc<AppState>,
    pub timer: Arc<LocalTimer>,
    pub banners: Arc<LoggingBanners>,
    pub overlay: Arc<LoggingOverlay>,
    pub control: JoinHandle<()>,
    pub ticker: Option<JoinHandle<()>>,
}

impl Daemon {
    pub fn spawn(with_ticker: bool) -> Self {
        Self::spawn_with(
            TimerSettings::default(),
            NotificationSettings::default(),
            with_ticker,
        )
    }

    pub fn spawn_with(
        timer_settings: TimerSettings,
        settings: NotificationSettings,
        with_ticker: bool,
    ) -> Self {
        let timer = Arc::new(LocalTimer::new(timer_settings.clone()));
        let activity = Arc::new(ActivityMonitor::new());
        let windows = Arc::new(ReportedWindow::new());
        let banners = Arc::new(LoggingBanners::new());
        let overlay = Arc::new(LoggingOverlay::new());
        let services = ShellServices {
            banners: banners.clone(),
            overlays: overlay.clone(),
            presence: Arc::new(LoggingPresence::new()),
            idle: activity.clone(),
            windows: windows.clone(),
        };

        let (control, handle) = ControlLoop::new(
            timer.clone(),
            &timer_settings,
            settings,
            services,
            activity,
            windows,
        );
        let control = tokio::spawn(control.run());
        let ticker = with_ticker.then(|| tokio::spawn(timer_ticker_task(timer.clone())));
        let state = Arc::new(AppState::new(8080, "127.0.0.1".to_string(), handle));

        Self {
            state,
            timer,
            banners,
            overlay,
            control,
            ticker,
        }
    }

    pub fn banner_titles(&self) -> Vec<String> {
        self.banners
            .visible()
            .into_iter()
            .map(|banner| banner.title)
            .collect()
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        if let Some(ticker) = &self.ticker {
            ticker.abort();
        }
        self.control.abort();
    }
}

/// Let spawned commands and the signals they trigger settle
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}
