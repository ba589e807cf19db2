//! Messages exchanged between the HTTP layer and the control loop

use std::str::FromStr;

use serde::Serialize;
use tokio::sync::oneshot;

use super::TimerSnapshot;
use crate::{
    config::NotificationSettings,
    notifications::NotificationStatus,
    overlay::InputEvent,
    services::FocusedWindowInfo,
};

/// Timer operations exposed under `/timer/:action`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    Start,
    Stop,
    Pause,
    Resume,
    Skip,
    Reset,
    Toggle,
    SwitchBreak,
}

impl TimerAction {
    pub fn as_str(self) -> &'static str {
        match self {
            TimerAction::Start => "start",
            TimerAction::Stop => "stop",
            TimerAction::Pause => "pause",
            TimerAction::Resume => "resume",
            TimerAction::Skip => "skip",
            TimerAction::Reset => "reset",
            TimerAction::Toggle => "toggle",
            TimerAction::SwitchBreak => "switch-break",
        }
    }
}

impl FromStr for TimerAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(TimerAction::Start),
            "stop" => Ok(TimerAction::Stop),
            "pause" => Ok(TimerAction::Pause),
            "resume" => Ok(TimerAction::Resume),
            "skip" => Ok(TimerAction::Skip),
            "reset" => Ok(TimerAction::Reset),
            "toggle" => Ok(TimerAction::Toggle),
            "switch-break" => Ok(TimerAction::SwitchBreak),
            other => Err(format!("Unknown timer action: {}", other)),
        }
    }
}

/// Banner interactions exposed under `/banner/:action`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerAction {
    Acknowledge,
    Activate,
    Dismiss,
}

impl FromStr for BannerAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "acknowledge" => Ok(BannerAction::Acknowledge),
            "activate" => Ok(BannerAction::Activate),
            "dismiss" => Ok(BannerAction::Dismiss),
            other => Err(format!("Unknown banner action: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ControlCommand {
    Timer(TimerAction),
    SetStateDuration(f64),
    Input(InputEvent),
    Banner(BannerAction),
    CloseOverlay,
    FocusedWindow(FocusedWindowInfo),
    Settings(NotificationSettings),
    Shutdown,
}

/// A command plus the channel its outcome goes back on.
///
/// The reply is `true` when the command had an effect.
#[derive(Debug)]
pub struct ControlRequest {
    pub command: ControlCommand,
    pub reply: oneshot::Sender<bool>,
}

/// Everything `/status` reports, published by the control loop
#[derive(Debug, Clone, Serialize)]
pub struct DaemonStatus {
    pub connected: bool,
    pub timer: TimerSnapshot,
    pub remaining: f64,
    pub progress: f64,
    pub settings: NotificationSettings,
    pub notifications: NotificationStatus,
}
