//! Configuration and CLI argument handling

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "pomodoro-notifier")]
#[command(about = "Pomodoro timer daemon with screen notifications")]
#[command(version)]
pub struct Config {
    /// Port to bind the control API to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Pomodoro duration in minutes
    #[arg(long, value_parser = parse_minutes, default_value = "25")]
    pub pomodoro_duration: f64,

    /// Short break duration in minutes
    #[arg(long, value_parser = parse_minutes, default_value = "5")]
    pub short_break_duration: f64,

    /// Long break duration in minutes
    #[arg(long, value_parser = parse_minutes, default_value = "15")]
    pub long_break_duration: f64,

    /// Number of completed pomodoros before a long break
    #[arg(long, default_value = "4")]
    pub long_break_interval: u32,

    /// Never cover the screen during breaks, use banners only
    #[arg(long)]
    pub no_screen_notifications: bool,

    /// Mark the session busy during pomodoros to hide other notifications
    #[arg(long)]
    pub hide_system_notifications: bool,

    /// Close the screen overlay only through explicit actions
    #[arg(long)]
    pub no_dismiss_gesture: bool,

    /// Do not remind about skipped breaks
    #[arg(long)]
    pub no_reminders: bool,

    /// Start the next pomodoro right away instead of waiting for activity
    #[arg(long)]
    pub no_wait_for_activity: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn timer_settings(&self) -> TimerSettings {
        TimerSettings {
            pomodoro_duration: self.pomodoro_duration * 60.0,
            short_break_duration: self.short_break_duration * 60.0,
            long_break_duration: self.long_break_duration * 60.0,
            long_break_interval: self.long_break_interval.max(1),
            wait_for_activity: !self.no_wait_for_activity,
        }
    }

    pub fn notification_settings(&self) -> NotificationSettings {
        NotificationSettings {
            screen_notifications: !self.no_screen_notifications,
            hide_system_notifications: self.hide_system_notifications,
            dismiss_gesture: !self.no_dismiss_gesture,
            reminders: !self.no_reminders,
        }
    }
}

/// Phase length in minutes; must be a positive, finite number
fn parse_minutes(value: &str) -> Result<f64, String> {
    let minutes: f64 = value
        .parse()
        .map_err(|e| format!("`{}` is not a number: {}", value, e))?;

    if !minutes.is_finite() || minutes <= 0.0 {
        return Err(format!("`{}` is not a positive duration", value));
    }

    Ok(minutes)
}

/// Phase durations (seconds) for the local timer service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSettings {
    pub pomodoro_duration: f64,
    pub short_break_duration: f64,
    pub long_break_duration: f64,
    pub long_break_interval: u32,
    pub wait_for_activity: bool,
}

impl TimerSettings {
    /// Replace unusable durations with the defaults
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let pick = |name: &str, value: f64, fallback: f64| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                warn!("Invalid {} duration {}s, using {}s", name, value, fallback);
                fallback
            }
        };

        Self {
            pomodoro_duration: pick("pomodoro", self.pomodoro_duration, defaults.pomodoro_duration),
            short_break_duration: pick(
                "short break",
                self.short_break_duration,
                defaults.short_break_duration,
            ),
            long_break_duration: pick(
                "long break",
                self.long_break_duration,
                defaults.long_break_duration,
            ),
            long_break_interval: self.long_break_interval.max(1),
            ..self
        }
    }
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            pomodoro_duration: 1500.0,
            short_break_duration: 300.0,
            long_break_duration: 900.0,
            long_break_interval: 4,
            wait_for_activity: true,
        }
    }
}

/// Switches read by the notification core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Open the full-screen overlay when a break starts
    pub screen_notifications: bool,
    /// Set the session busy during pomodoros
    pub hide_system_notifications: bool,
    /// Require the acknowledge/dismiss gestures on the overlay
    pub dismiss_gesture: bool,
    /// Remind about breaks the user keeps ignoring
    pub reminders: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            screen_notifications: true,
            hide_system_notifications: false,
            dismiss_gesture: true,
            reminders: true,
        }
    }
}
