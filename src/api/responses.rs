//! API response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::DaemonStatus;

/// API response structure for command endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    /// "ok" when the command had an effect, "ignored" otherwise
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub state: DaemonStatus,
}

impl ApiResponse {
    pub fn new(status: String, message: String, state: DaemonStatus) -> Self {
        Self {
            status,
            message,
            timestamp: Utc::now(),
            state,
        }
    }

    pub fn ok(message: String, state: DaemonStatus) -> Self {
        Self::new("ok".to_string(), message, state)
    }

    pub fn ignored(message: String, state: DaemonStatus) -> Self {
        Self::new("ignored".to_string(), message, state)
    }

    /// Pick `ok` or `ignored` from a command outcome
    pub fn from_outcome(handled: bool, message: String, state: DaemonStatus) -> Self {
        if handled {
            Self::ok(message, state)
        } else {
            Self::ignored(message, state)
        }
    }
}

/// Status response with server metadata
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub state: DaemonStatus,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Body of `POST /timer/duration`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DurationRequest {
    pub seconds: f64,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
