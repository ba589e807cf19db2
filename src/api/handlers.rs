//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::{info, warn};

use super::responses::{ApiResponse, DurationRequest, HealthResponse, StatusResponse};
use crate::{
    config::NotificationSettings,
    overlay::InputEvent,
    services::FocusedWindowInfo,
    state::{AppState, BannerAction, ControlCommand, ControlError, TimerAction},
};

type ApiResult = Result<Json<ApiResponse>, StatusCode>;

/// Send a command to the control loop and wrap the outcome
async fn run_command(
    state: &AppState,
    action: &str,
    command: ControlCommand,
    message: String,
) -> ApiResult {
    match state.execute(action, command).await {
        Ok(handled) => {
            info!("{} endpoint called (handled={})", action, handled);
            Ok(Json(ApiResponse::from_outcome(handled, message, state.status())))
        }
        Err(ControlError::Unavailable) => {
            warn!("Cannot run {}: control loop is not running", action);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// Handle POST /timer/:action
pub async fn timer_handler(
    State(state): State<Arc<AppState>>,
    Path(action): Path<String>,
) -> ApiResult {
    let action: TimerAction = action.parse().map_err(|e| {
        warn!("{}", e);
        StatusCode::BAD_REQUEST
    })?;

    run_command(
        &state,
        action.as_str(),
        ControlCommand::Timer(action),
        format!("Timer {} requested", action.as_str()),
    )
    .await
}

/// Handle POST /timer/duration - Change the current phase duration
pub async fn duration_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DurationRequest>,
) -> ApiResult {
    if !request.seconds.is_finite() || request.seconds <= 0.0 {
        warn!("Rejected phase duration: {}", request.seconds);
        return Err(StatusCode::BAD_REQUEST);
    }

    run_command(
        &state,
        "duration",
        ControlCommand::SetStateDuration(request.seconds),
        format!("Phase duration set to {}s", request.seconds),
    )
    .await
}

/// Handle POST /input - Deliver a user input event
pub async fn input_handler(
    State(state): State<Arc<AppState>>,
    Json(event): Json<InputEvent>,
) -> ApiResult {
    run_command(
        &state,
        "input",
        ControlCommand::Input(event),
        format!("Input {:?} delivered", event.kind),
    )
    .await
}

/// Handle POST /banner/:action
pub async fn banner_handler(
    State(state): State<Arc<AppState>>,
    Path(action): Path<String>,
) -> ApiResult {
    let parsed: BannerAction = action.parse().map_err(|e| {
        warn!("{}", e);
        StatusCode::BAD_REQUEST
    })?;

    run_command(
        &state,
        "banner",
        ControlCommand::Banner(parsed),
        format!("Banner {} requested", action),
    )
    .await
}

/// Handle POST /overlay/close
pub async fn overlay_close_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    run_command(
        &state,
        "overlay-close",
        ControlCommand::CloseOverlay,
        "Overlay close requested".to_string(),
    )
    .await
}

/// Handle POST /window - Report the focused window
pub async fn window_handler(
    State(state): State<Arc<AppState>>,
    Json(info): Json<FocusedWindowInfo>,
) -> ApiResult {
    run_command(
        &state,
        "window",
        ControlCommand::FocusedWindow(info),
        "Focused window updated".to_string(),
    )
    .await
}

/// Handle POST /settings - Replace the notification settings
pub async fn settings_handler(
    State(state): State<Arc<AppState>>,
    Json(settings): Json<NotificationSettings>,
) -> ApiResult {
    run_command(
        &state,
        "settings",
        ControlCommand::Settings(settings),
        "Notification settings updated".to_string(),
    )
    .await
}

/// Handle GET /status - Timer and notification status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let (last_action, last_action_time) = state.get_last_action();

    Json(StatusResponse {
        state: state.status(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    })
}

/// Handle GET /health - Health check
pub async fn health_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, StatusCode> {
    if state.is_running() {
        Ok(Json(HealthResponse::ok()))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}
