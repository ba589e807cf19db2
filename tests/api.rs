mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{settle, Daemon};
use pomodoro_notifier::{create_router, state::ControlCommand};

fn router(daemon: &Daemon) -> Router {
    create_router(daemon.state.clone())
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, value)
}

#[tokio::test(start_paused = true)]
async fn health_reports_version() {
    let daemon = Daemon::spawn(false);
    let app = router(&daemon);

    let (status, body) = send(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test(start_paused = true)]
async fn unknown_actions_are_rejected() {
    let daemon = Daemon::spawn(false);
    let app = router(&daemon);

    let (status, _) = send(&app, Method::POST, "/timer/explode", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::POST, "/banner/shake", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(start_paused = true)]
async fn start_runs_a_pomodoro() {
    let daemon = Daemon::spawn(false);
    let app = router(&daemon);

    let (status, body) = send(&app, Method::POST, "/timer/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    settle().await;

    let (status, body) = send(&app, Method::GET, "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"]["connected"], true);
    assert_eq!(body["state"]["timer"]["state"], "pomodoro");
    assert_eq!(body["state"]["notifications"]["view"], "pomodoro");
    assert_eq!(body["state"]["notifications"]["overlay"], "closed");
    assert_eq!(body["last_action"], "start");
}

#[tokio::test(start_paused = true)]
async fn switch_break_outside_a_break_is_ignored() {
    let daemon = Daemon::spawn(false);
    let app = router(&daemon);

    let (status, body) = send(&app, Method::POST, "/timer/switch-break", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ignored");
}

#[tokio::test(start_paused = true)]
async fn duration_must_be_positive() {
    let daemon = Daemon::spawn(false);
    let app = router(&daemon);

    let (status, _) = send(
        &app,
        Method::POST,
        "/timer/duration",
        Some(json!({ "seconds": -5.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    send(&app, Method::POST, "/timer/start", None).await;
    settle().await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/timer/duration",
        Some(json!({ "seconds": 600.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    settle().await;

    let (_, body) = send(&app, Method::GET, "/status", None).await;
    assert_eq!(body["state"]["timer"]["state_duration"], 600.0);
}

#[tokio::test(start_paused = true)]
async fn banner_commands_without_a_banner_are_ignored() {
    let daemon = Daemon::spawn(false);
    let app = router(&daemon);

    let (status, body) = send(&app, Method::POST, "/banner/dismiss", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ignored");
}

#[tokio::test(start_paused = true)]
async fn settings_are_replaced() {
    let daemon = Daemon::spawn(false);
    let app = router(&daemon);

    let settings = json!({
        "screen_notifications": false,
        "hide_system_notifications": true,
        "dismiss_gesture": false,
        "reminders": false,
    });
    let (status, body) = send(&app, Method::POST, "/settings", Some(settings.clone())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"]["settings"], settings);
}

#[tokio::test(start_paused = true)]
async fn commands_fail_after_shutdown() {
    let daemon = Daemon::spawn(false);
    let app = router(&daemon);

    let handled = daemon
        .state
        .execute("shutdown", ControlCommand::Shutdown)
        .await
        .unwrap();
    assert!(handled);
    settle().await;

    let (status, _) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = send(&app, Method::POST, "/timer/start", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test(start_paused = true)]
async fn huge_duration_keeps_the_daemon_running() {
    let daemon = Daemon::spawn(false);
    let app = router(&daemon);

    send(&app, Method::POST, "/timer/start", None).await;
    settle().await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/timer/duration",
        Some(json!({ "seconds": 1e20 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    settle().await;

    assert!(!daemon.control.is_finished());

    let (status, body) = send(&app, Method::POST, "/timer/pause", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    settle().await;
    let (status, body) = send(&app, Method::GET, "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"]["timer"]["state_duration"], 1e20);
    assert_eq!(body["state"]["timer"]["is_paused"], true);
    assert!(body["state"]["notifications"]["announcement_in"].is_null());
}
