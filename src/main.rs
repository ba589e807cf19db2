//! Pomodoro Notifier - pomodoro timer daemon with screen notifications
//!
//! This is the main entry point for the pomodoro-notifier application.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use pomodoro_notifier::{
    api::create_router,
    config::Config,
    services::{
        ActivityMonitor, LoggingBanners, LoggingOverlay, LoggingPresence, ReportedWindow,
        ShellServices,
    },
    state::{AppState, ControlCommand},
    tasks::{timer_ticker_task, ControlLoop},
    timer::LocalTimer,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "pomodoro_notifier={},tower_http=info",
            config.log_level()
        ))
        .init();

    let timer_settings = config.timer_settings();
    let notification_settings = config.notification_settings();

    info!("Starting pomodoro-notifier v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, pomodoro={}s, short break={}s, long break={}s",
        config.host,
        config.port,
        timer_settings.pomodoro_duration,
        timer_settings.short_break_duration,
        timer_settings.long_break_duration
    );

    // Timer service and the host-side collaborators
    let timer = Arc::new(LocalTimer::new(timer_settings.clone()));
    let activity = Arc::new(ActivityMonitor::new());
    let windows = Arc::new(ReportedWindow::new());
    let services = ShellServices {
        banners: Arc::new(LoggingBanners::new()),
        overlays: Arc::new(LoggingOverlay::new()),
        presence: Arc::new(LoggingPresence::new()),
        idle: activity.clone(),
        windows: windows.clone(),
    };

    let (control, handle) = ControlLoop::new(
        timer.clone(),
        &timer_settings,
        notification_settings,
        services,
        activity,
        windows,
    );
    let control_task = tokio::spawn(control.run());

    // Start the ticker background task
    let ticker = tokio::spawn(timer_ticker_task(Arc::clone(&timer)));

    let state = Arc::new(AppState::new(config.port, config.host.clone(), handle));
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /timer/:action   - start, stop, pause, resume, skip, reset, toggle, switch-break");
    info!("  POST /timer/duration  - Change the current phase duration");
    info!("  POST /input           - Deliver a user input event");
    info!("  POST /banner/:action  - acknowledge, activate, dismiss");
    info!("  POST /overlay/close   - Close the screen overlay");
    info!("  POST /window          - Report the focused window");
    info!("  POST /settings        - Replace notification settings");
    info!("  GET  /status          - Timer and notification status");
    info!("  GET  /health          - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    // Notifications go first, then the timer stops ticking.
    if let Err(e) = state.execute("shutdown", ControlCommand::Shutdown).await {
        tracing::warn!("Notifications were not shut down cleanly: {}", e);
    }
    if let Err(e) = control_task.await {
        tracing::warn!("Control loop ended abnormally: {}", e);
    }
    ticker.abort();

    info!("Server shutdown complete");
    Ok(())
}
