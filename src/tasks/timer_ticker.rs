//! Timer ticker background task

use std::{sync::Arc, time::Duration};

use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::timer::LocalTimer;

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Background task advancing the local timer once per second; every tick
/// pushes fresh properties to the control loop.
pub async fn timer_ticker_task(timer: Arc<LocalTimer>) {
    info!("Starting timer ticker task");

    let mut interval = interval(TICK_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        timer.tick();
    }
}
