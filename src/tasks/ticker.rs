//! One-second countdown task

use std::{sync::Arc, time::Duration};
use tokio::{sync::Mutex, time::MissedTickBehavior};
use tracing::info;

use crate::controller::TimerController;

/// Background task that drives the controller's countdown.
///
/// Ticks are idempotent while idle or paused, so the interval runs for the
/// whole lifetime of the runtime instead of being re-armed on every start.
pub async fn ticker_task(controller: Arc<Mutex<TimerController>>, period: Duration) {
    info!("Starting timer ticker task ({}ms period)", period.as_millis());

    let mut interval = tokio::time::interval(period);
    // A throttled or suspended process catches up in one tick, the
    // remaining time is derived from timestamps anyway
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        controller.lock().await.tick().await;
    }
}
