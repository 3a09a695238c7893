//! Ownership of the timer's background tasks

use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{remote_sync::RemoteSyncWorker, ticker::ticker_task};
use crate::{
    lifecycle::{handle_lifecycle_event, LifecycleEvent},
    state::AppState,
};

const TICK_PERIOD: Duration = Duration::from_secs(1);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Running timer: the countdown interval and the remote sync worker.
///
/// Created by [`TimerRuntime::start`] and torn down by [`TimerRuntime::dispose`],
/// so the interval's lifetime is tied to this value rather than the process.
pub struct TimerRuntime {
    state: Arc<AppState>,
    ticker: JoinHandle<()>,
    remote_sync: Option<JoinHandle<()>>,
}

impl TimerRuntime {
    /// Reconcile persisted state, then spawn the ticker and the sync worker
    pub async fn start(state: Arc<AppState>, worker: Option<RemoteSyncWorker>) -> Self {
        Self::start_with_period(state, worker, TICK_PERIOD).await
    }

    pub async fn start_with_period(
        state: Arc<AppState>,
        worker: Option<RemoteSyncWorker>,
        period: Duration,
    ) -> Self {
        // Spawn the worker first so writes queued during restore are applied
        let remote_sync = worker.map(|worker| tokio::spawn(worker.run()));

        state.controller.lock().await.restore().await;

        let ticker = tokio::spawn(ticker_task(Arc::clone(&state.controller), period));
        info!("Timer runtime started");

        Self {
            state,
            ticker,
            remote_sync,
        }
    }

    /// Stop ticking, flush both stores and drain the sync worker
    pub async fn dispose(self) {
        self.ticker.abort();
        if let Err(e) = self.ticker.await {
            if !e.is_cancelled() {
                warn!("Ticker task ended abnormally: {}", e);
            }
        }

        handle_lifecycle_event(&self.state.controller, LifecycleEvent::Shutdown).await;

        if let Some(handle) = self.remote_sync {
            let controller = self.state.controller.lock().await;
            match tokio::time::timeout(CLOSE_TIMEOUT, controller.close_remote()).await {
                Ok(()) => {}
                Err(_) => warn!("Remote sync worker did not drain within {:?}", CLOSE_TIMEOUT),
            }
            drop(controller);
            handle.abort();
        }

        info!("Timer runtime disposed");
    }
}
