//! Debounced remote snapshot sync worker

use std::time::Duration;
use tokio::{
    sync::{mpsc, oneshot},
    time::{sleep_until, Instant},
};
use tracing::{debug, info, warn};

use crate::{services::RemoteSnapshotStore, state::TimerSnapshot};

/// Commands accepted by the sync worker, applied in the order they were sent
#[derive(Debug)]
pub enum SyncCommand {
    /// Write after the debounce window has been quiet
    Debounced(TimerSnapshot),
    /// Write now, dropping any pending debounced write
    Immediate(TimerSnapshot),
    /// Reset the remote document to idle
    Clear { focus_duration_secs: u64 },
    /// Write anything pending, acknowledge and stop
    Close(oneshot::Sender<()>),
}

/// Sending side held by the timer controller
#[derive(Debug, Clone)]
pub struct RemoteSyncHandle {
    tx: mpsc::UnboundedSender<SyncCommand>,
}

impl RemoteSyncHandle {
    fn send(&self, command: SyncCommand) {
        if self.tx.send(command).is_err() {
            debug!("Remote sync worker has stopped, dropping command");
        }
    }

    pub fn schedule(&self, snapshot: TimerSnapshot) {
        self.send(SyncCommand::Debounced(snapshot));
    }

    pub fn flush_now(&self, snapshot: TimerSnapshot) {
        self.send(SyncCommand::Immediate(snapshot));
    }

    pub fn clear(&self, focus_duration_secs: u64) {
        self.send(SyncCommand::Clear {
            focus_duration_secs,
        });
    }

    /// Ask the worker to drain and stop, waiting for its acknowledgement
    pub async fn close(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send(SyncCommand::Close(ack_tx));
        if ack_rx.await.is_err() {
            debug!("Remote sync worker stopped before acknowledging close");
        }
    }
}

/// Receiving side; run it with [`RemoteSyncWorker::run`] on its own task
pub struct RemoteSyncWorker {
    store: RemoteSnapshotStore,
    owner_id: String,
    debounce: Duration,
    rx: mpsc::UnboundedReceiver<SyncCommand>,
}

/// Create a connected handle/worker pair for `owner_id`
pub fn remote_sync_channel(
    store: RemoteSnapshotStore,
    owner_id: impl Into<String>,
    debounce: Duration,
) -> (RemoteSyncHandle, RemoteSyncWorker) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        RemoteSyncHandle { tx },
        RemoteSyncWorker {
            store,
            owner_id: owner_id.into(),
            debounce,
            rx,
        },
    )
}

impl RemoteSyncWorker {
    pub async fn run(mut self) {
        info!(
            "Starting remote sync worker for {} (debounce {}ms)",
            self.owner_id,
            self.debounce.as_millis()
        );

        let mut pending: Option<TimerSnapshot> = None;
        let mut deadline = Instant::now();

        loop {
            tokio::select! {
                command = self.rx.recv() => match command {
                    Some(SyncCommand::Debounced(snapshot)) => {
                        pending = Some(snapshot);
                        deadline = Instant::now() + self.debounce;
                    }
                    Some(SyncCommand::Immediate(snapshot)) => {
                        pending = None;
                        self.write(&snapshot).await;
                    }
                    Some(SyncCommand::Clear { focus_duration_secs }) => {
                        pending = None;
                        if let Err(e) = self.store.clear(&self.owner_id, focus_duration_secs).await {
                            warn!("Failed to clear remote timer state: {}", e);
                        }
                    }
                    Some(SyncCommand::Close(ack)) => {
                        if let Some(snapshot) = pending.take() {
                            self.write(&snapshot).await;
                        }
                        let _ = ack.send(());
                        break;
                    }
                    None => {
                        if let Some(snapshot) = pending.take() {
                            self.write(&snapshot).await;
                        }
                        break;
                    }
                },

                _ = sleep_until(deadline), if pending.is_some() => {
                    if let Some(snapshot) = pending.take() {
                        self.write(&snapshot).await;
                    }
                }
            }
        }

        info!("Remote sync worker for {} stopped", self.owner_id);
    }

    async fn write(&self, snapshot: &TimerSnapshot) {
        if let Err(e) = self.store.sync(&self.owner_id, snapshot).await {
            // The next transition or lifecycle flush retries with fresher state
            warn!("Failed to sync timer state to remote store: {}", e);
        }
    }
}
