//! Main application state management

use std::{
    path::PathBuf,
    sync::{Arc, Mutex as StdMutex},
    time::{Duration, Instant},
};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::info;

use super::TimerSnapshot;
use crate::{
    config::Config,
    controller::{ControllerDeps, RemoteLink, TimerController, TimerSettings},
    error::StoreError,
    services::{
        CommandNotifier, DocumentBackend, HttpBackend, JournalRecorder, LocalSnapshotStore,
        LogNotifier, Notifier, RemoteSnapshotStore, SessionRecorder, StatsCache, WatchPublisher,
    },
    tasks::{remote_sync_channel, RemoteSyncWorker},
    utils::{Clock, SystemClock},
};

/// Remote document store settings for an identified user
pub struct RemoteWiring {
    pub owner_id: String,
    pub backend: Arc<dyn DocumentBackend>,
    pub debounce: Duration,
    pub stale_grace: Duration,
}

/// Collaborators the application state is assembled from
pub struct Wiring {
    pub clock: Arc<dyn Clock>,
    pub state_dir: PathBuf,
    pub user_id: Option<String>,
    pub remote: Option<RemoteWiring>,
    pub recorder: Arc<dyn SessionRecorder>,
    pub notifier: Arc<dyn Notifier>,
    pub settings: TimerSettings,
}

/// Main application state shared by the HTTP handlers and background tasks
pub struct AppState {
    /// The single timer; every transition goes through this lock
    pub controller: Arc<Mutex<TimerController>>,
    pub publisher: Arc<WatchPublisher>,
    pub stats: Arc<StatsCache>,
    pub recorder: Arc<dyn SessionRecorder>,
    pub local: LocalSnapshotStore,
    pub user_id: Option<String>,
    pub remote_enabled: bool,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: StdMutex<Option<(String, DateTime<Utc>)>>,
}

impl AppState {
    /// Assemble the controller and its stores.
    ///
    /// Returns the remote sync worker, if any, which the caller hands to
    /// [`crate::tasks::TimerRuntime::start`].
    pub fn assemble(wiring: Wiring, port: u16, host: String) -> (Self, Option<RemoteSyncWorker>) {
        let Wiring {
            clock,
            state_dir,
            user_id,
            remote,
            recorder,
            notifier,
            settings,
        } = wiring;

        let local = LocalSnapshotStore::new(state_dir, Arc::clone(&clock));
        let publisher = Arc::new(WatchPublisher::new(TimerSnapshot::idle(settings.focus_secs)));
        let stats = Arc::new(StatsCache::new());

        let (remote_link, worker) = match remote {
            Some(remote) => {
                let store = RemoteSnapshotStore::new(remote.backend, Arc::clone(&clock), remote.stale_grace);
                let (sync, worker) = remote_sync_channel(store.clone(), remote.owner_id.clone(), remote.debounce);
                let link = RemoteLink {
                    owner_id: remote.owner_id,
                    store,
                    sync,
                };
                (Some(link), Some(worker))
            }
            None => (None, None),
        };
        let remote_enabled = remote_link.is_some();

        let deps = ControllerDeps {
            clock,
            local: local.clone(),
            remote: remote_link,
            user_id: user_id.clone(),
            recorder: Arc::clone(&recorder),
            notifier,
            stats: Arc::clone(&stats),
            publisher: publisher.clone(),
        };

        let state = Self {
            controller: Arc::new(Mutex::new(TimerController::new(settings, deps))),
            publisher,
            stats,
            recorder,
            local,
            user_id,
            remote_enabled,
            start_time: Instant::now(),
            port,
            host,
            last_action: StdMutex::new(None),
        };
        (state, worker)
    }

    /// Build the production wiring from the parsed configuration
    pub fn from_config(config: &Config) -> Result<(Self, Option<RemoteSyncWorker>), StoreError> {
        let remote = match config.remote_target() {
            Some((owner_id, url)) => {
                let backend = HttpBackend::new(
                    url,
                    config.remote_token.clone(),
                    Duration::from_secs(config.remote_timeout_secs),
                )?;
                info!("Remote sync enabled for {} via {}", owner_id, url);
                Some(RemoteWiring {
                    owner_id: owner_id.to_string(),
                    backend: Arc::new(backend),
                    debounce: config.sync_debounce(),
                    stale_grace: config.stale_grace(),
                })
            }
            None => {
                info!("No user identity or remote store configured, running local-only");
                None
            }
        };

        let notifier: Arc<dyn Notifier> = match &config.notify_command {
            Some(program) => Arc::new(CommandNotifier::new(program.clone())),
            None => Arc::new(LogNotifier),
        };

        let wiring = Wiring {
            clock: Arc::new(SystemClock),
            state_dir: config.state_dir.clone(),
            user_id: config.user_id.clone(),
            remote,
            recorder: Arc::new(JournalRecorder::new(config.state_dir.clone())),
            notifier,
            settings: config.timer_settings(),
        };
        Ok(Self::assemble(wiring, config.port, config.host.clone()))
    }

    /// Remember the last user-triggered action
    pub fn record_action(&self, action: &str) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some((action.to_string(), Utc::now()));
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        match self.last_action.lock().ok().and_then(|a| a.clone()) {
            Some((action, at)) => (Some(action), Some(at)),
            None => (None, None),
        }
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}
