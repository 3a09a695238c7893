//! Local snapshot persistence in a key-value directory

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::fs;
use tracing::{debug, warn};

use crate::{
    error::StoreError,
    state::{LocalRecord, TimerSnapshot},
    utils::Clock,
};

const STATE_KEY: &str = "timer_state";
const HEARTBEAT_KEY: &str = "timer_heartbeat";

/// Best-effort local persistence of the timer snapshot.
///
/// Each key is a file inside `dir`. Writes land in a temporary file first and
/// are renamed into place, so a crash mid-write leaves the previous value.
#[derive(Clone)]
pub struct LocalSnapshotStore {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl LocalSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            clock,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist the snapshot and the heartbeat. Failures are logged, never returned.
    pub async fn save(&self, snapshot: &TimerSnapshot) {
        let record = LocalRecord {
            snapshot: snapshot.clone(),
            saved_at_epoch_ms: self.clock.now_ms(),
        };
        if let Err(e) = self.try_save(&record).await {
            warn!("Failed to save local timer snapshot: {}", e);
        }
    }

    async fn try_save(&self, record: &LocalRecord) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).await?;
        let payload = serde_json::to_vec(record)?;
        self.write_key(STATE_KEY, &payload).await?;
        self.write_key(HEARTBEAT_KEY, record.saved_at_epoch_ms.to_string().as_bytes())
            .await?;
        Ok(())
    }

    async fn write_key(&self, key: &str, payload: &[u8]) -> io::Result<()> {
        let target = self.dir.join(key);
        let tmp = self.dir.join(format!(".{}.tmp", key));
        fs::write(&tmp, payload).await?;
        fs::rename(&tmp, &target).await
    }

    /// Read the stored record. Absent or malformed content is `None`.
    pub async fn load(&self) -> Option<LocalRecord> {
        let path = self.dir.join(STATE_KEY);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read local timer snapshot: {}", e);
                return None;
            }
        };

        let record: LocalRecord = match serde_json::from_slice(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!("Ignoring malformed local timer snapshot: {}", e);
                return None;
            }
        };

        if let Err(reason) = record.snapshot.validate() {
            warn!("Ignoring invalid local timer snapshot: {}", reason);
            return None;
        }

        debug!("Loaded local timer snapshot saved at {}", record.saved_at_epoch_ms);
        Some(record)
    }

    /// Last heartbeat timestamp, if any
    pub async fn heartbeat(&self) -> Option<i64> {
        fs::read_to_string(self.dir.join(HEARTBEAT_KEY))
            .await
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
    }

    /// Remove the snapshot and the heartbeat
    pub async fn clear(&self) {
        for key in [STATE_KEY, HEARTBEAT_KEY] {
            match fs::remove_file(self.dir.join(key)).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to clear local key {}: {}", key, e),
            }
        }
        debug!("Cleared local timer snapshot");
    }
}
