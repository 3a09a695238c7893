//! Remote snapshot persistence in a document store

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::{
    error::StoreError,
    state::{RemoteRecord, TimerSnapshot},
    utils::Clock,
};

/// A document database keyed by owner id with merge-upsert writes
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Fetch the owner's document, `None` if it does not exist
    async fn fetch(&self, owner_id: &str) -> Result<Option<Value>, StoreError>;

    /// Merge `fields` into the owner's document, creating it if needed.
    /// Fields not present in `fields` are left untouched.
    async fn merge(&self, owner_id: &str, fields: Map<String, Value>) -> Result<(), StoreError>;
}

/// In-process document store
#[derive(Debug, Default)]
pub struct MemoryBackend {
    documents: Mutex<HashMap<String, Map<String, Value>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a whole document, bypassing merge semantics
    pub fn put_raw(&self, owner_id: &str, document: Value) {
        if let (Ok(mut documents), Value::Object(map)) = (self.documents.lock(), document) {
            documents.insert(owner_id.to_string(), map);
        }
    }

    pub fn get_raw(&self, owner_id: &str) -> Option<Value> {
        self.documents
            .lock()
            .ok()
            .and_then(|documents| documents.get(owner_id).cloned())
            .map(Value::Object)
    }
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    async fn fetch(&self, owner_id: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.get_raw(owner_id))
    }

    async fn merge(&self, owner_id: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        let mut documents = self
            .documents
            .lock()
            .map_err(|_| StoreError::Poisoned("memory documents"))?;
        let document = documents.entry(owner_id.to_string()).or_default();
        for (key, value) in fields {
            document.insert(key, value);
        }
        Ok(())
    }
}

/// REST document store: `GET` and `PATCH` on `{base_url}/timers/{owner_id}`
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn document_url(&self, owner_id: &str) -> String {
        format!("{}/timers/{}", self.base_url, owner_id)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl DocumentBackend for HttpBackend {
    async fn fetch(&self, owner_id: &str) -> Result<Option<Value>, StoreError> {
        let response = self
            .authorize(self.client.get(self.document_url(owner_id)))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json::<Value>().await?)),
            status => Err(StoreError::Status {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn merge(&self, owner_id: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        let response = self
            .authorize(self.client.patch(self.document_url(owner_id)))
            .json(&fields)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

/// Snapshot persistence on top of a [`DocumentBackend`].
///
/// Writes are last-write-wins, stamped with `updatedAtEpochMs`. Loads apply the
/// stale-running guard.
#[derive(Clone)]
pub struct RemoteSnapshotStore {
    backend: Arc<dyn DocumentBackend>,
    clock: Arc<dyn Clock>,
    stale_grace: Duration,
}

impl RemoteSnapshotStore {
    pub fn new(backend: Arc<dyn DocumentBackend>, clock: Arc<dyn Clock>, stale_grace: Duration) -> Self {
        Self {
            backend,
            clock,
            stale_grace,
        }
    }

    /// Upsert the snapshot under `owner_id`
    pub async fn sync(&self, owner_id: &str, snapshot: &TimerSnapshot) -> Result<(), StoreError> {
        let mut fields = match serde_json::to_value(snapshot)? {
            Value::Object(map) => map,
            _ => return Err(StoreError::NotAnObject(owner_id.to_string())),
        };
        fields.insert("ownerId".to_string(), Value::from(owner_id));
        fields.insert("updatedAtEpochMs".to_string(), Value::from(self.clock.now_ms()));

        self.backend.merge(owner_id, fields).await?;
        debug!("Synced remote timer snapshot for {}", owner_id);
        Ok(())
    }

    /// Fetch the owner's snapshot, demoting abandoned running state to idle
    pub async fn load(&self, owner_id: &str) -> Result<Option<RemoteRecord>, StoreError> {
        let Some(document) = self.backend.fetch(owner_id).await? else {
            return Ok(None);
        };

        let record: RemoteRecord = match serde_json::from_value(document) {
            Ok(record) => record,
            Err(e) => {
                warn!("Ignoring malformed remote timer document for {}: {}", owner_id, e);
                return Ok(None);
            }
        };
        if let Err(reason) = record.snapshot.validate() {
            warn!("Ignoring invalid remote timer document for {}: {}", owner_id, reason);
            return Ok(None);
        }

        Ok(Some(self.demote_if_stale(record)))
    }

    fn demote_if_stale(&self, record: RemoteRecord) -> RemoteRecord {
        if !record.snapshot.is_running {
            return record;
        }
        let Some(deadline) = record.snapshot.deadline_epoch_ms() else {
            return record;
        };

        let now = self.clock.now_ms();
        let grace_ms = self.stale_grace.as_millis() as i64;
        let overdue_ms = now.saturating_sub(deadline);
        if overdue_ms > grace_ms {
            info!(
                "Remote timer for {} passed its deadline {}s ago, treating as idle",
                record.owner_id,
                overdue_ms / 1000
            );
            RemoteRecord {
                snapshot: record.snapshot.into_idle(),
                ..record
            }
        } else {
            record
        }
    }

    /// Reset the owner's document to idle, keeping `tag` and `taskName`
    pub async fn clear(&self, owner_id: &str, focus_duration_secs: u64) -> Result<(), StoreError> {
        let mut fields = match serde_json::to_value(TimerSnapshot::idle(focus_duration_secs))? {
            Value::Object(map) => map,
            _ => return Err(StoreError::NotAnObject(owner_id.to_string())),
        };
        fields.remove("tag");
        fields.remove("taskName");
        fields.remove("completedFocusCount");
        fields.insert("ownerId".to_string(), Value::from(owner_id));
        fields.insert("updatedAtEpochMs".to_string(), Value::from(self.clock.now_ms()));

        self.backend.merge(owner_id, fields).await?;
        debug!("Cleared remote timer snapshot for {}", owner_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ManualClock;
    use serde_json::json;

    const T0: i64 = 1_700_000_000_000;

    fn setup() -> (RemoteSnapshotStore, Arc<MemoryBackend>, ManualClock) {
        let backend = Arc::new(MemoryBackend::new());
        let clock = ManualClock::new(T0);
        let store = RemoteSnapshotStore::new(
            backend.clone(),
            Arc::new(clock.clone()),
            Duration::from_secs(60),
        );
        (store, backend, clock)
    }

    fn running(started: i64, total: u64) -> TimerSnapshot {
        TimerSnapshot {
            is_running: true,
            started_at_epoch_ms: Some(started),
            session_id: "remote-session".to_string(),
            tag: "deep work".to_string(),
            ..TimerSnapshot::idle(total)
        }
    }

    #[tokio::test]
    async fn test_sync_then_load_returns_stamped_record() {
        let (store, _, clock) = setup();
        store.sync("user-1", &running(T0, 1500)).await.unwrap();
        clock.advance_secs(30);

        let record = store.load("user-1").await.unwrap().expect("document exists");
        assert_eq!(record.owner_id, "user-1");
        assert_eq!(record.updated_at_epoch_ms, T0);
        assert!(record.snapshot.is_running);
    }

    #[tokio::test]
    async fn test_load_missing_owner_is_none() {
        let (store, _, _) = setup();
        assert!(store.load("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_merge_keeps_unspecified_fields() {
        let (store, backend, _) = setup();
        backend.put_raw("user-1", json!({ "theme": "dark" }));
        store.sync("user-1", &running(T0, 1500)).await.unwrap();

        let raw = backend.get_raw("user-1").unwrap();
        assert_eq!(raw["theme"], "dark");
        assert_eq!(raw["isRunning"], true);
    }

    #[tokio::test]
    async fn test_stale_running_document_loads_as_idle() {
        let (store, _, clock) = setup();
        store.sync("user-1", &running(T0, 1500)).await.unwrap();
        // deadline at T0+1500s, 61s past it
        clock.set_ms(T0 + 1_561_000);

        let record = store.load("user-1").await.unwrap().unwrap();
        assert!(!record.snapshot.is_running);
        assert_eq!(record.snapshot.started_at_epoch_ms, None);
        assert_eq!(record.snapshot.tag, "deep work");
        assert_eq!(record.snapshot.time_remaining_seconds, 1500);
    }

    #[tokio::test]
    async fn test_recently_expired_document_stays_running() {
        let (store, _, clock) = setup();
        store.sync("user-1", &running(T0, 1500)).await.unwrap();
        clock.set_ms(T0 + 1_530_000);

        let record = store.load("user-1").await.unwrap().unwrap();
        assert!(record.snapshot.is_running);
    }

    #[tokio::test]
    async fn test_clear_resets_to_idle_and_preserves_labels() {
        let (store, backend, _) = setup();
        let snapshot = TimerSnapshot {
            task_name: "report".to_string(),
            ..running(T0, 1500)
        };
        store.sync("user-1", &snapshot).await.unwrap();
        store.clear("user-1", 1500).await.unwrap();

        let raw = backend.get_raw("user-1").unwrap();
        assert_eq!(raw["isRunning"], false);
        assert!(raw["startedAtEpochMs"].is_null());
        assert_eq!(raw["tag"], "deep work");
        assert_eq!(raw["taskName"], "report");
    }

    #[tokio::test]
    async fn test_malformed_document_is_absent() {
        let (store, backend, _) = setup();
        backend.put_raw("user-1", json!({ "isRunning": "yes" }));
        assert!(store.load("user-1").await.unwrap().is_none());
    }
}
