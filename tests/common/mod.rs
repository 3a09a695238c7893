#![allow(dead_code)]

use std::{path::Path, sync::Arc, time::Duration};

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use focus_keeper::{
    api::create_router,
    services::{JournalRecorder, LogNotifier, MemoryBackend},
    state::{AppState, RemoteWiring, Wiring},
    tasks::TimerRuntime,
    utils::ManualClock,
    TimerSettings,
};
use serde_json::Value;
use tower::ServiceExt;

pub const T0: i64 = 1_700_000_000_000;
pub const OWNER: &str = "alice";

/// Start a runtime over `dir`, mirrored to `backend` when given
pub async fn boot(
    dir: &Path,
    clock: &ManualClock,
    backend: Option<Arc<MemoryBackend>>,
) -> (Arc<AppState>, TimerRuntime) {
    let remote = backend.map(|backend| RemoteWiring {
        owner_id: OWNER.to_string(),
        backend,
        debounce: Duration::from_millis(50),
        stale_grace: Duration::from_secs(60),
    });
    let wiring = Wiring {
        clock: Arc::new(clock.clone()),
        state_dir: dir.to_path_buf(),
        user_id: remote.as_ref().map(|r| r.owner_id.clone()),
        remote,
        recorder: Arc::new(JournalRecorder::new(dir)),
        notifier: Arc::new(LogNotifier),
        settings: TimerSettings::default(),
    };

    let (state, worker) = AppState::assemble(wiring, 0, "127.0.0.1".to_string());
    let state = Arc::new(state);
    // Long period so the test drives time through the manual clock only
    let runtime =
        TimerRuntime::start_with_period(Arc::clone(&state), worker, Duration::from_secs(3600)).await;
    (state, runtime)
}

/// Send one request through the router and decode the JSON body, if any
pub async fn call(
    state: &Arc<AppState>,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = create_router(Arc::clone(state))
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
