mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use focus_keeper::{services::MemoryBackend, utils::ManualClock};
use serde_json::json;

use common::{boot, call, OWNER, T0};

#[tokio::test]
async fn test_running_timer_follows_user_to_another_device() {
    let backend = Arc::new(MemoryBackend::new());
    let clock = ManualClock::new(T0);

    let laptop = tempfile::tempdir().unwrap();
    let (state, runtime) = boot(laptop.path(), &clock, Some(backend.clone())).await;
    call(
        &state,
        "POST",
        "/timer/start",
        Some(json!({ "durationMinutes": 50, "tag": "deep" })),
    )
    .await;
    clock.advance_secs(600);
    runtime.dispose().await;

    let document = backend.get_raw(OWNER).unwrap();
    assert_eq!(document["isRunning"], true);
    assert_eq!(document["ownerId"], OWNER);
    assert_eq!(document["updatedAtEpochMs"], T0 + 600_000);

    // A second device with no local state picks the session up
    clock.advance_secs(60);
    let desktop = tempfile::tempdir().unwrap();
    let (state, runtime) = boot(desktop.path(), &clock, Some(backend.clone())).await;

    let (status, body) = call(&state, "GET", "/timer", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "running-focus");
    assert_eq!(body["timer"]["timeRemainingSeconds"], 3000 - 660);
    assert_eq!(body["timer"]["tag"], "deep");

    runtime.dispose().await;
}

#[tokio::test]
async fn test_session_completed_while_closed_is_credited_once() {
    let backend = Arc::new(MemoryBackend::new());
    let clock = ManualClock::new(T0);
    let dir = tempfile::tempdir().unwrap();

    let (state, runtime) = boot(dir.path(), &clock, Some(backend.clone())).await;
    call(
        &state,
        "POST",
        "/timer/start",
        Some(json!({ "durationMinutes": 25 })),
    )
    .await;
    clock.advance_secs(300);
    runtime.dispose().await;

    // Reopen long after the deadline
    clock.advance_secs(3600);
    let (state, runtime) = boot(dir.path(), &clock, Some(backend.clone())).await;

    let (_, body) = call(&state, "GET", "/timer", None).await;
    assert_eq!(body["phase"], "break-offered");
    assert_eq!(body["timer"]["isRunning"], false);
    assert_eq!(body["timer"]["completedFocusCount"], 1);

    let (_, stats) = call(&state, "GET", "/stats", None).await;
    assert_eq!(stats["totalSessions"], 1);
    assert_eq!(stats["totalMinutes"], 25);
    runtime.dispose().await;

    assert_eq!(backend.get_raw(OWNER).unwrap()["isRunning"], false);

    // Reopening again must not credit the same session a second time
    clock.advance_secs(60);
    let (state, runtime) = boot(dir.path(), &clock, Some(backend.clone())).await;
    let (_, stats) = call(&state, "GET", "/stats", None).await;
    assert_eq!(stats["totalSessions"], 1);
    runtime.dispose().await;
}

#[tokio::test]
async fn test_paused_timer_survives_restart() {
    let clock = ManualClock::new(T0);
    let dir = tempfile::tempdir().unwrap();

    let (state, runtime) = boot(dir.path(), &clock, None).await;
    call(&state, "POST", "/timer/start", None).await;
    clock.advance_secs(200);
    call(&state, "POST", "/timer/pause", None).await;
    runtime.dispose().await;

    clock.advance_secs(7200);
    let (state, runtime) = boot(dir.path(), &clock, None).await;
    let (_, body) = call(&state, "GET", "/timer", None).await;
    assert_eq!(body["phase"], "paused");
    assert_eq!(body["timer"]["timeRemainingSeconds"], 1300);

    runtime.dispose().await;
}
