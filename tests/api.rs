mod common;

use axum::http::StatusCode;
use focus_keeper::utils::ManualClock;
use serde_json::json;

use common::{boot, call, T0};

#[tokio::test]
async fn test_health_and_idle_timer() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new(T0);
    let (state, runtime) = boot(dir.path(), &clock, None).await;

    let (status, body) = call(&state, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = call(&state, "GET", "/timer", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "idle");
    assert_eq!(body["timer"]["isRunning"], false);
    assert_eq!(body["timer"]["timeRemainingSeconds"], 1500);

    runtime.dispose().await;
}

#[tokio::test]
async fn test_focus_lifecycle_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new(T0);
    let (state, runtime) = boot(dir.path(), &clock, None).await;

    let (status, body) = call(
        &state,
        "POST",
        "/timer/start",
        Some(json!({ "durationMinutes": 10, "tag": "writing" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"]["phase"], "running-focus");
    assert_eq!(body["state"]["timer"]["totalDurationSeconds"], 600);
    assert_eq!(body["state"]["timer"]["tag"], "writing");

    clock.advance_secs(120);
    let (status, body) = call(&state, "POST", "/timer/pause", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"]["phase"], "paused");
    assert_eq!(body["state"]["timer"]["timeRemainingSeconds"], 480);

    // Paused time does not count
    clock.advance_secs(300);
    let (_, body) = call(&state, "POST", "/timer/resume", None).await;
    assert_eq!(body["state"]["timer"]["timeRemainingSeconds"], 480);

    clock.advance_secs(180);
    let (status, body) = call(&state, "POST", "/timer/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"]["phase"], "idle");

    // Five minutes of focus is recorded as a partial session
    let (status, body) = call(&state, "GET", "/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalSessions"], 1);
    assert_eq!(body["totalMinutes"], 5);

    let (_, body) = call(&state, "GET", "/status", None).await;
    assert_eq!(body["lastAction"], "stop");
    assert_eq!(body["remoteSync"], false);

    runtime.dispose().await;
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new(T0);
    let (state, runtime) = boot(dir.path(), &clock, None).await;

    let (status, body) = call(&state, "POST", "/timer/pause", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "cannot pause while idle");

    let (status, _) = call(
        &state,
        "POST",
        "/timer/start",
        Some(json!({ "durationMinutes": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &state,
        "POST",
        "/timer/start",
        Some(json!({ "durationMinutes": u64::MAX / 30 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");

    call(&state, "POST", "/timer/start", None).await;
    let (status, _) = call(&state, "POST", "/timer/break", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(&state, "POST", "/lifecycle/sleeping", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    runtime.dispose().await;
}

#[tokio::test]
async fn test_hidden_flushes_local_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new(T0);
    let (state, runtime) = boot(dir.path(), &clock, None).await;

    call(&state, "POST", "/timer/start", None).await;
    clock.advance_secs(90);

    let (status, _) = call(&state, "POST", "/lifecycle/hidden", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let record = state.local.load().await.unwrap();
    assert!(record.snapshot.is_running);
    assert_eq!(record.snapshot.time_remaining_seconds, 1410);
    assert_eq!(record.saved_at_epoch_ms, T0 + 90_000);

    runtime.dispose().await;
}
