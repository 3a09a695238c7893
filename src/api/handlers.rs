//! HTTP endpoint handlers

use std::{convert::Infallible, sync::Arc};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use futures::stream::{self, Stream};
use tracing::{error, info, warn};

use crate::{
    controller::{StartRequest, TimerController},
    error::TimerError,
    lifecycle::{handle_lifecycle_event, LifecycleEvent},
    services::StatsSummary,
    state::{AppState, TimerSnapshot},
};
use super::responses::{
    ApiResponse, BreakBody, ErrorResponse, HealthResponse, StartBody, StatusResponse, TimerView,
};

type HandlerError = (StatusCode, Json<ErrorResponse>);
type HandlerResult<T> = Result<Json<T>, HandlerError>;

fn reject(status: StatusCode, message: String) -> HandlerError {
    (status, Json(ErrorResponse::new(message)))
}

fn transition_error(action: &str, e: TimerError) -> HandlerError {
    warn!("Rejected {} request: {}", action, e);
    let status = match e {
        TimerError::InvalidTransition { .. } => StatusCode::CONFLICT,
        TimerError::InvalidDuration(_) => StatusCode::BAD_REQUEST,
    };
    reject(status, e.to_string())
}

fn view(controller: &TimerController, snapshot: TimerSnapshot) -> TimerView {
    TimerView {
        phase: controller.phase().label().to_string(),
        timer: snapshot,
    }
}

/// Apply a transition and wrap the outcome
fn respond(
    state: &AppState,
    action: &str,
    controller: &TimerController,
    result: Result<TimerSnapshot, TimerError>,
) -> HandlerResult<ApiResponse> {
    match result {
        Ok(snapshot) => {
            state.record_action(action);
            info!("{} endpoint called - timer is {}", action, controller.phase().label());
            Ok(Json(ApiResponse::ok(
                format!("Timer {}", controller.phase().label()),
                view(controller, snapshot),
            )))
        }
        Err(e) => Err(transition_error(action, e)),
    }
}

/// Handle GET /timer - Return the current timer state
pub async fn timer_handler(State(state): State<Arc<AppState>>) -> Json<TimerView> {
    let controller = state.controller.lock().await;
    Json(view(&controller, controller.snapshot()))
}

/// Handle POST /timer/start - Start a focus session
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    body: Option<Json<StartBody>>,
) -> HandlerResult<ApiResponse> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let request = StartRequest {
        duration_minutes: body.duration_minutes,
        tag: body.tag,
        task_name: body.task_name,
    };
    let mut controller = state.controller.lock().await;
    let result = controller.start(request).await;
    respond(&state, "start", &controller, result)
}

/// Handle POST /timer/pause - Pause the running period
pub async fn pause_handler(State(state): State<Arc<AppState>>) -> HandlerResult<ApiResponse> {
    let mut controller = state.controller.lock().await;
    let result = controller.pause().await;
    respond(&state, "pause", &controller, result)
}

/// Handle POST /timer/resume - Resume a paused period
pub async fn resume_handler(State(state): State<Arc<AppState>>) -> HandlerResult<ApiResponse> {
    let mut controller = state.controller.lock().await;
    let result = controller.resume().await;
    respond(&state, "resume", &controller, result)
}

/// Handle POST /timer/stop - Stop the current period
pub async fn stop_handler(State(state): State<Arc<AppState>>) -> HandlerResult<ApiResponse> {
    let mut controller = state.controller.lock().await;
    let result = controller.stop().await;
    respond(&state, "stop", &controller, result)
}

/// Handle POST /timer/break - Start a break
pub async fn break_handler(
    State(state): State<Arc<AppState>>,
    body: Option<Json<BreakBody>>,
) -> HandlerResult<ApiResponse> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let mut controller = state.controller.lock().await;
    let result = controller.start_break(body.duration_minutes).await;
    respond(&state, "break", &controller, result)
}

/// Handle POST /lifecycle/:event - Client reports it is hiding or unloading
pub async fn lifecycle_handler(
    State(state): State<Arc<AppState>>,
    Path(event): Path<String>,
) -> Result<StatusCode, HandlerError> {
    let Some(event) = LifecycleEvent::from_client(&event) else {
        return Err(reject(
            StatusCode::NOT_FOUND,
            format!("Unknown lifecycle event: {}", event),
        ));
    };
    handle_lifecycle_event(&state.controller, event).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Handle GET /timer/events - Server-sent stream of timer snapshots
pub async fn events_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.publisher.subscribe();

    let stream = stream::unfold((rx, true), |(mut rx, first)| async move {
        if !first && rx.changed().await.is_err() {
            return None;
        }
        let snapshot = rx.borrow_and_update().clone();
        match Event::default().event("timer").json_data(&snapshot) {
            Ok(event) => Some((Ok(event), (rx, false))),
            Err(e) => {
                error!("Failed to encode timer event: {}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Handle GET /stats - Cached analytics summary
pub async fn stats_handler(State(state): State<Arc<AppState>>) -> HandlerResult<StatsSummary> {
    match state.stats.get_or_load(&state.recorder).await {
        Ok(summary) => Ok(Json(summary)),
        Err(e) => {
            error!("Failed to load stats: {}", e);
            Err(reject(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// Handle GET /status - Return daemon and timer status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let timer = {
        let controller = state.controller.lock().await;
        view(&controller, controller.snapshot())
    };
    let (last_action, last_action_time) = state.get_last_action();

    Json(StatusResponse {
        state: timer,
        user_id: state.user_id.clone(),
        remote_sync: state.remote_enabled,
        last_heartbeat: state.local.heartbeat().await,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    })
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
