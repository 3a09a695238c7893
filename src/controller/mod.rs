//! Timer controller
//!
//! Owns the single in-memory timer, applies user transitions, runs completion
//! side effects and fans every change out to the local store, the remote sync
//! worker and the state publisher.

pub mod reconcile;

use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    error::TimerError,
    lifecycle::LifecycleEvent,
    services::{
        LocalSnapshotStore, NotificationKind, Notifier, RemoteSnapshotStore, SessionRecorder,
        StatePublisher, StatsCache,
    },
    state::{
        deadline_after, RunState, SessionKind, TimerPhase, TimerSnapshot, DEFAULT_FOCUS_SECONDS,
    },
    tasks::RemoteSyncHandle,
    utils::Clock,
};
use reconcile::{reconcile, SnapshotSource};

/// Durations and automation switches
#[derive(Debug, Clone)]
pub struct TimerSettings {
    pub focus_secs: u64,
    pub short_break_secs: u64,
    pub long_break_secs: u64,
    /// Every n-th completed focus session earns a long break; 0 disables long breaks
    pub long_break_every: u32,
    pub auto_break: bool,
    pub auto_start_next: bool,
    /// Manual stops shorter than this are discarded instead of recorded
    pub min_partial_secs: u64,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            focus_secs: DEFAULT_FOCUS_SECONDS,
            short_break_secs: 5 * 60,
            long_break_secs: 15 * 60,
            long_break_every: 4,
            auto_break: false,
            auto_start_next: false,
            min_partial_secs: 60,
        }
    }
}

/// Remote store access for an identified user
#[derive(Clone)]
pub struct RemoteLink {
    pub owner_id: String,
    pub store: RemoteSnapshotStore,
    pub sync: RemoteSyncHandle,
}

/// Everything the controller talks to
#[derive(Clone)]
pub struct ControllerDeps {
    pub clock: Arc<dyn Clock>,
    pub local: LocalSnapshotStore,
    /// `None` in local-only mode
    pub remote: Option<RemoteLink>,
    pub user_id: Option<String>,
    pub recorder: Arc<dyn SessionRecorder>,
    pub notifier: Arc<dyn Notifier>,
    pub stats: Arc<StatsCache>,
    pub publisher: Arc<dyn StatePublisher>,
}

/// Parameters of a focus start; missing values fall back to the previous ones
#[derive(Debug, Clone, Default)]
pub struct StartRequest {
    pub duration_minutes: Option<u64>,
    pub tag: Option<String>,
    pub task_name: Option<String>,
}

pub struct TimerController {
    phase: TimerPhase,
    tag: String,
    task_name: String,
    /// Idle target, restored after every break
    focus_secs: u64,
    completed_focus_count: u32,
    last_finalized_session: Option<String>,
    settings: TimerSettings,
    deps: ControllerDeps,
}

impl TimerController {
    pub fn new(settings: TimerSettings, deps: ControllerDeps) -> Self {
        Self {
            phase: TimerPhase::idle(settings.focus_secs),
            tag: String::new(),
            task_name: String::new(),
            focus_secs: settings.focus_secs,
            completed_focus_count: 0,
            last_finalized_session: None,
            settings,
            deps,
        }
    }

    pub fn phase(&self) -> &TimerPhase {
        &self.phase
    }

    /// Current state in persisted form, remaining time derived at this instant
    pub fn snapshot(&self) -> TimerSnapshot {
        let mut snapshot = self.phase.to_snapshot(self.deps.clock.now_ms());
        snapshot.tag = self.tag.clone();
        snapshot.task_name = self.task_name.clone();
        snapshot.focus_duration_seconds = Some(self.focus_secs);
        snapshot.completed_focus_count = self.completed_focus_count;
        snapshot
    }

    pub fn remaining_secs(&self) -> u64 {
        self.snapshot().time_remaining_seconds
    }

    /// Idle → RunningFocus
    pub async fn start(&mut self, request: StartRequest) -> Result<TimerSnapshot, TimerError> {
        self.require_idle("start")?;

        let duration_secs = match request.duration_minutes {
            Some(minutes) => self.requested_secs(minutes)?,
            None => self.focus_secs,
        };
        if let Some(tag) = request.tag {
            self.tag = tag;
        }
        if let Some(task_name) = request.task_name {
            self.task_name = task_name;
        }
        self.focus_secs = duration_secs;
        self.phase = TimerPhase::RunningFocus(self.new_run(duration_secs));

        info!(
            "Focus started: {}min, tag={:?}, task={:?}",
            duration_secs / 60,
            self.tag,
            self.task_name
        );
        Ok(self.persist_transition().await)
    }

    /// Running → Paused, freezing the remaining time
    pub async fn pause(&mut self) -> Result<TimerSnapshot, TimerError> {
        let (run, kind) = match &self.phase {
            TimerPhase::RunningFocus(run) => (run.clone(), SessionKind::Focus),
            TimerPhase::RunningBreak(run) => (run.clone(), SessionKind::Break),
            other => return Err(invalid("pause", other)),
        };

        self.phase = TimerPhase::Paused {
            run,
            kind,
            paused_at_ms: self.deps.clock.now_ms(),
        };
        let snapshot = self.persist_transition().await;
        info!("Timer paused with {}s remaining", snapshot.time_remaining_seconds);
        Ok(snapshot)
    }

    /// Paused → Running, shifting the start forward by the pause length
    pub async fn resume(&mut self) -> Result<TimerSnapshot, TimerError> {
        let (run, kind, paused_at_ms) = match &self.phase {
            TimerPhase::Paused {
                run,
                kind,
                paused_at_ms,
            } => (run.clone(), *kind, *paused_at_ms),
            other => return Err(invalid("resume", other)),
        };

        let paused_for_ms = (self.deps.clock.now_ms() - paused_at_ms).max(0);
        let run = RunState {
            started_at_ms: run.started_at_ms + paused_for_ms,
            ..run
        };
        self.phase = match kind {
            SessionKind::Focus => TimerPhase::RunningFocus(run),
            SessionKind::Break => TimerPhase::RunningBreak(run),
        };

        let snapshot = self.persist_transition().await;
        info!(
            "Timer resumed after {}s pause, {}s remaining",
            paused_for_ms / 1000,
            snapshot.time_remaining_seconds
        );
        Ok(snapshot)
    }

    /// Running or Paused → Idle. A focus period past the minimum is recorded as partial.
    pub async fn stop(&mut self) -> Result<TimerSnapshot, TimerError> {
        let (Some(run), Some(kind)) = (self.phase.run().cloned(), self.phase.kind()) else {
            return Err(invalid("stop", &self.phase));
        };

        let current = self.snapshot();
        let elapsed_secs = current
            .total_duration_seconds
            .saturating_sub(current.time_remaining_seconds);

        if kind == SessionKind::Focus {
            if elapsed_secs >= self.settings.min_partial_secs {
                info!("Focus stopped after {}s, recording partial session", elapsed_secs);
                let tag = self.tag.clone();
                self.finalize(&run.session_id, elapsed_secs / 60, &tag).await;
            } else {
                info!("Focus stopped after {}s, discarding", elapsed_secs);
            }
        } else {
            info!("Break ended early after {}s", elapsed_secs);
        }

        self.phase = TimerPhase::idle(self.focus_secs);
        Ok(self.persist_transition().await)
    }

    /// Idle → RunningBreak
    pub async fn start_break(&mut self, duration_minutes: Option<u64>) -> Result<TimerSnapshot, TimerError> {
        self.require_idle("start a break")?;

        let duration_secs = match duration_minutes {
            Some(minutes) => self.requested_secs(minutes)?,
            None => self.next_break_secs(),
        };
        self.phase = TimerPhase::RunningBreak(self.new_run(duration_secs));

        info!("Break started: {}min", duration_secs / 60);
        Ok(self.persist_transition().await)
    }

    /// One-second heartbeat: re-derive the remaining time and complete at zero
    pub async fn tick(&mut self) {
        if !matches!(
            self.phase,
            TimerPhase::RunningFocus(_) | TimerPhase::RunningBreak(_)
        ) {
            return;
        }

        let snapshot = self.snapshot();
        if snapshot.time_remaining_seconds == 0 {
            self.complete_current().await;
        } else {
            self.deps.local.save(&snapshot).await;
            self.deps.publisher.publish_timer_state(&snapshot);
        }
    }

    /// Force an immediate write to both stores
    pub async fn flush(&self, event: LifecycleEvent) {
        let snapshot = self.snapshot();
        debug!("Flushing timer state on {}", event.as_str());

        self.deps.local.save(&snapshot).await;
        if let Some(remote) = &self.deps.remote {
            remote.sync.flush_now(snapshot.clone());
        }
        self.deps.publisher.publish_timer_state(&snapshot);
    }

    /// Drain the remote sync worker. Called once on dispose.
    pub async fn close_remote(&self) {
        if let Some(remote) = &self.deps.remote {
            remote.sync.close().await;
        }
    }

    /// Load-time reconciliation between the local and remote snapshots
    pub async fn restore(&mut self) {
        let now = self.deps.clock.now_ms();

        let local = self.deps.local.load().await;
        let remote = match &self.deps.remote {
            Some(link) => match link.store.load(&link.owner_id).await {
                Ok(record) => record,
                Err(e) => {
                    warn!("Failed to load remote timer state, continuing local-only: {}", e);
                    None
                }
            },
            None => None,
        };

        let outcome = reconcile(local.as_ref(), remote.as_ref(), now, self.settings.focus_secs);
        self.adopt(&outcome.snapshot);

        if let Some(session) = &outcome.finalized {
            info!(
                "Focus session {} completed while unloaded, crediting {}min",
                session.session_id, session.duration_minutes
            );
            self.finalize(&session.session_id, session.duration_minutes, &session.tag)
                .await;
            self.completed_focus_count += 1;
            self.deps.notifier.notify(NotificationKind::FocusComplete);
        }

        if outcome.clear_local {
            self.deps.local.clear().await;
            // A remote takeover leaves the shared document describing the adopted session
            if outcome.source != SnapshotSource::Remote {
                if let Some(remote) = &self.deps.remote {
                    remote.sync.clear(self.focus_secs);
                }
            }
        } else if outcome.source != SnapshotSource::Fresh {
            self.deps.local.save(&self.snapshot()).await;
        }

        let snapshot = self.snapshot();
        self.deps.publisher.publish_timer_state(&snapshot);
        info!(
            "Timer restored from {} as {} ({}s remaining)",
            outcome.source.as_str(),
            self.phase.label(),
            snapshot.time_remaining_seconds
        );
    }

    fn adopt(&mut self, snapshot: &TimerSnapshot) {
        self.phase = TimerPhase::from_snapshot(snapshot).unwrap_or_else(|| {
            warn!("Reconciled snapshot is invalid, starting idle");
            TimerPhase::idle(self.settings.focus_secs)
        });
        self.tag = snapshot.tag.clone();
        self.task_name = snapshot.task_name.clone();
        self.focus_secs = snapshot.focus_target_seconds();
        self.completed_focus_count = snapshot.completed_focus_count;
    }

    async fn complete_current(&mut self) {
        match self.phase.clone() {
            TimerPhase::RunningFocus(run) => {
                info!("Focus session {} completed", run.session_id);
                let tag = self.tag.clone();
                self.finalize(&run.session_id, run.total_duration_secs / 60, &tag)
                    .await;
                self.completed_focus_count += 1;
                self.deps.notifier.notify(NotificationKind::FocusComplete);

                self.phase = if self.settings.auto_break {
                    let break_secs = self.next_break_secs();
                    info!("Auto-starting {}min break", break_secs / 60);
                    TimerPhase::RunningBreak(self.new_run(break_secs))
                } else {
                    TimerPhase::Idle {
                        duration_secs: self.focus_secs,
                        remaining_secs: self.focus_secs,
                        break_offered: true,
                    }
                };
            }
            TimerPhase::RunningBreak(run) => {
                info!("Break {} completed", run.session_id);
                self.deps.notifier.notify(NotificationKind::BreakComplete);

                self.phase = if self.settings.auto_start_next {
                    info!("Auto-starting next {}min focus session", self.focus_secs / 60);
                    TimerPhase::RunningFocus(self.new_run(self.focus_secs))
                } else {
                    TimerPhase::idle(self.focus_secs)
                };
            }
            _ => return,
        }
        self.persist_transition().await;
    }

    /// Record a finished focus session exactly once per session id
    async fn finalize(&mut self, session_id: &str, duration_minutes: u64, tag: &str) {
        if self.last_finalized_session.as_deref() == Some(session_id) {
            debug!("Session {} already finalized, skipping", session_id);
            return;
        }
        self.last_finalized_session = Some(session_id.to_string());

        if let Err(e) = self
            .deps
            .recorder
            .record(self.deps.user_id.as_deref(), duration_minutes, tag)
            .await
        {
            warn!("Failed to record completed session {}: {}", session_id, e);
        }
        self.deps.stats.invalidate();
    }

    async fn persist_transition(&self) -> TimerSnapshot {
        let snapshot = self.snapshot();
        self.deps.local.save(&snapshot).await;
        if let Some(remote) = &self.deps.remote {
            remote.sync.schedule(snapshot.clone());
        }
        self.deps.publisher.publish_timer_state(&snapshot);
        debug!("Timer is now {}", self.phase.label());
        snapshot
    }

    fn next_break_secs(&self) -> u64 {
        let every = self.settings.long_break_every;
        if every > 0 && self.completed_focus_count > 0 && self.completed_focus_count % every == 0 {
            self.settings.long_break_secs
        } else {
            self.settings.short_break_secs
        }
    }

    /// Client-supplied minutes as seconds; the deadline must be representable
    fn requested_secs(&self, minutes: u64) -> Result<u64, TimerError> {
        let now = self.deps.clock.now_ms();
        minutes
            .checked_mul(60)
            .filter(|&secs| secs > 0 && deadline_after(now, secs).is_some())
            .ok_or(TimerError::InvalidDuration(minutes))
    }

    fn new_run(&self, total_duration_secs: u64) -> RunState {
        RunState {
            session_id: Uuid::new_v4().to_string(),
            started_at_ms: self.deps.clock.now_ms(),
            total_duration_secs,
        }
    }

    fn require_idle(&self, action: &'static str) -> Result<(), TimerError> {
        match self.phase {
            TimerPhase::Idle { .. } => Ok(()),
            ref other => Err(invalid(action, other)),
        }
    }
}

fn invalid(action: &'static str, phase: &TimerPhase) -> TimerError {
    TimerError::InvalidTransition {
        action,
        phase: phase.label(),
    }
}
