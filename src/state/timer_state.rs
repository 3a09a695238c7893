//! Timer phase state machine and elapsed-time arithmetic

use serde::{Deserialize, Serialize};

use super::TimerSnapshot;

/// Kind of period a run belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionKind {
    Focus,
    Break,
}

/// Data carried by a running or paused period
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    pub session_id: String,
    pub started_at_ms: i64,
    pub total_duration_secs: u64,
}

/// Timer state machine. Paused-but-not-running is not representable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerPhase {
    Idle {
        duration_secs: u64,
        remaining_secs: u64,
        break_offered: bool,
    },
    RunningFocus(RunState),
    RunningBreak(RunState),
    Paused {
        run: RunState,
        kind: SessionKind,
        paused_at_ms: i64,
    },
}

impl TimerPhase {
    pub fn idle(duration_secs: u64) -> Self {
        TimerPhase::Idle {
            duration_secs,
            remaining_secs: duration_secs,
            break_offered: false,
        }
    }

    /// Short label used in logs, errors and API responses
    pub fn label(&self) -> &'static str {
        match self {
            TimerPhase::Idle {
                break_offered: true,
                ..
            } => "break-offered",
            TimerPhase::Idle { .. } => "idle",
            TimerPhase::RunningFocus(_) => "running-focus",
            TimerPhase::RunningBreak(_) => "running-break",
            TimerPhase::Paused { .. } => "paused",
        }
    }

    pub fn is_running(&self) -> bool {
        !matches!(self, TimerPhase::Idle { .. })
    }

    pub fn run(&self) -> Option<&RunState> {
        match self {
            TimerPhase::RunningFocus(run) | TimerPhase::RunningBreak(run) => Some(run),
            TimerPhase::Paused { run, .. } => Some(run),
            TimerPhase::Idle { .. } => None,
        }
    }

    pub fn kind(&self) -> Option<SessionKind> {
        match self {
            TimerPhase::RunningFocus(_) => Some(SessionKind::Focus),
            TimerPhase::RunningBreak(_) => Some(SessionKind::Break),
            TimerPhase::Paused { kind, .. } => Some(*kind),
            TimerPhase::Idle { .. } => None,
        }
    }

    /// Rebuild a phase from a persisted snapshot, rejecting invalid combinations
    pub fn from_snapshot(snapshot: &TimerSnapshot) -> Option<Self> {
        snapshot.validate().ok()?;

        if !snapshot.is_running {
            return Some(TimerPhase::Idle {
                duration_secs: snapshot.total_duration_seconds,
                remaining_secs: snapshot.time_remaining_seconds,
                break_offered: snapshot.break_offered,
            });
        }

        let run = RunState {
            session_id: snapshot.session_id.clone(),
            started_at_ms: snapshot.started_at_epoch_ms?,
            total_duration_secs: snapshot.total_duration_seconds,
        };
        let kind = if snapshot.is_break {
            SessionKind::Break
        } else {
            SessionKind::Focus
        };

        Some(match (snapshot.is_paused, kind) {
            (true, _) => TimerPhase::Paused {
                run,
                kind,
                paused_at_ms: snapshot.paused_at_epoch_ms?,
            },
            (false, SessionKind::Focus) => TimerPhase::RunningFocus(run),
            (false, SessionKind::Break) => TimerPhase::RunningBreak(run),
        })
    }

    /// Flatten into the persisted shape. Labels and counters are filled in by the caller.
    pub fn to_snapshot(&self, now_ms: i64) -> TimerSnapshot {
        match self {
            TimerPhase::Idle {
                duration_secs,
                remaining_secs,
                break_offered,
            } => TimerSnapshot {
                time_remaining_seconds: *remaining_secs,
                break_offered: *break_offered,
                ..TimerSnapshot::idle(*duration_secs)
            },
            TimerPhase::RunningFocus(run) | TimerPhase::RunningBreak(run) => {
                let mut snapshot = running_snapshot(run, self.kind() == Some(SessionKind::Break));
                snapshot.time_remaining_seconds = remaining(&snapshot, now_ms);
                snapshot
            }
            TimerPhase::Paused {
                run,
                kind,
                paused_at_ms,
            } => {
                let mut snapshot = running_snapshot(run, *kind == SessionKind::Break);
                snapshot.is_paused = true;
                snapshot.paused_at_epoch_ms = Some(*paused_at_ms);
                snapshot.time_remaining_seconds = remaining(&snapshot, now_ms);
                snapshot
            }
        }
    }
}

fn running_snapshot(run: &RunState, is_break: bool) -> TimerSnapshot {
    TimerSnapshot {
        is_running: true,
        is_break,
        started_at_epoch_ms: Some(run.started_at_ms),
        session_id: run.session_id.clone(),
        focus_duration_seconds: None,
        ..TimerSnapshot::idle(run.total_duration_secs)
    }
}

/// Remaining seconds of a snapshot as observed at `now_ms`.
///
/// At rest the stored value is returned unchanged. While running the value is
/// derived from the start timestamp, using the pause timestamp as the clock
/// reference when paused.
pub fn remaining(snapshot: &TimerSnapshot, now_ms: i64) -> u64 {
    if !snapshot.is_running {
        return snapshot.time_remaining_seconds;
    }
    let Some(started_at) = snapshot.started_at_epoch_ms else {
        return snapshot.time_remaining_seconds;
    };

    let reference = match (snapshot.is_paused, snapshot.paused_at_epoch_ms) {
        (true, Some(paused_at)) => paused_at,
        _ => now_ms,
    };
    // Clock moved backwards: treat as no time elapsed
    let elapsed_secs = (reference.saturating_sub(started_at).max(0) / 1000) as u64;
    snapshot.total_duration_seconds.saturating_sub(elapsed_secs)
}

/// Outcome of a completion check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub completed: bool,
    pub elapsed_duration_seconds: u64,
}

/// Whether a running period's deadline has already passed at `now_ms`.
///
/// A completed period is credited with its nominal duration, never the
/// wall-clock overrun.
pub fn check_completion(snapshot: &TimerSnapshot, now_ms: i64) -> Completion {
    let not_completed = Completion {
        completed: false,
        elapsed_duration_seconds: 0,
    };
    if !snapshot.is_running {
        return not_completed;
    }
    let Some(deadline) = snapshot.deadline_epoch_ms() else {
        return not_completed;
    };

    if now_ms >= deadline {
        Completion {
            completed: true,
            elapsed_duration_seconds: snapshot.total_duration_seconds,
        }
    } else {
        not_completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;

    fn running_at(started: i64, total: u64) -> TimerSnapshot {
        TimerSnapshot {
            is_running: true,
            started_at_epoch_ms: Some(started),
            session_id: "abc".to_string(),
            ..TimerSnapshot::idle(total)
        }
    }

    #[test]
    fn test_remaining_at_rest_ignores_observation_time() {
        let snapshot = TimerSnapshot {
            time_remaining_seconds: 420,
            ..TimerSnapshot::idle(1500)
        };
        for now in [0, T0, T0 + 3_600_000, i64::MAX / 2] {
            assert_eq!(remaining(&snapshot, now), 420);
        }
    }

    #[test]
    fn test_remaining_is_non_increasing_and_floored() {
        let snapshot = running_at(T0, 1500);
        let mut previous = u64::MAX;
        for step in 0..40 {
            let now = T0 + step * 50_000;
            let value = remaining(&snapshot, now);
            assert!(value <= previous);
            previous = value;
        }
        assert_eq!(previous, 0);
        assert_eq!(remaining(&snapshot, T0 + 10_999), 1490);
    }

    #[test]
    fn test_remaining_uses_pause_reference() {
        let snapshot = TimerSnapshot {
            is_paused: true,
            paused_at_epoch_ms: Some(T0 + 100_000),
            ..running_at(T0, 1500)
        };
        assert_eq!(remaining(&snapshot, T0 + 100_000), 1400);
        assert_eq!(remaining(&snapshot, T0 + 9_000_000), 1400);
    }

    #[test]
    fn test_remaining_clamps_backward_clock() {
        let snapshot = running_at(T0, 300);
        assert_eq!(remaining(&snapshot, T0 - 60_000), 300);
    }

    #[test]
    fn test_completion_credits_nominal_duration() {
        let snapshot = running_at(T0, 1500);
        let three_hours_late = T0 + 1_500_000 + 3 * 3_600_000;
        let completion = check_completion(&snapshot, three_hours_late);
        assert!(completion.completed);
        assert_eq!(completion.elapsed_duration_seconds, 1500);
    }

    #[test]
    fn test_completion_boundary_and_idle() {
        let snapshot = running_at(T0, 1500);
        assert!(!check_completion(&snapshot, T0 + 1_499_999).completed);
        assert!(check_completion(&snapshot, T0 + 1_500_000).completed);
        assert!(!check_completion(&TimerSnapshot::idle(1500), T0).completed);
    }

    #[test]
    fn test_phase_round_trips_through_snapshot() {
        let run = RunState {
            session_id: "s".to_string(),
            started_at_ms: T0,
            total_duration_secs: 600,
        };
        let phases = [
            TimerPhase::idle(1500),
            TimerPhase::RunningFocus(run.clone()),
            TimerPhase::RunningBreak(run.clone()),
            TimerPhase::Paused {
                run,
                kind: SessionKind::Break,
                paused_at_ms: T0 + 5_000,
            },
        ];
        for phase in phases {
            let snapshot = phase.to_snapshot(T0 + 10_000);
            assert_eq!(TimerPhase::from_snapshot(&snapshot), Some(phase));
        }
    }

    #[test]
    fn test_paused_snapshot_freezes_remaining() {
        let phase = TimerPhase::Paused {
            run: RunState {
                session_id: "s".to_string(),
                started_at_ms: T0,
                total_duration_secs: 600,
            },
            kind: SessionKind::Focus,
            paused_at_ms: T0 + 60_000,
        };
        assert_eq!(phase.to_snapshot(T0 + 500_000).time_remaining_seconds, 540);
    }

    #[test]
    fn test_from_snapshot_rejects_invalid_combination() {
        let snapshot = TimerSnapshot {
            is_paused: true,
            paused_at_epoch_ms: Some(T0),
            ..TimerSnapshot::idle(60)
        };
        assert_eq!(TimerPhase::from_snapshot(&snapshot), None);
    }
}
