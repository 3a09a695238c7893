//! Load-time merge of the local and remote snapshots

use tracing::debug;

use crate::state::{check_completion, remaining, LocalRecord, RemoteRecord, TimerSnapshot};

/// Where the adopted snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    Fresh,
    Local,
    Remote,
}

impl SnapshotSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotSource::Fresh => "fresh state",
            SnapshotSource::Local => "local snapshot",
            SnapshotSource::Remote => "remote snapshot",
        }
    }
}

/// A focus session that finished while nothing was observing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedSession {
    pub session_id: String,
    pub duration_minutes: u64,
    pub tag: String,
    pub task_name: String,
}

/// Result of reconciling the two persisted copies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Authoritative state to adopt, remaining time derived at `now`
    pub snapshot: TimerSnapshot,
    pub source: SnapshotSource,
    /// Set when the local copy's focus deadline had already passed
    pub finalized: Option<FinalizedSession>,
    /// The finished local session must be cleared from both stores so it cannot
    /// be restored again. Never set when the remote copy took over.
    pub clear_local: bool,
}

/// Decide the authoritative timer state at load time.
///
/// The local copy is examined first: a focus period whose deadline passed is
/// finalized, a running period is resumed from its timestamps, anything else
/// is restored as saved. A running remote copy then takes over when it was
/// written after the local copy and still has time left.
pub fn reconcile(
    local: Option<&LocalRecord>,
    remote: Option<&RemoteRecord>,
    now_ms: i64,
    default_focus_secs: u64,
) -> Reconciliation {
    let mut outcome = match local {
        Some(record) => from_local(record, now_ms),
        None => Reconciliation {
            snapshot: TimerSnapshot::idle(default_focus_secs),
            source: SnapshotSource::Fresh,
            finalized: None,
            clear_local: false,
        },
    };

    let Some(remote) = remote else {
        return outcome;
    };
    if !remote.snapshot.is_running {
        return outcome;
    }

    let local_saved_at = local.map_or(0, |record| record.saved_at_epoch_ms);
    let remote_remaining = remaining(&remote.snapshot, now_ms);
    if remote.updated_at_epoch_ms > local_saved_at && remote_remaining > 0 {
        debug!(
            "Remote snapshot (updated {}) is newer than local (saved {}), taking over",
            remote.updated_at_epoch_ms, local_saved_at
        );
        outcome.snapshot = TimerSnapshot {
            time_remaining_seconds: remote_remaining,
            ..remote.snapshot.clone()
        };
        outcome.source = SnapshotSource::Remote;
        // The adopted session is re-saved locally instead
        outcome.clear_local = false;
    }

    outcome
}

fn from_local(record: &LocalRecord, now_ms: i64) -> Reconciliation {
    let saved = &record.snapshot;
    let completion = check_completion(saved, now_ms);

    // A paused period is frozen, its nominal deadline means nothing
    if completion.completed && !saved.is_paused {
        let idle = TimerSnapshot {
            break_offered: !saved.is_break,
            ..saved.clone().into_idle()
        };
        let finalized = (!saved.is_break).then(|| FinalizedSession {
            session_id: saved.session_id.clone(),
            duration_minutes: completion.elapsed_duration_seconds / 60,
            tag: saved.tag.clone(),
            task_name: saved.task_name.clone(),
        });
        return Reconciliation {
            snapshot: idle,
            source: SnapshotSource::Local,
            clear_local: finalized.is_some(),
            finalized,
        };
    }

    let snapshot = if saved.is_running && !saved.is_paused {
        TimerSnapshot {
            time_remaining_seconds: remaining(saved, now_ms),
            ..saved.clone()
        }
    } else {
        saved.clone()
    };

    Reconciliation {
        snapshot,
        source: SnapshotSource::Local,
        finalized: None,
        clear_local: false,
    }
}
