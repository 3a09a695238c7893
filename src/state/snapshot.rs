//! Persisted timer snapshot shape

use serde::{Deserialize, Serialize};

/// A complete, self-contained record of timer state at a point in time.
///
/// This is the shape written to both the local and the remote store. While
/// `is_running` is true, `time_remaining_seconds` is informational only; the
/// authoritative remaining time is derived from `started_at_epoch_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub is_running: bool,
    pub is_paused: bool,
    pub is_break: bool,
    pub time_remaining_seconds: u64,
    pub total_duration_seconds: u64,
    pub started_at_epoch_ms: Option<i64>,
    pub paused_at_epoch_ms: Option<i64>,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub task_name: String,
    #[serde(default)]
    pub session_id: String,
    /// Focus length restored as the idle target once a break ends
    #[serde(default)]
    pub focus_duration_seconds: Option<u64>,
    #[serde(default)]
    pub break_offered: bool,
    #[serde(default)]
    pub completed_focus_count: u32,
}

impl TimerSnapshot {
    /// Idle snapshot targeting `duration_seconds`
    pub fn idle(duration_seconds: u64) -> Self {
        Self {
            is_running: false,
            is_paused: false,
            is_break: false,
            time_remaining_seconds: duration_seconds,
            total_duration_seconds: duration_seconds,
            started_at_epoch_ms: None,
            paused_at_epoch_ms: None,
            tag: String::new(),
            task_name: String::new(),
            session_id: String::new(),
            focus_duration_seconds: Some(duration_seconds),
            break_offered: false,
            completed_focus_count: 0,
        }
    }

    /// Check the persisted invariants.
    ///
    /// Returns a description of the first violated invariant.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.is_paused && !self.is_running {
            return Err("paused snapshot is not running");
        }
        if self.is_running && self.started_at_epoch_ms.is_none() {
            return Err("running snapshot has no start timestamp");
        }
        if self.is_paused && self.paused_at_epoch_ms.is_none() {
            return Err("paused snapshot has no pause timestamp");
        }
        if self.total_duration_seconds == 0 {
            return Err("total duration is zero");
        }
        if self.is_running && self.deadline_epoch_ms().is_none() {
            return Err("deadline does not fit an epoch timestamp");
        }
        Ok(())
    }

    /// Epoch millisecond at which a running period ends, ignoring pauses.
    ///
    /// `None` when not started or when the deadline overflows.
    pub fn deadline_epoch_ms(&self) -> Option<i64> {
        deadline_after(self.started_at_epoch_ms?, self.total_duration_seconds)
    }

    /// Focus duration to come back to after this period
    pub fn focus_target_seconds(&self) -> u64 {
        match self.focus_duration_seconds {
            Some(secs) if secs > 0 => secs,
            _ if !self.is_break => self.total_duration_seconds,
            _ => crate::state::DEFAULT_FOCUS_SECONDS,
        }
    }

    /// Convert into an idle snapshot that keeps the labels and focus target
    pub fn into_idle(self) -> Self {
        let target = self.focus_target_seconds();
        Self {
            tag: self.tag,
            task_name: self.task_name,
            completed_focus_count: self.completed_focus_count,
            ..Self::idle(target)
        }
    }
}

/// Snapshot as stored in the local key-value directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalRecord {
    #[serde(flatten)]
    pub snapshot: TimerSnapshot,
    pub saved_at_epoch_ms: i64,
}

/// Snapshot as stored in the remote document store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    #[serde(default)]
    pub owner_id: String,
    #[serde(flatten)]
    pub snapshot: TimerSnapshot,
    #[serde(default)]
    pub updated_at_epoch_ms: i64,
}

/// End of a `total_secs` period starting at `started_at_ms`, if representable
pub fn deadline_after(started_at_ms: i64, total_secs: u64) -> Option<i64> {
    i64::try_from(total_secs)
        .ok()?
        .checked_mul(1000)?
        .checked_add(started_at_ms)
}
