//! Completed-session recording, daily aggregates and streaks

use std::{collections::BTreeMap, path::PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::{
    fs::{self, OpenOptions},
    io::AsyncWriteExt,
    sync::Mutex,
};
use tracing::debug;

use crate::error::StoreError;

/// Sink for finalized focus sessions
#[async_trait]
pub trait SessionRecorder: Send + Sync {
    /// Persist a completed session and update aggregates
    async fn record(
        &self,
        user_id: Option<&str>,
        duration_minutes: u64,
        tag: &str,
    ) -> Result<(), StoreError>;

    /// Current aggregate view
    async fn summary(&self) -> Result<StatsSummary, StoreError>;
}

/// One line of the session journal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub user_id: Option<String>,
    pub duration_minutes: u64,
    pub tag: String,
    pub completed_at: DateTime<Utc>,
}

/// Totals for one calendar day
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTotal {
    pub minutes: u64,
    pub sessions: u64,
}

/// Aggregates maintained alongside the journal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub daily: BTreeMap<NaiveDate, DailyTotal>,
    pub current_streak_days: u32,
    pub longest_streak_days: u32,
    pub last_active_day: Option<NaiveDate>,
    pub total_minutes: u64,
    pub total_sessions: u64,
}

impl StatsSummary {
    /// Fold one session completed on `day` into the aggregates
    pub fn apply(&mut self, day: NaiveDate, duration_minutes: u64) {
        let total = self.daily.entry(day).or_default();
        total.minutes += duration_minutes;
        total.sessions += 1;
        self.total_minutes += duration_minutes;
        self.total_sessions += 1;

        match self.last_active_day {
            Some(last) if last == day => {}
            Some(last) if last.succ_opt() == Some(day) => self.current_streak_days += 1,
            Some(last) if last > day => {}
            _ => self.current_streak_days = 1,
        }
        if self.last_active_day.map_or(true, |last| day > last) {
            self.last_active_day = Some(day);
        }
        self.longest_streak_days = self.longest_streak_days.max(self.current_streak_days);
    }
}

/// Append-only JSON-lines journal with a materialized `stats.json`
pub struct JournalRecorder {
    journal_path: PathBuf,
    stats_path: PathBuf,
    write_lock: Mutex<()>,
}

impl JournalRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            journal_path: dir.join("sessions.jsonl"),
            stats_path: dir.join("stats.json"),
            write_lock: Mutex::new(()),
        }
    }

    async fn read_stats(&self) -> Result<StatsSummary, StoreError> {
        match fs::read(&self.stats_path).await {
            Ok(raw) => Ok(serde_json::from_slice(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StatsSummary::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn append(&self, record: &SessionRecord) -> Result<StatsSummary, StoreError> {
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.journal_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut journal = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.journal_path)
            .await?;
        journal.write_all(line.as_bytes()).await?;
        journal.flush().await?;

        let mut stats = self.read_stats().await?;
        stats.apply(
            record.completed_at.with_timezone(&Local).date_naive(),
            record.duration_minutes,
        );
        let tmp = self.stats_path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&stats)?).await?;
        fs::rename(&tmp, &self.stats_path).await?;
        Ok(stats)
    }
}

#[async_trait]
impl SessionRecorder for JournalRecorder {
    async fn record(
        &self,
        user_id: Option<&str>,
        duration_minutes: u64,
        tag: &str,
    ) -> Result<(), StoreError> {
        let record = SessionRecord {
            user_id: user_id.map(str::to_string),
            duration_minutes,
            tag: tag.to_string(),
            completed_at: Utc::now(),
        };
        let stats = self.append(&record).await?;
        debug!(
            "Recorded {}min session (tag={:?}), streak now {} days",
            duration_minutes, tag, stats.current_streak_days
        );
        Ok(())
    }

    async fn summary(&self) -> Result<StatsSummary, StoreError> {
        self.read_stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_streak_counts_consecutive_days() {
        let mut stats = StatsSummary::default();
        stats.apply(day(1), 25);
        stats.apply(day(1), 25);
        stats.apply(day(2), 50);
        stats.apply(day(3), 25);
        assert_eq!(stats.current_streak_days, 3);
        assert_eq!(stats.longest_streak_days, 3);
        assert_eq!(stats.daily[&day(1)], DailyTotal { minutes: 50, sessions: 2 });
        assert_eq!(stats.total_minutes, 125);
    }

    #[test]
    fn test_gap_resets_current_streak_only() {
        let mut stats = StatsSummary::default();
        stats.apply(day(1), 25);
        stats.apply(day(2), 25);
        stats.apply(day(5), 25);
        assert_eq!(stats.current_streak_days, 1);
        assert_eq!(stats.longest_streak_days, 2);
        assert_eq!(stats.last_active_day, Some(day(5)));
    }

    #[tokio::test]
    async fn test_journal_appends_and_updates_stats() {
        let tmp = tempfile::tempdir().unwrap();
        let recorder = JournalRecorder::new(tmp.path());

        recorder.record(Some("user-1"), 25, "reading").await.unwrap();
        recorder.record(None, 10, "").await.unwrap();

        let journal = std::fs::read_to_string(tmp.path().join("sessions.jsonl")).unwrap();
        assert_eq!(journal.lines().count(), 2);
        assert!(journal.contains("\"userId\":\"user-1\""));

        let summary = recorder.summary().await.unwrap();
        assert_eq!(summary.total_sessions, 2);
        assert_eq!(summary.total_minutes, 35);
        assert_eq!(summary.current_streak_days, 1);
    }

    #[tokio::test]
    async fn test_summary_without_journal_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let recorder = JournalRecorder::new(tmp.path().join("fresh"));
        assert_eq!(recorder.summary().await.unwrap(), StatsSummary::default());
    }
}
