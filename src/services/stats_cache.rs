//! Cached analytics summary

use std::sync::{Arc, Mutex};
use tracing::debug;

use super::session_recorder::{SessionRecorder, StatsSummary};
use crate::error::StoreError;

/// Holds the last computed [`StatsSummary`] until a session is finalized
#[derive(Debug, Default)]
pub struct StatsCache {
    cached: Mutex<Option<StatsSummary>>,
}

impl StatsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the cached summary so the next read recomputes it
    pub fn invalidate(&self) {
        if let Ok(mut cached) = self.cached.lock() {
            if cached.take().is_some() {
                debug!("Analytics cache invalidated");
            }
        }
    }

    pub fn is_cached(&self) -> bool {
        self.cached.lock().map(|c| c.is_some()).unwrap_or(false)
    }

    /// Return the cached summary or load it from the recorder
    pub async fn get_or_load(
        &self,
        recorder: &Arc<dyn SessionRecorder>,
    ) -> Result<StatsSummary, StoreError> {
        let cached = {
            let guard = self
                .cached
                .lock()
                .map_err(|_| StoreError::Poisoned("stats cache"))?;
            guard.clone()
        };
        if let Some(summary) = cached {
            return Ok(summary);
        }

        let summary = recorder.summary().await?;
        *self
            .cached
            .lock()
            .map_err(|_| StoreError::Poisoned("stats cache"))? = Some(summary.clone());
        Ok(summary)
    }
}
