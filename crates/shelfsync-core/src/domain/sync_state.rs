//! Per-profile sync watermark.
//!
//! Persisted once per run to decide whether the next run can go incremental
//! or must fall back to a full scan.

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Watermarks a profile uses to bound the next run's ABS query window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    last_sync_timestamp_ms: i64,
    last_full_sync_ms: i64,
    version: u32,
}

impl SyncState {
    pub const CURRENT_VERSION: u32 = 1;

    /// Builds a fresh state, validating the invariant that a full sync
    /// watermark can never be newer than the general watermark it updates.
    pub fn new(last_sync_timestamp_ms: i64, last_full_sync_ms: i64) -> Result<Self, DomainError> {
        if last_full_sync_ms > last_sync_timestamp_ms {
            return Err(DomainError::ValidationFailed(
                "last_full_sync_ms cannot be newer than last_sync_timestamp_ms".to_string(),
            ));
        }
        Ok(Self {
            last_sync_timestamp_ms,
            last_full_sync_ms,
            version: Self::CURRENT_VERSION,
        })
    }

    /// The state a profile starts from before its first run.
    pub fn initial() -> Self {
        Self {
            last_sync_timestamp_ms: 0,
            last_full_sync_ms: 0,
            version: Self::CURRENT_VERSION,
        }
    }

    pub fn last_sync_timestamp_ms(&self) -> i64 {
        self.last_sync_timestamp_ms
    }

    pub fn last_full_sync_ms(&self) -> i64 {
        self.last_full_sync_ms
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Records the completion of an incremental run at `finished_at_ms`.
    pub fn record_incremental(&mut self, finished_at_ms: i64) {
        self.last_sync_timestamp_ms = finished_at_ms;
    }

    /// Records the completion of a full run: both watermarks advance
    /// together.
    pub fn record_full(&mut self, finished_at_ms: i64) {
        self.last_sync_timestamp_ms = finished_at_ms;
        self.last_full_sync_ms = finished_at_ms;
    }

    /// Whether an incremental run is even possible given this state, i.e.
    /// whether a prior full sync has ever completed.
    pub fn has_baseline(&self) -> bool {
        self.last_full_sync_ms > 0
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::initial()
    }
}
