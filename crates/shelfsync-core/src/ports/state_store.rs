//! Incremental sync state store port (driven/secondary port)
//!
//! Per-profile persisted watermark, written atomically by the orchestrator.
//! Only the orchestrator ever writes; the coordinator only reads through it
//! for status reporting.

use crate::domain::{ProfileId, SyncState};

#[async_trait::async_trait]
pub trait ISyncStateStore: Send + Sync {
    /// Loads the watermark for a profile. A missing file returns
    /// `SyncState::initial()`, never an error — version mismatch and
    /// corrupt files are treated the same way (first-run semantics).
    async fn load(&self, profile_id: &ProfileId) -> anyhow::Result<SyncState>;

    /// Atomically persists the watermark (write-tempfile-then-rename).
    async fn save(&self, profile_id: &ProfileId, state: &SyncState) -> anyhow::Result<()>;
}
