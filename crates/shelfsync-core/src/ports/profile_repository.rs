//! Profile repository port (driven/secondary port)
//!
//! Persistent storage for [`Profile`] records. Implementations are adapter
//! crates (`shelfsync-store`); callers see only `anyhow::Result` since
//! storage errors are adapter-specific.

use crate::domain::{Profile, ProfileId};

/// Port trait for `Profile` persistence.
#[async_trait::async_trait]
pub trait IProfileRepository: Send + Sync {
    /// Saves a profile (insert or update).
    async fn save(&self, profile: &Profile) -> anyhow::Result<()>;

    /// Retrieves a profile by id.
    async fn get(&self, id: &ProfileId) -> anyhow::Result<Option<Profile>>;

    /// Retrieves all profiles.
    async fn list(&self) -> anyhow::Result<Vec<Profile>>;

    /// Deletes a profile by id. A missing id is not an error.
    async fn delete(&self, id: &ProfileId) -> anyhow::Result<()>;
}
