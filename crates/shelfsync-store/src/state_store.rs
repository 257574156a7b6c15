//! File-backed implementation of `ISyncStateStore`
//!
//! One JSON file per profile under a base directory:
//! `<state_dir>/<profile_id>.json`. Writes go through a temp file in the
//! same directory followed by a rename, so a crash mid-write never leaves a
//! half-written watermark behind.

use std::path::{Path, PathBuf};

use shelfsync_core::domain::{ProfileId, SyncState};
use shelfsync_core::ports::state_store::ISyncStateStore;

/// Stores each profile's [`SyncState`] as a standalone JSON file.
pub struct FileSyncStateStore {
    state_dir: PathBuf,
}

impl FileSyncStateStore {
    pub fn new(state_dir: PathBuf) -> Self {
        Self { state_dir }
    }

    fn path_for(&self, profile_id: &ProfileId) -> PathBuf {
        self.state_dir.join(format!("{}.json", sanitize(profile_id.as_str())))
    }
}

/// Replaces path separators and other filesystem-hostile characters so a
/// profile id can never be used to escape `state_dir`.
fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

#[async_trait::async_trait]
impl ISyncStateStore for FileSyncStateStore {
    async fn load(&self, profile_id: &ProfileId) -> anyhow::Result<SyncState> {
        let path = self.path_for(profile_id);
        if !path.exists() {
            return Ok(SyncState::initial());
        }

        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(profile_id = %profile_id, error = %e, "failed to read sync state file, treating as first run");
                return Ok(SyncState::initial());
            }
        };

        match serde_json::from_str::<SyncState>(&contents) {
            Ok(state) => Ok(state),
            Err(e) => {
                tracing::warn!(profile_id = %profile_id, error = %e, "corrupt sync state file, treating as first run");
                Ok(SyncState::initial())
            }
        }
    }

    async fn save(&self, profile_id: &ProfileId, state: &SyncState) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.state_dir).await?;
        let path = self.path_for(profile_id);
        let json = serde_json::to_string_pretty(state)?;

        let tmp_path = tmp_path_for(&path);
        tokio::fs::write(&tmp_path, json.as_bytes()).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        tracing::debug!(profile_id = %profile_id, path = %path.display(), "saved sync state");
        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let file_name = tmp.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    tmp.set_file_name(format!("{file_name}.tmp"));
    tmp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_missing_file_returns_initial_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSyncStateStore::new(dir.path().to_path_buf());
        let id = ProfileId::new("p1").unwrap();

        let state = store.load(&id).await.unwrap();
        assert_eq!(state, SyncState::initial());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSyncStateStore::new(dir.path().to_path_buf());
        let id = ProfileId::new("p1").unwrap();

        let state = SyncState::new(1_000, 500).unwrap();
        store.save(&id, &state).await.unwrap();

        let loaded = store.load(&id).await.unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn corrupt_file_is_treated_as_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSyncStateStore::new(dir.path().to_path_buf());
        let id = ProfileId::new("p1").unwrap();

        tokio::fs::create_dir_all(dir.path()).await.unwrap();
        tokio::fs::write(store.path_for(&id), b"not json").await.unwrap();

        let loaded = store.load(&id).await.unwrap();
        assert_eq!(loaded, SyncState::initial());
    }

    #[tokio::test]
    async fn profile_ids_with_path_separators_are_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSyncStateStore::new(dir.path().to_path_buf());
        let id = ProfileId::new("../../etc/passwd").unwrap();

        let path = store.path_for(&id);
        assert!(path.starts_with(dir.path()));
        assert!(!path.to_string_lossy().contains(".."));
    }

    #[tokio::test]
    async fn distinct_profiles_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSyncStateStore::new(dir.path().to_path_buf());
        let a = ProfileId::new("p1").unwrap();
        let b = ProfileId::new("p2").unwrap();

        store.save(&a, &SyncState::new(100, 100).unwrap()).await.unwrap();
        store.save(&b, &SyncState::new(200, 200).unwrap()).await.unwrap();

        assert_eq!(store.load(&a).await.unwrap().last_sync_timestamp_ms(), 100);
        assert_eq!(store.load(&b).await.unwrap().last_sync_timestamp_ms(), 200);
    }
}
