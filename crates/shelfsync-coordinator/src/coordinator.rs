//! Multi-profile coordinator.
//!
//! Owns one run lease and one cooperative-cancellation token per profile,
//! schedules periodic runs derived from each profile's `syncInterval`, and
//! exposes [`CoordinatorHandle`] as the async surface an out-of-scope HTTP
//! layer would adapt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use shelfsync_abs::client::AbsClient;
use shelfsync_core::domain::{Profile, ProfileId, SyncConfig};
use shelfsync_core::ports::{IAsinCache, IEditionCache, ISyncStateStore, IUserBookCache, IProfileRepository};
use shelfsync_hardcover::client::HardcoverClient;
use shelfsync_ratelimit::AdaptiveRateLimiter;
use shelfsync_sync::{Orchestrator, RunOutcome, SyncEngine};

/// Point-in-time view of one profile's run state, for status queries.
#[derive(Debug, Clone)]
pub struct ProfileRunStatus {
    pub profile: Profile,
    pub is_running: bool,
}

/// The external control surface consumed by the (out-of-scope) HTTP layer.
#[async_trait]
pub trait CoordinatorHandle: Send + Sync {
    async fn start_sync(&self, profile_id: &ProfileId) -> Result<RunOutcome>;
    async fn cancel_sync(&self, profile_id: &ProfileId) -> Result<bool>;
    async fn get_status(&self, profile_id: &ProfileId) -> Result<ProfileRunStatus>;
    async fn list_profiles(&self) -> Result<Vec<Profile>>;
    async fn create_profile(&self, profile: Profile) -> Result<()>;
    async fn update_profile(&self, profile: Profile) -> Result<()>;
    async fn delete_profile(&self, profile_id: &ProfileId) -> Result<()>;
    async fn update_sync_config(&self, profile_id: &ProfileId, sync_config: SyncConfig) -> Result<()>;
}

/// Dependencies shared by every profile's [`Orchestrator`]: the HC-side
/// caches (keyed internally by profile id where it matters), the sync-state
/// store, and the two target rate limiters. A profile's ABS/HC clients are
/// the only pieces that differ per profile (distinct server + tokens), so
/// those are built lazily per profile rather than shared here.
pub struct SharedAdapters {
    pub asin_cache: Arc<dyn IAsinCache>,
    pub edition_cache: Arc<dyn IEditionCache>,
    pub user_book_cache: Arc<dyn IUserBookCache>,
    pub state_store: Arc<dyn ISyncStateStore>,
    pub hc_limiter: Arc<AdaptiveRateLimiter>,
    pub abs_limiter: Arc<AdaptiveRateLimiter>,
}

/// Per-profile run lease, cancellation token, and lazily-built
/// [`Orchestrator`]. One `Orchestrator` is built per profile (each profile
/// points at a different Audiobookshelf server and carries its own tokens)
/// and cached for reuse across runs.
pub struct Coordinator {
    profiles: Arc<dyn IProfileRepository>,
    adapters: SharedAdapters,
    orchestrators: DashMap<ProfileId, Arc<Orchestrator>>,
    leases: DashMap<ProfileId, Arc<AtomicBool>>,
    cancels: DashMap<ProfileId, CancellationToken>,
    schedulers: DashMap<ProfileId, JoinHandle<()>>,
}

impl Coordinator {
    pub fn new(profiles: Arc<dyn IProfileRepository>, adapters: SharedAdapters) -> Self {
        Self {
            profiles,
            adapters,
            orchestrators: DashMap::new(),
            leases: DashMap::new(),
            cancels: DashMap::new(),
            schedulers: DashMap::new(),
        }
    }

    /// Builds (or returns the cached) orchestrator for a profile.
    /// `update_profile` evicts the cache entry for the profile it touches,
    /// so a credential rotation takes effect on the profile's next run
    /// instead of requiring a coordinator restart.
    fn orchestrator_for(&self, profile: &Profile) -> Arc<Orchestrator> {
        if let Some(existing) = self.orchestrators.get(profile.id()) {
            return existing.clone();
        }

        let abs = Arc::new(
            AbsClient::new(profile.abs_base_url(), profile.abs_token())
                .with_rate_limiter(self.adapters.abs_limiter.clone()),
        );
        let hardcover = Arc::new(
            HardcoverClient::new(profile.hc_token()).with_rate_limiter(self.adapters.hc_limiter.clone()),
        );
        let engine = Arc::new(SyncEngine::new(
            hardcover.clone(),
            self.adapters.asin_cache.clone(),
            self.adapters.edition_cache.clone(),
            self.adapters.user_book_cache.clone(),
        ));
        let orchestrator = Arc::new(Orchestrator::new(
            abs,
            hardcover,
            engine,
            self.adapters.state_store.clone(),
            self.adapters.hc_limiter.clone(),
        ));
        self.orchestrators.insert(profile.id().clone(), orchestrator.clone());
        orchestrator
    }

    fn lease_for(&self, profile_id: &ProfileId) -> Arc<AtomicBool> {
        self.leases.entry(profile_id.clone()).or_insert_with(|| Arc::new(AtomicBool::new(false))).clone()
    }

    fn cancel_token_for(&self, profile_id: &ProfileId) -> CancellationToken {
        self.cancels.entry(profile_id.clone()).or_insert_with(CancellationToken::new).clone()
    }

    /// Spawns a periodic scheduler for one profile, deriving the interval
    /// from its current `syncInterval`. Re-reads the profile on every tick
    /// so an interval change via [`CoordinatorHandle::update_sync_config`]
    /// takes effect without a respawn. A profile already scheduled is a
    /// no-op.
    pub fn start_profile_scheduler(self: &Arc<Self>, profile_id: ProfileId) {
        if self.schedulers.contains_key(&profile_id) {
            return;
        }
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                let interval_secs = match this.profiles.get(&profile_id).await {
                    Ok(Some(p)) => p.sync_config().sync_interval_secs.max(1),
                    Ok(None) => {
                        info!(profile_id = %profile_id, "profile deleted, stopping scheduler");
                        return;
                    }
                    Err(err) => {
                        warn!(profile_id = %profile_id, error = %err, "failed to load profile for scheduling, retrying in 60s");
                        60
                    }
                };
                tokio::time::sleep(Duration::from_secs(interval_secs)).await;
                if let Err(err) = this.start_sync(&profile_id).await {
                    warn!(profile_id = %profile_id, error = %err, "scheduled run failed");
                }
            }
        });
        self.schedulers.insert(profile_id, handle);
    }

    /// Stops a profile's periodic scheduler without cancelling any run
    /// currently in flight.
    pub fn stop_profile_scheduler(&self, profile_id: &ProfileId) {
        if let Some((_, handle)) = self.schedulers.remove(profile_id) {
            handle.abort();
        }
    }
}

#[async_trait]
impl CoordinatorHandle for Coordinator {
    #[tracing::instrument(skip(self), fields(profile_id = %profile_id))]
    async fn start_sync(&self, profile_id: &ProfileId) -> Result<RunOutcome> {
        let mut profile = self.profiles.get(profile_id).await?.with_context(|| format!("profile {profile_id} not found"))?;

        if !profile.can_start_run() {
            return Ok(RunOutcome::AlreadyRunning);
        }

        let lease = self.lease_for(profile_id);
        let cancel = self.cancel_token_for(profile_id);

        profile.mark_running();
        self.profiles.save(&profile).await?;

        let orchestrator = self.orchestrator_for(&profile);
        match orchestrator.run(&profile, &lease, &cancel).await {
            Ok((outcome, _summary)) => {
                match outcome {
                    RunOutcome::Completed => profile.mark_idle(Utc::now()),
                    RunOutcome::Cancelled => profile.mark_cancelled(),
                    RunOutcome::AlreadyRunning => {}
                }
                self.profiles.save(&profile).await?;
                Ok(outcome)
            }
            Err(err) => {
                profile.mark_error(err.to_string());
                self.profiles.save(&profile).await?;
                Err(err)
            }
        }
    }

    async fn cancel_sync(&self, profile_id: &ProfileId) -> Result<bool> {
        let Some(token) = self.cancels.get(profile_id).map(|t| t.clone()) else {
            return Ok(false);
        };
        let was_running = self.leases.get(profile_id).map(|l| l.load(Ordering::Acquire)).unwrap_or(false);
        token.cancel();
        // A cancelled token must not linger and pre-cancel the profile's next run.
        self.cancels.insert(profile_id.clone(), CancellationToken::new());
        Ok(was_running)
    }

    async fn get_status(&self, profile_id: &ProfileId) -> Result<ProfileRunStatus> {
        let profile = self.profiles.get(profile_id).await?.with_context(|| format!("profile {profile_id} not found"))?;
        let is_running = self.leases.get(profile_id).map(|l| l.load(Ordering::Acquire)).unwrap_or(false);
        Ok(ProfileRunStatus { profile, is_running })
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>> {
        self.profiles.list().await
    }

    async fn create_profile(&self, profile: Profile) -> Result<()> {
        self.profiles.save(&profile).await
    }

    async fn update_profile(&self, profile: Profile) -> Result<()> {
        self.orchestrators.remove(profile.id());
        self.profiles.save(&profile).await
    }

    async fn delete_profile(&self, profile_id: &ProfileId) -> Result<()> {
        self.stop_profile_scheduler(profile_id);
        self.cancels.remove(profile_id);
        self.leases.remove(profile_id);
        self.orchestrators.remove(profile_id);
        self.profiles.delete(profile_id).await
    }

    async fn update_sync_config(&self, profile_id: &ProfileId, sync_config: SyncConfig) -> Result<()> {
        let mut profile = self.profiles.get(profile_id).await?.with_context(|| format!("profile {profile_id} not found"))?;
        *profile.sync_config_mut() = sync_config;
        self.profiles.save(&profile).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use shelfsync_core::domain::{ProfileStatus, SyncState};
    use shelfsync_core::ports::abs_client::{AbsLibrary, AbsLibraryItem, AbsListeningSession, AbsMediaProgress};
    use shelfsync_core::ports::hardcover_client::{BookMatch, NewRead, NewUserBook};
    use shelfsync_core::domain::{BookId, EditionId, EditionRecord, ReadRecord, ReadRecordId, ReadingStatus, UserBookId, UserBookState};

    struct FakeProfileRepo {
        profiles: Mutex<std::collections::HashMap<ProfileId, Profile>>,
    }

    impl FakeProfileRepo {
        fn new(profile: Profile) -> Self {
            let mut map = std::collections::HashMap::new();
            map.insert(profile.id().clone(), profile);
            Self { profiles: Mutex::new(map) }
        }
    }

    #[async_trait]
    impl IProfileRepository for FakeProfileRepo {
        async fn save(&self, profile: &Profile) -> Result<()> {
            self.profiles.lock().unwrap().insert(profile.id().clone(), profile.clone());
            Ok(())
        }

        async fn get(&self, id: &ProfileId) -> Result<Option<Profile>> {
            Ok(self.profiles.lock().unwrap().get(id).cloned())
        }

        async fn list(&self) -> Result<Vec<Profile>> {
            Ok(self.profiles.lock().unwrap().values().cloned().collect())
        }

        async fn delete(&self, id: &ProfileId) -> Result<()> {
            self.profiles.lock().unwrap().remove(id);
            Ok(())
        }
    }

    /// An ABS client with no libraries, used to exercise a run with zero
    /// candidates end to end.
    struct EmptyAbsClient;

    #[async_trait]
    impl shelfsync_core::ports::IAbsClient for EmptyAbsClient {
        async fn list_libraries(&self) -> Result<Vec<AbsLibrary>> {
            Ok(Vec::new())
        }
        async fn list_library_items(&self, _library_id: &str) -> Result<Vec<AbsLibraryItem>> {
            Ok(Vec::new())
        }
        async fn get_media_progress(&self) -> Result<Vec<AbsMediaProgress>> {
            Ok(Vec::new())
        }
        async fn list_listening_sessions_since(&self, _since_ms: i64) -> Result<Vec<AbsListeningSession>> {
            Ok(Vec::new())
        }
    }

    /// A Hardcover client stub whose only exercised method in an
    /// empty-candidate run is `current_username`.
    struct StubHardcoverClient;

    #[async_trait]
    impl shelfsync_core::ports::IHardcoverClient for StubHardcoverClient {
        async fn current_username(&self) -> Result<String> {
            Ok("test-user".to_string())
        }
        async fn find_by_asin(&self, _asin: &str) -> Result<Option<BookMatch>> {
            Ok(None)
        }
        async fn find_by_isbn13(&self, _isbn13: &str) -> Result<Option<BookMatch>> {
            Ok(None)
        }
        async fn find_by_isbn10(&self, _isbn10: &str) -> Result<Option<BookMatch>> {
            Ok(None)
        }
        async fn find_by_title_author(&self, _title: &str, _author: &str) -> Result<Option<BookMatch>> {
            Ok(None)
        }
        async fn get_user_book(&self, _username: &str, _book_id: BookId) -> Result<Option<UserBookState>> {
            Ok(None)
        }
        async fn get_read(&self, _user_book_id: UserBookId, _read_id: ReadRecordId) -> Result<Option<ReadRecord>> {
            Ok(None)
        }
        async fn fetch_edition(&self, _edition_id: EditionId) -> Result<Option<EditionRecord>> {
            Ok(None)
        }
        async fn insert_user_book(&self, _new_user_book: NewUserBook) -> Result<UserBookId> {
            unreachable!("no candidates in this test")
        }
        async fn update_user_book_status(&self, _user_book_id: UserBookId, _status: ReadingStatus) -> Result<()> {
            unreachable!("no candidates in this test")
        }
        async fn insert_user_book_read(&self, _user_book_id: UserBookId, _new_read: NewRead) -> Result<ReadRecordId> {
            unreachable!("no candidates in this test")
        }
        async fn update_user_book_read(&self, _read_id: ReadRecordId, _read: &ReadRecord) -> Result<()> {
            unreachable!("no candidates in this test")
        }
        async fn mark_edition_owned(&self, _edition_id: EditionId) -> Result<()> {
            unreachable!("no candidates in this test")
        }
    }

    struct InMemoryStateStore {
        states: Mutex<std::collections::HashMap<ProfileId, SyncState>>,
    }

    impl InMemoryStateStore {
        fn new() -> Self {
            Self { states: Mutex::new(std::collections::HashMap::new()) }
        }
    }

    #[async_trait]
    impl shelfsync_core::ports::ISyncStateStore for InMemoryStateStore {
        async fn load(&self, profile_id: &ProfileId) -> Result<SyncState> {
            Ok(self.states.lock().unwrap().get(profile_id).cloned().unwrap_or_else(SyncState::initial))
        }
        async fn save(&self, profile_id: &ProfileId, state: &SyncState) -> Result<()> {
            self.states.lock().unwrap().insert(profile_id.clone(), state.clone());
            Ok(())
        }
    }

    fn test_profile() -> Profile {
        Profile::new(
            ProfileId::new("p1").unwrap(),
            "Alice",
            "https://abs.example.com",
            "abs-token".to_string(),
            "hc-token".to_string(),
            SyncConfig::default(),
        )
    }

    fn test_coordinator(profile: Profile) -> Coordinator {
        let repo: Arc<dyn IProfileRepository> = Arc::new(FakeProfileRepo::new(profile));
        let adapters = SharedAdapters {
            asin_cache: Arc::new(shelfsync_cache::InMemoryAsinCache::new()),
            edition_cache: Arc::new(shelfsync_cache::InMemoryEditionCache::new()),
            user_book_cache: Arc::new(shelfsync_cache::InMemoryUserBookCache::new()),
            state_store: Arc::new(InMemoryStateStore::new()),
            hc_limiter: Arc::new(AdaptiveRateLimiter::with_defaults()),
            abs_limiter: Arc::new(AdaptiveRateLimiter::with_defaults()),
        };
        Coordinator::new(repo, adapters)
    }

    #[tokio::test]
    async fn start_sync_with_no_candidates_completes_and_marks_idle() {
        let profile = test_profile();
        let id = profile.id().clone();
        let coordinator = test_coordinator(profile);

        // Swap in the empty-candidate fakes via a fresh orchestrator built
        // by hand, since `orchestrator_for` always builds real HTTP clients.
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::new(EmptyAbsClient),
            Arc::new(StubHardcoverClient),
            Arc::new(SyncEngine::new(
                Arc::new(StubHardcoverClient),
                Arc::new(shelfsync_cache::InMemoryAsinCache::new()),
                Arc::new(shelfsync_cache::InMemoryEditionCache::new()),
                Arc::new(shelfsync_cache::InMemoryUserBookCache::new()),
            )),
            coordinator.adapters.state_store.clone(),
            coordinator.adapters.hc_limiter.clone(),
        ));
        coordinator.orchestrators.insert(id.clone(), orchestrator);

        let outcome = coordinator.start_sync(&id).await.unwrap();
        assert_eq!(outcome, RunOutcome::Completed);

        let status = coordinator.get_status(&id).await.unwrap();
        assert_eq!(*status.profile.status(), ProfileStatus::Idle);
        assert!(!status.is_running);
    }

    #[tokio::test]
    async fn cancel_sync_on_unknown_profile_returns_false() {
        let profile = test_profile();
        let id = profile.id().clone();
        let coordinator = test_coordinator(profile);
        assert!(!coordinator.cancel_sync(&id).await.unwrap());
    }

    #[tokio::test]
    async fn delete_profile_removes_scheduling_state() {
        let profile = test_profile();
        let id = profile.id().clone();
        let coordinator = test_coordinator(profile);

        coordinator.leases.insert(id.clone(), Arc::new(AtomicBool::new(false)));
        coordinator.cancels.insert(id.clone(), CancellationToken::new());

        coordinator.delete_profile(&id).await.unwrap();

        assert!(!coordinator.leases.contains_key(&id));
        assert!(!coordinator.cancels.contains_key(&id));
        assert!(coordinator.profiles.get(&id).await.unwrap().is_none());
    }
}
