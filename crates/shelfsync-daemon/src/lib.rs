//! ShelfSync background synchronization daemon.
//!
//! [`run`] is the daemon's full bootstrap: it loads configuration, builds
//! the adapter stack (profile repository, secret store, sync-state store,
//! caches, rate limiters), wires a [`shelfsync_coordinator::Coordinator`],
//! starts every profile's scheduler, and blocks until a shutdown signal
//! arrives. It is exposed as a library so `shelfsync-cli`'s `run`
//! subcommand can start the daemon in the foreground without duplicating
//! this wiring.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use shelfsync_cache::{InMemoryAsinCache, InMemoryEditionCache, InMemoryUserBookCache};
use shelfsync_coordinator::{Coordinator, CoordinatorHandle, SharedAdapters};
use shelfsync_core::config::Config;
use shelfsync_core::ports::IProfileRepository;
use shelfsync_ratelimit::{AdaptiveRateLimiter, RateLimitConfig};
use shelfsync_secrets::AeadSecretStore;
use shelfsync_store::{DatabasePool, FileSyncStateStore, SqliteProfileRepository};

fn rate_limit_config(requests_per_minute: u32, burst: u32) -> RateLimitConfig {
    RateLimitConfig {
        default_capacity: burst,
        default_refill_rate: requests_per_minute as f64 / 60.0,
        endpoint_overrides: HashMap::new(),
        max_retries: 5,
    }
}

/// Builds the full adapter stack from `config` and wires a [`Coordinator`]
/// over it. Exposed separately from [`run`] so callers (tests, or a future
/// HTTP layer) can reuse the coordinator without taking over the process.
pub async fn build_coordinator(config: &Config) -> anyhow::Result<Arc<Coordinator>> {
    std::fs::create_dir_all(&config.daemon.data_dir).with_context(|| {
        format!("failed to create data directory {}", config.daemon.data_dir.display())
    })?;

    let key_path = config
        .daemon
        .encryption_key_path
        .clone()
        .unwrap_or_else(|| shelfsync_secrets::default_key_path(&config.daemon.data_dir));
    let secrets = Arc::new(AeadSecretStore::load_or_generate(&key_path)?);

    let pool = DatabasePool::new(&config.database.path).await?;
    let profiles: Arc<dyn IProfileRepository> =
        Arc::new(SqliteProfileRepository::new(pool.pool().clone(), secrets.clone()));

    let state_store = Arc::new(FileSyncStateStore::new(config.daemon.data_dir.join("state")));

    let hc_limiter = Arc::new(AdaptiveRateLimiter::new(rate_limit_config(
        config.rate_limiting.hc_requests_per_minute,
        config.rate_limiting.hc_burst,
    )));
    let abs_limiter = Arc::new(AdaptiveRateLimiter::new(rate_limit_config(
        config.rate_limiting.abs_requests_per_minute,
        config.rate_limiting.abs_burst,
    )));

    let adapters = SharedAdapters {
        asin_cache: Arc::new(InMemoryAsinCache::new()),
        edition_cache: Arc::new(InMemoryEditionCache::new()),
        user_book_cache: Arc::new(InMemoryUserBookCache::new()),
        state_store,
        hc_limiter,
        abs_limiter,
    };

    Ok(Arc::new(Coordinator::new(profiles, adapters)))
}

/// Runs the daemon to completion: starts every profile's scheduler and
/// blocks until `Ctrl-C` (or the process's signal handler equivalent) is
/// received, then lets in-flight runs finish before returning.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let coordinator = build_coordinator(&config).await?;

    let profiles = coordinator.list_profiles().await?;
    info!(profile_count = profiles.len(), "starting profile schedulers");
    for profile in &profiles {
        coordinator.start_profile_scheduler(profile.id().clone());
    }

    tokio::signal::ctrl_c().await.context("failed to install ctrl-c handler")?;
    info!("shutdown signal received");

    Ok(())
}
