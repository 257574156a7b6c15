//! Per-profile sync orchestrator.
//!
//! Drives one profile through a full run: mode decision (full vs
//! incremental), candidate fetch and filtering, per-book dispatch through
//! the [`SyncEngine`] under the Hardcover rate limiter, mismatch
//! collection, and atomic `SyncState` persistence. One call to [`Orchestrator::run`]
//! is one run; the multi-profile coordinator owns scheduling and the
//! per-profile run lease passed in.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use shelfsync_core::domain::{Audiobook, IncrementalMode, Profile, SyncConfig};
use shelfsync_core::ports::{
    AbsItemMetadata, AbsLibrary, AbsLibraryItem, AbsMediaProgress, IAbsClient, IHardcoverClient,
    ISyncStateStore,
};
use shelfsync_ratelimit::AdaptiveRateLimiter;

use crate::engine::{SyncAction, SyncEngine};
use crate::mismatch_collector::MismatchCollector;
use crate::retry::with_retry;

/// How long a watermark may go unrefreshed by a full sync before the next
/// run is forced to go full regardless of incremental mode.
const FULL_SYNC_MAX_AGE_MS: i64 = 7 * 24 * 3600 * 1000;

/// Clock-skew buffer subtracted from the watermark before querying ABS for
/// incremental candidates.
const CLOCK_SKEW_BUFFER_MS: i64 = 5 * 60 * 1000;

/// ABS media type denoting an audiobook item.
const MEDIA_TYPE_AUDIOBOOK: &str = "book";
const MEDIA_TYPE_EBOOK: &str = "ebook";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    AlreadyRunning,
    Cancelled,
}

/// Structured summary of one run, suitable for a single `tracing::info!`
/// at the end of [`Orchestrator::run`].
#[derive(Debug, Default)]
pub struct RunSummary {
    pub was_full_sync: bool,
    pub total_candidates: usize,
    pub synced: usize,
    pub skipped: Vec<(String, String)>,
    pub failed: Vec<(String, String)>,
    pub mismatches: usize,
}

pub struct Orchestrator {
    abs: Arc<dyn IAbsClient>,
    hardcover: Arc<dyn IHardcoverClient>,
    engine: Arc<SyncEngine>,
    state_store: Arc<dyn ISyncStateStore>,
    hc_limiter: Arc<AdaptiveRateLimiter>,
}

impl Orchestrator {
    pub fn new(
        abs: Arc<dyn IAbsClient>,
        hardcover: Arc<dyn IHardcoverClient>,
        engine: Arc<SyncEngine>,
        state_store: Arc<dyn ISyncStateStore>,
        hc_limiter: Arc<AdaptiveRateLimiter>,
    ) -> Self {
        Self { abs, hardcover, engine, state_store, hc_limiter }
    }

    /// Runs one profile to completion, honoring the run lease and
    /// cooperative cancellation.
    ///
    /// `lease` is a per-profile flag owned by the coordinator; this method
    /// claims it at the start and always releases it before returning,
    /// including on error.
    #[tracing::instrument(skip(self, profile, lease, cancel), fields(profile_id = %profile.id()))]
    pub async fn run(
        &self,
        profile: &Profile,
        lease: &Arc<AtomicBool>,
        cancel: &CancellationToken,
    ) -> Result<(RunOutcome, Option<RunSummary>)> {
        if lease.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            info!("run already in progress for this profile, skipping");
            return Ok((RunOutcome::AlreadyRunning, None));
        }

        let result = self.run_locked(profile, cancel).await;
        lease.store(false, Ordering::Release);

        let (outcome, summary) = result?;
        Ok((outcome, Some(summary)))
    }

    async fn run_locked(
        &self,
        profile: &Profile,
        cancel: &CancellationToken,
    ) -> Result<(RunOutcome, RunSummary)> {
        let cfg = profile.sync_config();
        let username = with_retry("hardcover.current_username", || self.hardcover.current_username()).await?;
        let mut state = self.state_store.load(profile.id()).await?;

        let mut is_full = cfg.force_full_sync
            || !state.has_baseline()
            || matches!(cfg.incremental_mode, IncrementalMode::Disabled)
            || Utc::now().timestamp_millis() - state.last_full_sync_ms() > FULL_SYNC_MAX_AGE_MS;

        let candidate_ids = if is_full {
            None
        } else {
            let since_ms = state.last_sync_timestamp_ms() - CLOCK_SKEW_BUFFER_MS;
            match with_retry("abs.list_listening_sessions_since", || {
                self.abs.list_listening_sessions_since(since_ms)
            })
            .await
            {
                Ok(sessions) => Some(sessions.into_iter().map(|s| s.library_item_id).collect::<HashSet<_>>()),
                Err(err) => {
                    warn!(error = %err, "incremental listening-sessions query failed, falling back to full sync");
                    None
                }
            }
        };
        if candidate_ids.is_none() {
            is_full = true;
        }

        let mut summary = RunSummary { was_full_sync: is_full, ..Default::default() };

        let libraries = with_retry("abs.list_libraries", || self.abs.list_libraries()).await?;
        let mut items = Vec::new();
        for library in &libraries {
            if !library_included(library, &cfg.library_include, &cfg.library_exclude) {
                continue;
            }
            let library_items =
                with_retry("abs.list_library_items", || self.abs.list_library_items(&library.id)).await?;
            items.extend(library_items.into_iter().filter(|item| media_type_included(item, cfg)));
        }
        if let Some(ids) = &candidate_ids {
            items.retain(|item| ids.contains(&item.id));
        }

        let progress_by_item: HashMap<String, AbsMediaProgress> =
            with_retry("abs.get_media_progress", || self.abs.get_media_progress())
                .await?
                .into_iter()
                .map(|p| (p.library_item_id.clone(), p))
                .collect();

        summary.total_candidates = items.len();

        let mut collector = MismatchCollector::new(cfg.mismatch_output_dir.clone());

        for item in &items {
            if cancel.is_cancelled() {
                info!("cancellation observed at book boundary, stopping run without advancing watermark");
                return Ok((RunOutcome::Cancelled, summary));
            }

            let book = normalize(item, progress_by_item.get(&item.id));

            if !passes_prefilters(&book, cfg) {
                summary.skipped.push((book.id().to_string(), "below progress/unread filters".to_string()));
                continue;
            }

            let _permit = self.hc_limiter.acquire("sync_book").await;
            match self.engine.sync_book(profile, &username, &book).await {
                Ok(outcome) => {
                    if let Some(mismatch) = outcome.mismatch {
                        collector.push(mismatch);
                    }
                    match outcome.action {
                        SyncAction::SkippedNoMatch | SyncAction::SkippedMismatchMode => {
                            summary.skipped.push((book.id().to_string(), "no match or mismatch-mode skip".to_string()));
                        }
                        SyncAction::SkippedUpToDate => {
                            summary.skipped.push((book.id().to_string(), "up to date".to_string()));
                        }
                        _ => summary.synced += 1,
                    }
                }
                Err(err) => {
                    warn!(audiobookshelf_id = %book.id(), error = %err, "book sync failed, continuing run");
                    summary.failed.push((book.id().to_string(), err.to_string()));
                }
            }
        }

        summary.mismatches = collector.len();
        collector.flush().await;

        if cfg.dry_run {
            info!(
                total = summary.total_candidates,
                synced = summary.synced,
                skipped = summary.skipped.len(),
                failed = summary.failed.len(),
                mismatches = summary.mismatches,
                "dry run complete, sync state not persisted"
            );
            return Ok((RunOutcome::Completed, summary));
        }

        let finished_at_ms = Utc::now().timestamp_millis();
        if is_full {
            state.record_full(finished_at_ms);
        } else {
            state.record_incremental(finished_at_ms);
        }
        self.state_store.save(profile.id(), &state).await?;

        info!(
            total = summary.total_candidates,
            synced = summary.synced,
            skipped = summary.skipped.len(),
            failed = summary.failed.len(),
            mismatches = summary.mismatches,
            full_sync = is_full,
            "run complete"
        );

        Ok((RunOutcome::Completed, summary))
    }
}

/// Include wins over exclude; both match case-insensitively on name or
/// exactly on id. Empty include means "all libraries not excluded".
fn library_included(library: &AbsLibrary, include: &[String], exclude: &[String]) -> bool {
    let name_or_id_matches = |entries: &[String]| {
        entries.iter().any(|entry| entry.eq_ignore_ascii_case(&library.name) || entry == &library.id)
    };
    if !include.is_empty() {
        return name_or_id_matches(include);
    }
    !name_or_id_matches(exclude)
}

fn media_type_included(item: &AbsLibraryItem, cfg: &SyncConfig) -> bool {
    match item.media_type.as_str() {
        MEDIA_TYPE_AUDIOBOOK => true,
        MEDIA_TYPE_EBOOK => cfg.include_ebooks,
        _ => false,
    }
}

/// Whether a zero-progress or sub-threshold item is a candidate for this
/// run. Zero-progress handling is governed solely by `syncWantToRead` and
/// `processUnreadBooks`; non-zero progress below `minProgressThreshold` is
/// excluded (the OR interpretation of the two knobs: a book is a
/// candidate if it is zero-progress-and-wanted, or its progress clears
/// the threshold).
fn passes_prefilters(book: &Audiobook, cfg: &SyncConfig) -> bool {
    if book.progress() == 0.0 {
        return cfg.process_unread_books && cfg.sync_want_to_read;
    }
    book.progress() >= cfg.min_progress_threshold
}

/// Merges an ABS library item with its (possibly absent) progress record
/// into the normalized domain type the engine reasons over.
fn normalize(item: &AbsLibraryItem, progress: Option<&AbsMediaProgress>) -> Audiobook {
    let meta: &AbsItemMetadata = &item.metadata;

    let (item_progress, current_time, is_finished, finished_at) = match progress {
        Some(p) => (p.progress, p.current_time_seconds, p.is_finished, p.finished_at.map(|dt| dt.date_naive())),
        None => (0.0, 0.0, false, None),
    };

    Audiobook::new(
        item.id.clone(),
        item.library_id.clone(),
        meta.title.clone(),
        meta.author_name.clone(),
        item_progress.clamp(0.0, 1.0),
        current_time,
        item.duration_seconds,
        is_finished,
    )
    .expect("progress is clamped into [0, 1] above")
    .with_identifiers(meta.asin.clone(), meta.isbn_13.clone(), meta.isbn.clone())
    .with_finished_at(finished_at)
    .with_metadata(shelfsync_core::domain::AudiobookMetadata {
        subtitle: meta.subtitle.clone(),
        narrators: meta.narrators.clone(),
        publisher: meta.publisher.clone(),
        published_date: meta.published_date.clone(),
        duration_seconds: Some(item.duration_seconds),
        language: meta.language.clone(),
        genres: meta.genres.clone(),
        cover_url: item.cover_url.clone(),
    })
}
