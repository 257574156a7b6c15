//! Sync decision engine.
//!
//! Given one normalized [`Audiobook`] and the owning profile's context,
//! [`SyncEngine::sync_book`] resolves a Hardcover match, derives the target
//! reading state, and applies the minimal set of mutations needed to bring
//! Hardcover in line with Audiobookshelf. One call handles exactly one book;
//! the orchestrator fans this out across a library under the Hardcover rate
//! limiter.

use std::sync::Arc;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use tracing::warn;

use shelfsync_core::domain::duration_norm::target_progress_seconds;
use shelfsync_core::domain::{
    Audiobook, AudiobookMatchMode, BookId, EditionId, Mismatch, Profile, ProfileId, ReadingStatus, SyncConfig,
    UserBookState, AUDIOBOOK_READING_FORMAT_ID,
};
use shelfsync_core::ports::{
    AsinLookup, BookMatch, IAsinCache, IEditionCache, IHardcoverClient, IUserBookCache, NewRead, NewUserBook,
};

use crate::retry::with_retry;
use crate::title_normalize::normalize_title;

/// What the engine actually did (or would do, in dry-run mode) for one book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Created,
    Updated,
    OwnedMarked,
    SkippedUpToDate,
    SkippedNoMatch,
    SkippedMismatchMode,
    WouldCreate,
    WouldUpdate,
    WouldMarkOwned,
}

/// Result of processing a single book: the action taken, plus an optional
/// mismatch surfaced alongside it (a book can both sync and carry a
/// mismatch, e.g. a non-audiobook edition match under `audiobookMatchMode =
/// continue`).
#[derive(Debug)]
pub struct BookOutcome {
    pub action: SyncAction,
    pub mismatch: Option<Mismatch>,
}

impl BookOutcome {
    fn mismatch_only(mismatch: Mismatch) -> Self {
        Self {
            action: SyncAction::SkippedNoMatch,
            mismatch: Some(mismatch),
        }
    }
}

pub struct SyncEngine {
    hardcover: Arc<dyn IHardcoverClient>,
    asin_cache: Arc<dyn IAsinCache>,
    edition_cache: Arc<dyn IEditionCache>,
    user_book_cache: Arc<dyn IUserBookCache>,
}

impl SyncEngine {
    pub fn new(
        hardcover: Arc<dyn IHardcoverClient>,
        asin_cache: Arc<dyn IAsinCache>,
        edition_cache: Arc<dyn IEditionCache>,
        user_book_cache: Arc<dyn IUserBookCache>,
    ) -> Self {
        Self {
            hardcover,
            asin_cache,
            edition_cache,
            user_book_cache,
        }
    }

    /// Runs the full matching/decision/mutation pipeline for one book.
    ///
    /// Returns `Err` only when `audiobookMatchMode == fail` and an
    /// ambiguous match is hit; the caller (orchestrator) treats that as a
    /// whole-run abort. Every other failure mode is represented in the
    /// returned [`BookOutcome`].
    #[tracing::instrument(skip(self, profile, book), fields(audiobookshelf_id = %book.id()))]
    pub async fn sync_book(&self, profile: &Profile, username: &str, book: &Audiobook) -> Result<BookOutcome> {
        let cfg = profile.sync_config();

        let Some(resolved) = self.resolve_match(book).await? else {
            return Ok(BookOutcome::mismatch_only(build_mismatch(
                book,
                "no match found for asin/isbn/title+author",
                None,
            )));
        };

        if let Some(edition_id) = resolved.edition_id {
            self.warm_edition_cache(edition_id).await?;
        }

        let mut carried_mismatch = None;
        if resolved.edition_id.is_none() {
            let reason =
                "book matched but no audiobook edition found; progress may sync to a non-audiobook edition";
            match cfg.audiobook_match_mode {
                AudiobookMatchMode::Fail => {
                    anyhow::bail!("audiobookMatchMode=fail: {reason} for '{}'", book.title());
                }
                AudiobookMatchMode::Skip => {
                    return Ok(BookOutcome {
                        action: SyncAction::SkippedMismatchMode,
                        mismatch: Some(build_mismatch(book, reason, Some(resolved.book_id))),
                    });
                }
                AudiobookMatchMode::Continue => {
                    carried_mismatch = Some(build_mismatch(book, reason, Some(resolved.book_id)));
                }
            }
        }

        let existing = self.load_user_book_state(profile.id(), username, resolved.book_id).await?;

        let target_status = target_status_id(book, cfg.sync_want_to_read);
        let target_progress = target_progress_seconds(
            book.current_time_seconds(),
            book.total_duration_seconds(),
            book.progress(),
        );
        let target_owned = cfg.sync_owned;

        let action = self
            .decide_and_mutate(
                profile,
                resolved.book_id,
                resolved.edition_id,
                existing,
                target_status,
                target_progress,
                target_owned,
                book,
                cfg,
            )
            .await?;

        Ok(BookOutcome {
            action,
            mismatch: carried_mismatch,
        })
    }

    /// Step 1: resolve `(bookId, editionId)` by ASIN, then isbn13, isbn10,
    /// then title+author (verbatim, then normalized).
    async fn resolve_match(&self, book: &Audiobook) -> Result<Option<BookMatch>> {
        if let Some(asin) = book.asin() {
            if let Some(m) = self.lookup_asin(asin).await? {
                return Ok(Some(m));
            }
        }

        if let Some(isbn13) = book.isbn13() {
            if Some(isbn13) != book.asin() {
                if let Some(m) = with_retry("hardcover.find_by_isbn13", || self.hardcover.find_by_isbn13(isbn13)).await? {
                    return Ok(Some(m));
                }
            }
        }

        if let Some(isbn10) = book.isbn10() {
            if let Some(m) = with_retry("hardcover.find_by_isbn10", || self.hardcover.find_by_isbn10(isbn10)).await? {
                return Ok(Some(m));
            }
        }

        if let Some(m) = with_retry("hardcover.find_by_title_author", || {
            self.hardcover.find_by_title_author(book.title(), book.author())
        })
        .await?
        {
            return Ok(Some(m));
        }

        let normalized_title = normalize_title(book.title());
        if normalized_title != book.title().to_lowercase() {
            if let Some(m) = with_retry("hardcover.find_by_title_author_normalized", || {
                self.hardcover.find_by_title_author(&normalized_title, book.author())
            })
            .await?
            {
                return Ok(Some(m));
            }
        }

        Ok(None)
    }

    async fn lookup_asin(&self, asin: &str) -> Result<Option<BookMatch>> {
        if let Some(cached) = self.asin_cache.get(asin).await {
            return Ok(match cached {
                AsinLookup::Found { book_id, edition_id } => Some(BookMatch { book_id, edition_id }),
                AsinLookup::NotFound => None,
            });
        }

        match with_retry("hardcover.find_by_asin", || self.hardcover.find_by_asin(asin)).await? {
            Some(m) => {
                self.asin_cache
                    .put(asin, AsinLookup::Found { book_id: m.book_id, edition_id: m.edition_id })
                    .await;
                Ok(Some(m))
            }
            None => {
                self.asin_cache.put(asin, AsinLookup::NotFound).await;
                Ok(None)
            }
        }
    }

    /// Step 3: load the existing `user_book` snapshot, cache-first.
    async fn load_user_book_state(
        &self,
        profile_id: &ProfileId,
        username: &str,
        book_id: BookId,
    ) -> Result<Option<UserBookState>> {
        if let Some(cached) = self.user_book_cache.get(profile_id, book_id).await {
            return Ok(Some(cached));
        }

        let state = with_retry("hardcover.get_user_book", || self.hardcover.get_user_book(username, book_id)).await?;
        if let Some(ref s) = state {
            self.user_book_cache.put(profile_id, book_id, s.clone()).await;
        }
        Ok(state)
    }

    /// Steps 5 & 6: decide what to do given the target state, and apply it.
    #[allow(clippy::too_many_arguments)]
    async fn decide_and_mutate(
        &self,
        profile: &Profile,
        book_id: BookId,
        edition_id: Option<EditionId>,
        existing: Option<UserBookState>,
        target_status: ReadingStatus,
        target_progress: i64,
        target_owned: bool,
        book: &Audiobook,
        cfg: &SyncConfig,
    ) -> Result<SyncAction> {
        let threshold = (cfg.min_change_threshold_secs as i64).max((0.1 * target_progress as f64).round() as i64);
        let target_finished = book.progress_counts_as_finished();

        let Some(existing) = existing else {
            if cfg.dry_run {
                return Ok(SyncAction::WouldCreate);
            }
            let new_user_book = NewUserBook {
                book_id,
                edition_id,
                status: target_status,
                owned: target_owned,
            };
            let user_book_id = with_retry("hardcover.insert_user_book", || {
                self.hardcover.insert_user_book(new_user_book.clone())
            })
            .await?;

            if target_progress > 0 {
                let today = Utc::now().date_naive();
                let new_read = NewRead {
                    progress_seconds: target_progress,
                    started_at: today,
                    finished_at: if target_finished { Some(book.finished_at().unwrap_or(today)) } else { None },
                    edition_id,
                    reading_format_id: AUDIOBOOK_READING_FORMAT_ID,
                };
                with_retry("hardcover.insert_user_book_read", || {
                    self.hardcover.insert_user_book_read(user_book_id, new_read.clone())
                })
                .await?;
            }

            self.invalidate_after_mutation(profile.id(), book_id).await;
            return Ok(SyncAction::Created);
        };

        if existing.is_reread(book.progress()) {
            if cfg.dry_run {
                return Ok(SyncAction::WouldUpdate);
            }
            if existing.status() != target_status {
                with_retry("hardcover.update_user_book_status", || {
                    self.hardcover.update_user_book_status(existing.user_book_id(), target_status)
                })
                .await?;
            }
            let today = Utc::now().date_naive();
            let new_read = NewRead {
                progress_seconds: target_progress,
                started_at: today,
                finished_at: None,
                edition_id,
                reading_format_id: AUDIOBOOK_READING_FORMAT_ID,
            };
            with_retry("hardcover.insert_user_book_read", || {
                self.hardcover.insert_user_book_read(existing.user_book_id(), new_read.clone())
            })
            .await?;
            self.invalidate_after_mutation(profile.id(), book_id).await;
            return Ok(SyncAction::Updated);
        }

        let delta = (target_progress - existing.progress_seconds()).abs();
        let status_changed = existing.status() != target_status;
        let progress_changed = delta >= threshold;

        if status_changed || progress_changed {
            if cfg.dry_run {
                return Ok(SyncAction::WouldUpdate);
            }
            if status_changed {
                with_retry("hardcover.update_user_book_status", || {
                    self.hardcover.update_user_book_status(existing.user_book_id(), target_status)
                })
                .await?;
            }
            self.apply_read_record(&existing, edition_id, target_progress, target_finished, book, threshold)
                .await?;
            self.invalidate_after_mutation(profile.id(), book_id).await;
            return Ok(SyncAction::Updated);
        }

        if existing.owned() != target_owned {
            if cfg.dry_run {
                return Ok(SyncAction::WouldMarkOwned);
            }
            let Some(edition_id) = edition_id else {
                warn!(book_id = book_id.value(), "owned flag changed but no edition id is known, skipping");
                return Ok(SyncAction::SkippedUpToDate);
            };
            with_retry("hardcover.mark_edition_owned", || self.hardcover.mark_edition_owned(edition_id)).await?;
            self.invalidate_after_mutation(profile.id(), book_id).await;
            return Ok(SyncAction::OwnedMarked);
        }

        Ok(SyncAction::SkippedUpToDate)
    }

    /// Step 6: create or update the read record for an in-progress or
    /// newly-finished book on an already-existing user-book.
    #[allow(clippy::too_many_arguments)]
    async fn apply_read_record(
        &self,
        existing: &UserBookState,
        edition_id: Option<EditionId>,
        target_progress: i64,
        target_finished: bool,
        book: &Audiobook,
        threshold: i64,
    ) -> Result<()> {
        let today = Utc::now().date_naive();

        if target_finished {
            if existing.has_finished_read() {
                return Ok(());
            }
            let started_at = self.preserved_started_at(existing, today).await?;
            let new_read = NewRead {
                progress_seconds: target_progress,
                started_at,
                finished_at: Some(book.finished_at().unwrap_or(today)),
                edition_id,
                reading_format_id: AUDIOBOOK_READING_FORMAT_ID,
            };
            with_retry("hardcover.insert_user_book_read", || {
                self.hardcover.insert_user_book_read(existing.user_book_id(), new_read.clone())
            })
            .await?;
            return Ok(());
        }

        match existing.latest_unfinished_read_id() {
            Some(read_id) => {
                let delta = (target_progress - existing.progress_seconds()).abs();
                if delta < threshold {
                    return Ok(());
                }
                // `get_read` itself falls back to the most recent read for the
                // user_book when the primary by-id filter misses, so `None`
                // here means no read at all exists for this user_book.
                let current = with_retry("hardcover.get_read", || self.hardcover.get_read(existing.user_book_id(), read_id))
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("no read found for user_book {:?} (by id or fallback)", existing.user_book_id()))?;
                let merged = current.merged_with_new_progress(target_progress);
                with_retry("hardcover.update_user_book_read", || self.hardcover.update_user_book_read(read_id, &merged))
                    .await?;
            }
            None => {
                let new_read = NewRead {
                    progress_seconds: target_progress,
                    started_at: today,
                    finished_at: None,
                    edition_id,
                    reading_format_id: AUDIOBOOK_READING_FORMAT_ID,
                };
                with_retry("hardcover.insert_user_book_read", || {
                    self.hardcover.insert_user_book_read(existing.user_book_id(), new_read.clone())
                })
                .await?;
            }
        }
        Ok(())
    }

    async fn preserved_started_at(&self, existing: &UserBookState, today: NaiveDate) -> Result<NaiveDate> {
        let Some(read_id) = existing.latest_unfinished_read_id() else {
            return Ok(today);
        };
        let read = with_retry("hardcover.get_read", || self.hardcover.get_read(existing.user_book_id(), read_id)).await?;
        Ok(read.map(|r| r.started_at()).unwrap_or(today))
    }

    /// Step 7: drop the stale user-book cache entry so the next lookup in
    /// this run (or a later one) sees the mutation's effect.
    async fn invalidate_after_mutation(&self, profile_id: &ProfileId, book_id: BookId) {
        self.user_book_cache.invalidate(profile_id, book_id).await;
    }

    /// Step 7 (opportunistic half): warms the edition cache the first time
    /// a match surfaces an edition id, so the next book sharing that
    /// edition (a duplicate ABS item, a re-run) skips the HC round trip.
    async fn warm_edition_cache(&self, edition_id: EditionId) -> Result<()> {
        if self.edition_cache.get(edition_id).await.is_some() {
            return Ok(());
        }
        if let Some(record) = with_retry("hardcover.fetch_edition", || self.hardcover.fetch_edition(edition_id)).await? {
            self.edition_cache.put(edition_id, record).await;
        }
        Ok(())
    }
}

fn target_status_id(book: &Audiobook, sync_want_to_read: bool) -> ReadingStatus {
    if book.progress() == 0.0 && sync_want_to_read {
        ReadingStatus::WantToRead
    } else if book.progress() < 0.99 && !book.is_finished() {
        ReadingStatus::CurrentlyReading
    } else {
        ReadingStatus::Read
    }
}

fn build_mismatch(book: &Audiobook, reason: &str, book_id: Option<BookId>) -> Mismatch {
    Mismatch {
        title: book.title().to_string(),
        subtitle: book.metadata().subtitle.clone(),
        authors: vec![book.author().to_string()],
        narrators: book.metadata().narrators.clone(),
        publisher: book.metadata().publisher.clone(),
        published_date: book.metadata().published_date.clone(),
        duration_seconds: if book.total_duration_seconds() > 0.0 {
            Some(book.total_duration_seconds().round() as i64)
        } else {
            None
        },
        isbn10: book.isbn10().map(str::to_string),
        isbn13: book.isbn13().map(str::to_string),
        asin: book.asin().map(str::to_string),
        book_id,
        edition_id: None,
        audiobookshelf_id: book.id().to_string(),
        reason: reason.to_string(),
        timestamp: Utc::now(),
        cover_url: book.metadata().cover_url.clone(),
    }
}
