//! ShelfSync sync decision engine.
//!
//! Provides:
//! - The per-book matching/decision/mutation pipeline ([`engine::SyncEngine`])
//! - Transient-error classification and retry with backoff
//! - Title normalization for the title+author fallback match

pub mod engine;
pub mod mismatch_collector;
pub mod orchestrator;
pub mod retry;
pub mod title_normalize;

pub use engine::{BookOutcome, SyncAction, SyncEngine};
pub use mismatch_collector::MismatchCollector;
pub use orchestrator::{Orchestrator, RunOutcome, RunSummary};
