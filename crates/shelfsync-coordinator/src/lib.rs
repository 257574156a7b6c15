//! Multi-profile scheduling and run-lease coordination for ShelfSync.
//!
//! Builds one [`shelfsync_sync::Orchestrator`] per profile (each profile
//! points at its own Audiobookshelf server and tokens) over a set of
//! adapters shared across all profiles, tracks a run lease and cooperative
//! cancellation token per profile, and exposes that as [`CoordinatorHandle`],
//! a plain async trait an out-of-scope HTTP layer could adapt.

pub mod coordinator;

pub use coordinator::{Coordinator, CoordinatorHandle, ProfileRunStatus};
