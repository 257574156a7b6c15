//! Domain entities and business logic
//!
//! This module contains the core domain types for ShelfSync:
//! - Newtypes for type-safe identifiers and validated domain types
//! - Profile and per-profile sync configuration
//! - Sync watermark state
//! - The normalized ABS/HC data model the engine reasons over
//! - Mismatch records and their edition-creation payload form
//! - Domain-specific error types

pub mod audiobook;
pub mod duration_norm;
pub mod edition;
pub mod errors;
pub mod mismatch;
pub mod newtypes;
pub mod profile;
pub mod read_record;
pub mod sync_state;
pub mod user_book;

pub use audiobook::{Audiobook, AudiobookMetadata};
pub use edition::EditionRecord;
pub use errors::DomainError;
pub use mismatch::{EditionCreationPayload, Mismatch};
pub use newtypes::*;
pub use profile::{AudiobookMatchMode, IncrementalMode, Profile, ProfileStatus, SyncConfig};
pub use read_record::{ReadRecord, AUDIOBOOK_READING_FORMAT_ID};
pub use sync_state::SyncState;
pub use user_book::{ReadingStatus, UserBookState};
