//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IProfileRepository`] - Persistent storage for `Profile` records
//! - [`ISyncStateStore`] - Per-profile incremental watermark persistence
//! - [`ISecretStore`] - Encrypted-at-rest token storage
//! - [`IHardcoverClient`] - Hardcover GraphQL operations
//! - [`IAbsClient`] - Audiobookshelf REST operations
//! - [`IAsinCache`] / [`IEditionCache`] / [`IUserBookCache`] - the three
//!   logical caches

pub mod abs_client;
pub mod cache;
pub mod hardcover_client;
pub mod profile_repository;
pub mod secret_store;
pub mod state_store;

pub use abs_client::{
    AbsItemMetadata, AbsLibrary, AbsLibraryItem, AbsListeningSession, AbsMediaProgress, IAbsClient,
};
pub use cache::{AsinLookup, IAsinCache, IEditionCache, IUserBookCache};
pub use hardcover_client::{BookMatch, IHardcoverClient, NewRead, NewUserBook};
pub use profile_repository::IProfileRepository;
pub use secret_store::ISecretStore;
pub use state_store::ISyncStateStore;
