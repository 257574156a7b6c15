//! ShelfSync Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `Profile`, `SyncConfig`, `SyncState`, `Audiobook`,
//!   `UserBookState`, `ReadRecord`, `EditionRecord`, `Mismatch`
//! - **Port definitions** - Traits for adapters: `IProfileRepository`,
//!   `ISyncStateStore`, `ISecretStore`, `IHardcoverClient`, `IAbsClient`,
//!   the three cache ports
//! - **Configuration** - the daemon-wide `Config` and its sub-structs
//! - **Clock & IDs** - the monotonic/wall-clock abstraction caches and
//!   records are built on
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no external
//! dependencies beyond `serde`/`chrono`/`thiserror`. Ports define trait
//! interfaces that adapter crates implement. There is no use-case layer here:
//! the orchestration those would perform lives directly in `shelfsync-sync`'s
//! engine and orchestrator, since this system has one coherent workflow
//! rather than several independently invokable use cases.

pub mod clock;
pub mod config;
pub mod domain;
pub mod ports;
