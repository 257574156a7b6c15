//! ShelfSync Store - local persistence
//!
//! - [`pool::DatabasePool`] / [`repository::SqliteProfileRepository`]: SQLite
//!   storage for `Profile` records, implementing `IProfileRepository`.
//! - [`state_store::FileSyncStateStore`]: atomic JSON file persistence for
//!   per-profile `SyncState` watermarks, implementing `ISyncStateStore`.

pub mod error;
pub mod pool;
pub mod repository;
pub mod state_store;

pub use error::StoreError;
pub use pool::DatabasePool;
pub use repository::SqliteProfileRepository;
pub use state_store::FileSyncStateStore;
