//! Adapter-level error type for `shelfsync-store`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("failed to run schema migration: {0}")]
    MigrationFailed(String),

    #[error("failed to serialize or deserialize stored data: {0}")]
    SerializationError(String),

    #[error("database query failed: {0}")]
    QueryFailed(String),

    #[error("io error persisting state: {0}")]
    Io(#[from] std::io::Error),
}
