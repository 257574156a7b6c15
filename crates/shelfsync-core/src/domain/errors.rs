//! Domain error types
//!
//! Errors specific to domain validation and invariant enforcement. Adapter
//! and port-boundary errors live closer to their adapters and are not
//! defined here.

use thiserror::Error;

/// Errors that can occur while constructing or mutating domain entities.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// ID parsing or construction error.
    #[error("Invalid ID: {0}")]
    InvalidId(String),

    /// Generic validation failure.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// A progress value outside `[0, 1]`.
    #[error("Invalid progress value: {0}")]
    InvalidProgress(f64),

    /// A duration that cannot be represented (negative, or unit-ambiguous
    /// and unresolvable).
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    /// Attempted an invalid state transition.
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState { from: String, to: String },
}
