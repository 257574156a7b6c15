//! ShelfSync ABS - Audiobookshelf REST API client
//!
//! Implements `shelfsync_core::ports::abs_client::IAbsClient` against a
//! self-hosted Audiobookshelf server's REST API, authenticated with a
//! static bearer API token.
//!
//! ## Modules
//!
//! - [`client`] - the `AbsClient` HTTP client

pub mod client;

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when communicating with an Audiobookshelf server.
#[derive(Debug, Error)]
pub enum AbsError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    TooManyRequests { retry_after: Duration },

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The listening-sessions endpoint is unavailable on this server
    /// version; callers must fall back to a full sync.
    #[error("Listening sessions endpoint unavailable: {0}")]
    EndpointUnavailable(String),
}
