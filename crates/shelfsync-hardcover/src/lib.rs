//! ShelfSync Hardcover - Hardcover GraphQL API client
//!
//! Implements `shelfsync_core::ports::hardcover_client::IHardcoverClient`
//! against Hardcover's GraphQL-over-HTTPS API, a single POST endpoint that
//! accepts a `{query, variables}` body for both queries and mutations.
//!
//! ## Modules
//!
//! - [`client`] - the `HardcoverClient` HTTP client and its GraphQL document
//!   constants

pub mod client;

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when communicating with the Hardcover API.
#[derive(Debug, Error)]
pub enum HardcoverError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("GraphQL errors returned: {0}")]
    GraphQlErrors(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    TooManyRequests { retry_after: Duration },

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
