//! ShelfSync Rate Limit - token-bucket throttling for remote API targets
//!
//! Both the Hardcover GraphQL client and the Audiobookshelf REST client sit
//! behind their own [`AdaptiveRateLimiter`], one instance per target, shared
//! across all profiles hitting that target. See [`rate_limit`] for details.

pub mod rate_limit;

pub use rate_limit::{parse_retry_after, AdaptiveRateLimiter, RateLimitConfig, RateLimitGuard, TokenBucket};
