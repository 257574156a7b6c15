//! Rate limiting and adaptive throttling for the Hardcover and
//! Audiobookshelf clients.
//!
//! Provides proactive rate limiting to prevent HTTP 429 (Too Many Requests)
//! errors when communicating with either remote target.
//!
//! ## Architecture
//!
//! - [`TokenBucket`]: classic token bucket algorithm for a single endpoint
//! - [`AdaptiveRateLimiter`]: manages multiple token buckets with adaptive
//!   capacity adjustment based on server responses (429 throttle / success)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use shelfsync_ratelimit::{AdaptiveRateLimiter, RateLimitConfig};
//!
//! # async fn example() {
//! let limiter = AdaptiveRateLimiter::new(RateLimitConfig::hardcover_defaults());
//! limiter.acquire("book_lookup").await;
//! // ... make API call ...
//! limiter.on_success("book_lookup");
//! # }
//! ```

use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use tracing::{debug, info, warn};

/// Internal mutable state for the token bucket, protected by a Mutex.
#[derive(Debug)]
struct TokenBucketInner {
    /// Current number of available tokens (fractional for smooth refill)
    tokens: f64,
    /// Timestamp of the last refill calculation
    last_refill: Instant,
}

/// Token bucket rate limiter for a single endpoint category.
///
/// Implements the classic token bucket algorithm: tokens are consumed on each
/// request and refilled at a constant rate. When no tokens are available,
/// callers must wait for refill.
///
/// Thread safety is provided by an internal `Mutex<TokenBucketInner>`.
#[derive(Debug)]
pub struct TokenBucket {
    /// Maximum number of tokens in the bucket
    capacity: u32,
    /// Effective capacity after adaptive adjustments (can be reduced by throttle)
    effective_capacity: Mutex<u32>,
    /// Rate at which tokens are added (tokens per second)
    refill_rate: f64,
    /// Mutable inner state (tokens count, last refill time)
    inner: Mutex<TokenBucketInner>,
    /// Count of consecutive successes (for adaptive recovery)
    success_count: Mutex<u64>,
    /// Original capacity before any throttle adjustments
    original_capacity: u32,
}

impl TokenBucket {
    /// Creates a new `TokenBucket` with the given configuration.
    ///
    /// The bucket starts full (tokens == capacity).
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        Self {
            capacity,
            effective_capacity: Mutex::new(capacity),
            refill_rate,
            inner: Mutex::new(TokenBucketInner {
                tokens: capacity as f64,
                last_refill: Instant::now(),
            }),
            success_count: Mutex::new(0),
            original_capacity: capacity,
        }
    }

    /// Refills the bucket based on elapsed time since last refill.
    ///
    /// Calculates how many tokens should have been added based on the elapsed
    /// duration and the refill rate. Caps at the effective capacity.
    fn refill(inner: &mut TokenBucketInner, refill_rate: f64, effective_capacity: u32) {
        let now = Instant::now();
        let elapsed = now.duration_since(inner.last_refill);
        let elapsed_secs = elapsed.as_secs_f64();

        if elapsed_secs > 0.0 {
            let new_tokens = elapsed_secs * refill_rate;
            inner.tokens = (inner.tokens + new_tokens).min(effective_capacity as f64);
            inner.last_refill = now;
        }
    }

    /// Attempts to acquire a single token from the bucket.
    ///
    /// Refills first based on elapsed time, then checks if at least 1.0 token
    /// is available. If so, subtracts 1.0 and returns `true`. Otherwise
    /// returns `false` without modifying the bucket.
    pub fn try_acquire(&self) -> bool {
        let effective_cap = *self.effective_capacity.lock().unwrap();
        let mut inner = self.inner.lock().unwrap();
        Self::refill(&mut inner, self.refill_rate, effective_cap);

        if inner.tokens >= 1.0 {
            inner.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Returns the estimated wait time in seconds until a token becomes available.
    pub fn time_until_available(&self) -> f64 {
        let effective_cap = *self.effective_capacity.lock().unwrap();
        let mut inner = self.inner.lock().unwrap();
        Self::refill(&mut inner, self.refill_rate, effective_cap);

        if inner.tokens >= 1.0 {
            0.0
        } else {
            let deficit = 1.0 - inner.tokens;
            if self.refill_rate > 0.0 {
                deficit / self.refill_rate
            } else {
                f64::MAX
            }
        }
    }

    /// Returns the current number of available tokens (after refill).
    pub fn available_tokens(&self) -> f64 {
        let effective_cap = *self.effective_capacity.lock().unwrap();
        let mut inner = self.inner.lock().unwrap();
        Self::refill(&mut inner, self.refill_rate, effective_cap);
        inner.tokens
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn effective_capacity(&self) -> u32 {
        *self.effective_capacity.lock().unwrap()
    }

    /// Records a successful API call for adaptive recovery.
    ///
    /// Every 100 consecutive successes, the effective capacity is increased
    /// by 5%, up to the original capacity.
    pub fn on_success(&self) {
        let mut count = self.success_count.lock().unwrap();
        *count += 1;

        if *count % 100 == 0 {
            let mut eff_cap = self.effective_capacity.lock().unwrap();
            if *eff_cap < self.original_capacity {
                let increase = (*eff_cap as f64 * 0.05).max(1.0) as u32;
                let new_cap = (*eff_cap + increase).min(self.original_capacity);
                debug!(
                    old_capacity = *eff_cap,
                    new_capacity = new_cap,
                    successes = *count,
                    "adaptive recovery: increasing bucket capacity"
                );
                *eff_cap = new_cap;
            }
        }
    }

    /// Records a throttle event (HTTP 429) and reduces effective capacity by
    /// 50%. Minimum effective capacity is 1 so the bucket never permanently
    /// blocks.
    pub fn on_throttle(&self) {
        let mut eff_cap = self.effective_capacity.lock().unwrap();
        let old = *eff_cap;
        *eff_cap = (*eff_cap / 2).max(1);
        warn!(
            old_capacity = old,
            new_capacity = *eff_cap,
            "throttle detected: reducing bucket capacity by 50%"
        );

        let mut count = self.success_count.lock().unwrap();
        *count = 0;
    }
}

/// Guard returned by the adaptive rate limiter after acquiring a token.
///
/// A simple marker type: since `TokenBucket` already subtracts the token on
/// acquisition, this guard does not need special drop behavior.
#[derive(Debug)]
pub struct RateLimitGuard {
    _endpoint: String,
}

impl RateLimitGuard {
    fn new(endpoint: String) -> Self {
        Self { _endpoint: endpoint }
    }
}

/// Configuration for the adaptive rate limiter.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Default bucket capacity (tokens)
    pub default_capacity: u32,
    /// Default refill rate (tokens per second)
    pub default_refill_rate: f64,
    /// Per-endpoint-category overrides: (capacity, refill_rate)
    pub endpoint_overrides: HashMap<String, (u32, f64)>,
    /// Maximum number of retries on 429 responses
    pub max_retries: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::hardcover_defaults()
    }
}

impl RateLimitConfig {
    /// Defaults aligned with Hardcover's published cap of 60 requests/min,
    /// with a small burst allowance.
    pub fn hardcover_defaults() -> Self {
        Self {
            default_capacity: 3,
            default_refill_rate: 60.0 / 60.0,
            endpoint_overrides: HashMap::new(),
            max_retries: 5,
        }
    }

    /// Defaults for Audiobookshelf, which has no published cap; kept
    /// generous since it is usually self-hosted on the same network.
    pub fn abs_defaults() -> Self {
        Self {
            default_capacity: 5,
            default_refill_rate: 300.0 / 60.0,
            endpoint_overrides: HashMap::new(),
            max_retries: 5,
        }
    }
}

/// Adaptive rate limiter managing per-endpoint-category token buckets.
///
/// One instance is shared across all profiles hitting the same remote
/// target (HC or ABS). Adapts bucket capacities based on server responses:
/// reduces on throttle (429), gradually recovers on consecutive successes.
///
/// Thread-safe and designed to be shared via `Arc<AdaptiveRateLimiter>`.
pub struct AdaptiveRateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    config: RateLimitConfig,
}

impl std::fmt::Debug for AdaptiveRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveRateLimiter")
            .field("config", &self.config)
            .finish()
    }
}

impl AdaptiveRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(RateLimitConfig::default())
    }

    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    /// Gets or creates a token bucket for the given endpoint category.
    fn get_or_create_bucket<F, R>(&self, endpoint: &str, f: F) -> R
    where
        F: FnOnce(&TokenBucket) -> R,
    {
        let mut buckets = self.buckets.lock().unwrap();
        if !buckets.contains_key(endpoint) {
            let (capacity, refill_rate) = self
                .config
                .endpoint_overrides
                .get(endpoint)
                .copied()
                .unwrap_or((self.config.default_capacity, self.config.default_refill_rate));

            debug!(endpoint, capacity, refill_rate, "creating new token bucket for endpoint");
            buckets.insert(endpoint.to_string(), TokenBucket::new(capacity, refill_rate));
        }
        f(buckets.get(endpoint).unwrap())
    }

    /// Acquires a rate limit token for the given endpoint category.
    ///
    /// If no tokens are available, sleeps until one becomes available. The
    /// caller is expected to race this future against their own
    /// cancellation signal if cooperative cancellation is required.
    pub async fn acquire(&self, endpoint: &str) -> RateLimitGuard {
        loop {
            let acquired = self.get_or_create_bucket(endpoint, |bucket| bucket.try_acquire());

            if acquired {
                debug!(endpoint, "rate limit token acquired");
                return RateLimitGuard::new(endpoint.to_string());
            }

            let wait_secs = self.get_or_create_bucket(endpoint, |bucket| bucket.time_until_available());
            let wait = Duration::from_secs_f64(wait_secs.max(0.01));
            debug!(endpoint, wait_ms = wait.as_millis(), "no tokens available, waiting for refill");
            tokio::time::sleep(wait).await;
        }
    }

    pub fn on_success(&self, endpoint: &str) {
        self.get_or_create_bucket(endpoint, |bucket| bucket.on_success());
    }

    pub fn on_throttle(&self, endpoint: &str) {
        info!(endpoint, "recording throttle event for endpoint");
        self.get_or_create_bucket(endpoint, |bucket| bucket.on_throttle());
    }

    pub fn available_tokens(&self, endpoint: &str) -> Option<f64> {
        let buckets = self.buckets.lock().unwrap();
        buckets.get(endpoint).map(|b| b.available_tokens())
    }

    pub fn effective_capacity(&self, endpoint: &str) -> Option<u32> {
        let buckets = self.buckets.lock().unwrap();
        buckets.get(endpoint).map(|b| b.effective_capacity())
    }
}

/// Parses a Retry-After header value into a Duration.
///
/// The header can be either an integer number of seconds, or an HTTP-date,
/// parsed as seconds from now. Falls back to `default` if parsing fails.
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value.trim()) {
        let now = chrono::Utc::now();
        let target = date.with_timezone(&chrono::Utc);
        if target > now {
            let diff = target - now;
            if let Some(secs) = diff.num_seconds().try_into().ok().filter(|&s: &u64| s <= 3600) {
                return Duration::from_secs(secs);
            }
        }
    }

    warn!(value, "could not parse Retry-After header, using default");
    default
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_token_bucket_creation() {
        let bucket = TokenBucket::new(10, 1.0);
        assert_eq!(bucket.capacity(), 10);
        assert_eq!(bucket.effective_capacity(), 10);
        assert!(bucket.available_tokens() >= 9.9);
    }

    #[test]
    fn test_try_acquire_succeeds_when_tokens_available() {
        let bucket = TokenBucket::new(5, 1.0);
        for _ in 0..5 {
            assert!(bucket.try_acquire());
        }
    }

    #[test]
    fn test_try_acquire_fails_when_empty() {
        let bucket = TokenBucket::new(2, 0.0);
        assert!(bucket.try_acquire());
        assert!(bucket.try_acquire());
        assert!(!bucket.try_acquire());
    }

    #[test]
    fn test_refill_adds_tokens_over_time() {
        let bucket = TokenBucket::new(10, 100.0);
        for _ in 0..10 {
            bucket.try_acquire();
        }
        assert!(!bucket.try_acquire());
        std::thread::sleep(Duration::from_millis(20));
        assert!(bucket.try_acquire());
    }

    #[test]
    fn test_refill_caps_at_capacity() {
        let bucket = TokenBucket::new(5, 1000.0);
        std::thread::sleep(Duration::from_millis(50));
        let available = bucket.available_tokens();
        assert!(available <= 5.0 + 0.1, "available {available} should not exceed capacity 5");
    }

    #[test]
    fn test_time_until_available_zero_when_tokens_exist() {
        let bucket = TokenBucket::new(10, 1.0);
        assert_eq!(bucket.time_until_available(), 0.0);
    }

    #[test]
    fn test_time_until_available_positive_when_empty() {
        let bucket = TokenBucket::new(1, 1.0);
        bucket.try_acquire();
        let wait = bucket.time_until_available();
        assert!(wait > 0.0);
        assert!(wait <= 1.1);
    }

    #[test]
    fn test_on_throttle_reduces_capacity() {
        let bucket = TokenBucket::new(100, 1.0);
        bucket.on_throttle();
        assert_eq!(bucket.effective_capacity(), 50);
        bucket.on_throttle();
        assert_eq!(bucket.effective_capacity(), 25);
    }

    #[test]
    fn test_on_throttle_minimum_capacity_is_one() {
        let bucket = TokenBucket::new(4, 1.0);
        bucket.on_throttle();
        assert_eq!(bucket.effective_capacity(), 2);
        bucket.on_throttle();
        assert_eq!(bucket.effective_capacity(), 1);
        bucket.on_throttle();
        assert_eq!(bucket.effective_capacity(), 1);
    }

    #[test]
    fn test_on_success_recovers_capacity() {
        let bucket = TokenBucket::new(100, 1.0);
        bucket.on_throttle();
        assert_eq!(bucket.effective_capacity(), 50);
        for _ in 0..100 {
            bucket.on_success();
        }
        let cap = bucket.effective_capacity();
        assert!(cap > 50 && cap <= 100);
    }

    #[test]
    fn test_on_success_does_not_exceed_original_capacity() {
        let bucket = TokenBucket::new(100, 1.0);
        for _ in 0..500 {
            bucket.on_success();
        }
        assert_eq!(bucket.effective_capacity(), 100);
    }

    #[test]
    fn test_throttle_resets_success_counter() {
        let bucket = TokenBucket::new(100, 1.0);
        bucket.on_throttle();
        for _ in 0..90 {
            bucket.on_success();
        }
        assert_eq!(bucket.effective_capacity(), 50);
        bucket.on_throttle();
        for _ in 0..90 {
            bucket.on_success();
        }
        assert_eq!(bucket.effective_capacity(), 25);
        for _ in 0..10 {
            bucket.on_success();
        }
        assert!(bucket.effective_capacity() > 25);
    }

    #[test]
    fn test_adaptive_rate_limiter_creation() {
        let limiter = AdaptiveRateLimiter::with_defaults();
        assert_eq!(limiter.max_retries(), 5);
    }

    #[test]
    fn test_adaptive_rate_limiter_custom_config() {
        let config = RateLimitConfig {
            default_capacity: 100,
            default_refill_rate: 5.0,
            endpoint_overrides: HashMap::new(),
            max_retries: 3,
        };
        let limiter = AdaptiveRateLimiter::new(config);
        assert_eq!(limiter.max_retries(), 3);
    }

    #[tokio::test]
    async fn test_acquire_succeeds_immediately() {
        let limiter = AdaptiveRateLimiter::with_defaults();
        let _guard = limiter.acquire("book_lookup").await;
    }

    #[tokio::test]
    async fn test_acquire_creates_bucket_on_demand() {
        let limiter = AdaptiveRateLimiter::with_defaults();
        assert!(limiter.available_tokens("custom_endpoint").is_none());
        let _guard = limiter.acquire("custom_endpoint").await;
        assert!(limiter.available_tokens("custom_endpoint").is_some());
    }

    #[tokio::test]
    async fn test_acquire_waits_when_empty() {
        let config = RateLimitConfig {
            default_capacity: 1,
            default_refill_rate: 100.0,
            endpoint_overrides: HashMap::new(),
            max_retries: 3,
        };
        let limiter = AdaptiveRateLimiter::new(config);
        let _g1 = limiter.acquire("test").await;
        let start = Instant::now();
        let _g2 = limiter.acquire("test").await;
        assert!(start.elapsed().as_millis() < 500);
    }

    #[tokio::test]
    async fn test_concurrent_acquire() {
        let limiter = Arc::new(AdaptiveRateLimiter::new(RateLimitConfig {
            default_capacity: 50,
            default_refill_rate: 100.0,
            endpoint_overrides: HashMap::new(),
            max_retries: 3,
        }));

        let mut handles = Vec::new();
        for i in 0..20 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                let _guard = limiter.acquire("concurrent_test").await;
                i
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        assert_eq!(results.len(), 20);
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after("30", Duration::from_secs(60)), Duration::from_secs(30));
    }

    #[test]
    fn test_parse_retry_after_zero() {
        assert_eq!(parse_retry_after("0", Duration::from_secs(60)), Duration::from_secs(0));
    }

    #[test]
    fn test_parse_retry_after_with_whitespace() {
        assert_eq!(parse_retry_after("  45  ", Duration::from_secs(60)), Duration::from_secs(45));
    }

    #[test]
    fn test_parse_retry_after_invalid_falls_back() {
        let default = Duration::from_secs(60);
        assert_eq!(parse_retry_after("not-a-number", default), default);
    }

    #[test]
    fn test_hardcover_defaults_respect_published_cap() {
        let config = RateLimitConfig::hardcover_defaults();
        assert_eq!(config.default_capacity, 3);
        assert!((config.default_refill_rate - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_abs_defaults_more_generous_than_hardcover() {
        let hc = RateLimitConfig::hardcover_defaults();
        let abs = RateLimitConfig::abs_defaults();
        assert!(abs.default_refill_rate > hc.default_refill_rate);
    }

    #[test]
    fn test_multiple_endpoints_independent() {
        let limiter = AdaptiveRateLimiter::with_defaults();
        limiter.get_or_create_bucket("a", |_| {});
        limiter.get_or_create_bucket("b", |_| {});
        limiter.on_throttle("a");
        let a_cap = limiter.effective_capacity("a").unwrap();
        let b_cap = limiter.effective_capacity("b").unwrap();
        assert!(a_cap < b_cap);
    }
}
