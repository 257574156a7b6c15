//! ShelfSync Cache - in-memory TTL caches
//!
//! Implements the three cache ports declared in
//! `shelfsync_core::ports::cache` on top of a shared [`ttl_map::TtlMap`],
//! a `DashMap` wrapper that lazily expires entries instead of running a
//! background eviction task.
//!
//! ## Modules
//!
//! - [`ttl_map`] - generic concurrent TTL map
//! - [`asin_cache`] - ASIN -> HC book/edition lookups
//! - [`edition_cache`] - HC edition records, keyed by edition id
//! - [`user_book_cache`] - per-profile user_book snapshots

pub mod asin_cache;
pub mod edition_cache;
pub mod ttl_map;
pub mod user_book_cache;

pub use asin_cache::InMemoryAsinCache;
pub use edition_cache::InMemoryEditionCache;
pub use user_book_cache::InMemoryUserBookCache;
