//! Query cache module.
//!
//! This module provides an in-process cache that avoids recomputing query
//! embeddings and re-running searches for repeated queries:
//! - Query fingerprints that normalize case and surrounding whitespace
//! - Lazy TTL expiry on read, plus an explicit sweep
//! - Least-used, then oldest, eviction when a store is full

pub mod config;
pub mod key;
pub mod query_cache;
pub mod store;

pub use config::CacheConfig;
pub use key::{QueryFingerprint, ResultCacheKey, normalize_query};
pub use query_cache::{CacheStats, QueryCache};
pub use store::{CacheEntry, StoreStats, TtlStore};
