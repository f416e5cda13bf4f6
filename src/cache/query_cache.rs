//! Thread-safe query cache for embeddings and result sets.

use std::time::Instant;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::config::CacheConfig;
use super::key::{QueryFingerprint, ResultCacheKey};
use super::store::{StoreStats, TtlStore};
use crate::parallel_search::{SearchParams, SearchResult};

/// Counters for both stores of a [`QueryCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub vectors: StoreStats,
    pub results: StoreStats,
}

impl CacheStats {
    /// Fraction of lookups across both stores that were hits.
    pub fn hit_rate(&self) -> f32 {
        let hits = self.vectors.hits + self.results.hits;
        let total = hits + self.vectors.misses + self.results.misses;
        if total > 0 {
            hits as f32 / total as f32
        } else {
            0.0
        }
    }
}

#[derive(Debug)]
struct Stores<R> {
    vectors: TtlStore<Vec<f32>>,
    results: TtlStore<R>,
}

/// In-process cache mapping queries to embeddings and (query, params) pairs
/// to result sets.
///
/// Both stores share one lock, so every operation is atomic with respect to
/// every other. Operations never fail: a key that cannot be built is logged
/// and treated as a miss.
#[derive(Debug)]
pub struct QueryCache<R = Vec<SearchResult>> {
    config: CacheConfig,
    stores: Mutex<Stores<R>>,
}

impl<R: Clone> QueryCache<R> {
    /// Create a new cache.
    pub fn new(config: CacheConfig) -> Self {
        let stores = Stores {
            vectors: TtlStore::new(config.max_size, config.ttl),
            results: TtlStore::new(config.max_size, config.ttl),
        };
        Self {
            config,
            stores: Mutex::new(stores),
        }
    }

    /// The configuration this cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Cached embedding for a query, if present and fresh.
    pub fn get_vector(&self, query: &str) -> Option<Vec<f32>> {
        let key = QueryFingerprint::new(query);
        self.stores.lock().vectors.get(key.as_str(), Instant::now())
    }

    /// Store the embedding for a query.
    pub fn cache_vector(&self, query: &str, vector: Vec<f32>) {
        let key = QueryFingerprint::new(query);
        let evicted = self
            .stores
            .lock()
            .vectors
            .insert(key.to_string(), vector, Instant::now());
        if evicted > 0 {
            log::debug!("Vector cache evicted {evicted} entries");
        }
    }

    /// Cached results for a query and parameter set, if present and fresh.
    pub fn get_results(&self, query: &str, params: &SearchParams) -> Option<R> {
        let key = match ResultCacheKey::new(query, params) {
            Ok(key) => key,
            Err(e) => {
                log::warn!("Result cache lookup skipped, cannot build key: {e}");
                return None;
            }
        };
        self.stores.lock().results.get(key.as_str(), Instant::now())
    }

    /// Store results for a query and parameter set.
    pub fn cache_results(&self, query: &str, params: &SearchParams, results: R) {
        let key = match ResultCacheKey::new(query, params) {
            Ok(key) => key,
            Err(e) => {
                log::warn!("Result cache insert skipped, cannot build key: {e}");
                return;
            }
        };
        let evicted = self
            .stores
            .lock()
            .results
            .insert(key.to_string(), results, Instant::now());
        if evicted > 0 {
            log::debug!("Result cache evicted {evicted} entries");
        }
    }

    /// Remove expired entries from both stores, returning how many were
    /// removed.
    pub fn clear_expired(&self) -> usize {
        let now = Instant::now();
        let mut stores = self.stores.lock();
        let removed = stores.vectors.clear_expired(now) + stores.results.clear_expired(now);
        if removed > 0 {
            log::debug!("Cleared {removed} expired cache entries");
        }
        removed
    }

    /// Number of cached embeddings.
    pub fn len_vectors(&self) -> usize {
        self.stores.lock().vectors.len()
    }

    /// Number of cached result sets.
    pub fn len_results(&self) -> usize {
        self.stores.lock().results.len()
    }

    /// Drop everything, including counters.
    pub fn clear(&self) {
        let mut stores = self.stores.lock();
        stores.vectors.clear();
        stores.results.clear();
    }

    /// Counters snapshot.
    pub fn stats(&self) -> CacheStats {
        let stores = self.stores.lock();
        CacheStats {
            vectors: stores.vectors.stats(),
            results: stores.results.stats(),
        }
    }
}

impl<R: Clone> Default for QueryCache<R> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn params(value: serde_json::Value) -> SearchParams {
        value.as_object().cloned().unwrap()
    }

    fn result(id: &str, score: f32) -> SearchResult {
        SearchResult::new(id, score)
    }

    #[test]
    fn test_vector_roundtrip_is_normalized() {
        let cache: QueryCache = QueryCache::default();
        cache.cache_vector("Rust Async", vec![0.1, 0.2]);

        assert_eq!(cache.get_vector("  rust async "), Some(vec![0.1, 0.2]));
        assert_eq!(cache.get_vector("rust sync"), None);
    }

    #[test]
    fn test_results_keyed_by_params() {
        let cache: QueryCache = QueryCache::default();
        let p10 = params(json!({"limit": 10}));
        let p20 = params(json!({"limit": 20}));

        cache.cache_results("rust", &p10, vec![result("d1", 0.9)]);

        assert_eq!(cache.get_results("rust", &p10).map(|r| r.len()), Some(1));
        assert!(cache.get_results("rust", &p20).is_none());
    }

    #[test]
    fn test_stores_are_independent() {
        let config = CacheConfig::default().with_max_size(1);
        let cache: QueryCache = QueryCache::new(config);

        cache.cache_vector("a", vec![1.0]);
        cache.cache_results("a", &SearchParams::new(), vec![result("d", 1.0)]);
        cache.cache_vector("b", vec![2.0]);

        assert_eq!(cache.len_vectors(), 1);
        assert_eq!(cache.len_results(), 1);
        assert!(cache.get_vector("a").is_none());
        assert!(cache.get_results("a", &SearchParams::new()).is_some());
    }

    #[test]
    fn test_eviction_example() {
        let cache: QueryCache = QueryCache::new(CacheConfig::default().with_max_size(2));

        cache.cache_vector("k1", vec![1.0]);
        cache.cache_vector("k2", vec![2.0]);
        assert!(cache.get_vector("k1").is_some());
        cache.cache_vector("k3", vec![3.0]);

        assert_eq!(cache.len_vectors(), 2);
        assert!(cache.get_vector("k1").is_some());
        assert!(cache.get_vector("k2").is_none());
        assert!(cache.get_vector("k3").is_some());
    }

    #[test]
    fn test_expired_read_is_miss() {
        let config = CacheConfig::default().with_ttl(Duration::from_millis(20));
        let cache: QueryCache = QueryCache::new(config);

        cache.cache_vector("q", vec![1.0]);
        std::thread::sleep(Duration::from_millis(50));

        assert!(cache.get_vector("q").is_none());
        assert_eq!(cache.len_vectors(), 0);
        assert_eq!(cache.stats().vectors.expirations, 1);
    }

    #[test]
    fn test_clear_expired_counts_both_stores() {
        let config = CacheConfig::default().with_ttl(Duration::from_millis(20));
        let cache: QueryCache = QueryCache::new(config);

        cache.cache_vector("q", vec![1.0]);
        cache.cache_results("q", &SearchParams::new(), vec![]);
        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(cache.clear_expired(), 2);
        assert_eq!(cache.len_vectors(), 0);
        assert_eq!(cache.len_results(), 0);
    }

    #[test]
    fn test_concurrent_access_respects_bound() {
        let cache: Arc<QueryCache> =
            Arc::new(QueryCache::new(CacheConfig::default().with_max_size(16)));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let query = format!("query-{t}-{i}");
                        cache.cache_vector(&query, vec![i as f32]);
                        cache.get_vector(&query);
                        assert!(cache.len_vectors() <= 16);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.len_vectors() <= 16);
    }

    #[test]
    fn test_hit_rate() {
        let cache: QueryCache = QueryCache::default();
        cache.cache_vector("q", vec![1.0]);
        cache.get_vector("q");
        cache.get_vector("missing");

        let stats = cache.stats();
        assert_eq!(stats.vectors.hits, 1);
        assert_eq!(stats.vectors.misses, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f32::EPSILON);
    }
}
