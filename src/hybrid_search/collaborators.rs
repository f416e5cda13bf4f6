//! Services the orchestrator depends on but does not implement.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::Result;
use crate::parallel_search::{SearchParams, SearchResult};
use crate::weighting::CorpusStats;

/// Turns query text into a vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Supplies corpus statistics for adaptive weighting.
///
/// Returning `None` is a supported degraded mode.
pub trait CorpusStatsProvider: Send + Sync {
    fn stats(&self) -> Option<CorpusStats>;
}

/// Search used when the primary vector search times out or fails.
#[async_trait]
pub trait FallbackSearcher: Send + Sync {
    async fn search(&self, query: &str, params: &SearchParams) -> Result<Vec<SearchResult>>;
}

impl CorpusStatsProvider for CorpusStats {
    fn stats(&self) -> Option<CorpusStats> {
        Some(self.clone())
    }
}

/// Corpus statistics that can be replaced while the engine is serving.
#[derive(Debug, Clone, Default)]
pub struct SharedCorpusStats {
    inner: Arc<RwLock<Option<CorpusStats>>>,
}

impl SharedCorpusStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current snapshot.
    pub fn update(&self, stats: CorpusStats) {
        *self.inner.write() = Some(stats);
    }

    /// Drop the current snapshot.
    pub fn clear(&self) {
        *self.inner.write() = None;
    }
}

impl CorpusStatsProvider for SharedCorpusStats {
    fn stats(&self) -> Option<CorpusStats> {
        self.inner.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_shared_stats_refresh() {
        let shared = SharedCorpusStats::new();
        assert!(shared.stats().is_none());

        let reader = shared.clone();
        shared.update(CorpusStats::new(HashMap::from([("rust".to_string(), 3)]), 100));
        assert_eq!(reader.stats().map(|s| s.total_docs), Some(100));

        shared.clear();
        assert!(reader.stats().is_none());
    }
}
