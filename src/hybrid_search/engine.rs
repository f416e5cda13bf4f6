//! Hybrid search orchestrator.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;

use crate::cache::{CacheStats, QueryCache};
use crate::error::{HybridOptError, Result};
use crate::fusion::{FusionMode, MultiStrategySearch};
use crate::hybrid_search::collaborators::{CorpusStatsProvider, Embedder, FallbackSearcher};
use crate::hybrid_search::config::HybridSearchConfig;
use crate::hybrid_search::types::{
    CachedSearch, HybridSearchRequest, HybridSearchResponse, ResultSource,
};
use crate::parallel_search::{
    ParallelSearchExecutor, SearchMetrics, SearchParams, SearchProvenance, SearchResult, Timer,
    VectorStore,
};
use crate::weighting::AdaptiveWeighting;

/// Answers hybrid search requests using the cache, adaptive weighting,
/// parallel shard search and rank fusion.
///
/// Collaborators are injected once at construction; the engine holds no
/// global state and is safe to share behind an `Arc`.
pub struct HybridSearchEngine<V: VectorStore> {
    config: HybridSearchConfig,
    cache: QueryCache<CachedSearch>,
    weighting: AdaptiveWeighting,
    executor: ParallelSearchExecutor,
    embedder: Arc<dyn Embedder>,
    store: Arc<V>,
    corpus_stats: Option<Arc<dyn CorpusStatsProvider>>,
    fallback: Option<Arc<dyn FallbackSearcher>>,
}

impl<V: VectorStore> HybridSearchEngine<V> {
    /// Create a new engine.
    pub fn new(
        config: HybridSearchConfig,
        embedder: Arc<dyn Embedder>,
        store: Arc<V>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            cache: QueryCache::new(config.cache.clone()),
            weighting: AdaptiveWeighting::new(config.weighting.clone())?,
            executor: ParallelSearchExecutor::new(config.parallel_search.clone())?,
            config,
            embedder,
            store,
            corpus_stats: None,
            fallback: None,
        })
    }

    /// Use corpus statistics for adaptive weighting.
    pub fn with_corpus_stats(mut self, provider: Arc<dyn CorpusStatsProvider>) -> Self {
        self.corpus_stats = Some(provider);
        self
    }

    /// Race single-strategy searches against a fallback searcher.
    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackSearcher>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn config(&self) -> &HybridSearchConfig {
        &self.config
    }

    /// Execute a hybrid search.
    pub async fn search(&self, request: HybridSearchRequest) -> Result<HybridSearchResponse> {
        let timer = Timer::start();

        if let Some(alpha) = request.alpha {
            if !alpha.is_finite() {
                return Err(HybridOptError::invalid_argument(format!(
                    "alpha must be a finite number, got {alpha}"
                )));
            }
        }

        let query = request.query.trim();
        if query.is_empty() || request.limit == 0 {
            return Ok(HybridSearchResponse {
                results: Vec::new(),
                alpha_used: request.alpha.unwrap_or(self.config.weighting.min_alpha),
                source: ResultSource::Live,
                fusion: request.fusion,
                provenance: None,
            });
        }

        let stats = self.corpus_stats.as_ref().and_then(|p| p.stats());
        let alpha_used = self
            .weighting
            .resolve_alpha(query, request.alpha, stats.as_ref());

        let cache_params = request.cache_params(alpha_used);
        if let Some(cached) = self.cache.get_results(query, &cache_params) {
            log::debug!("Result cache hit for '{}'", query);
            return Ok(cached.into_response(request.fusion));
        }

        let query_vector = self.query_vector(query).await?;

        let mut params = request.store_params();
        let (results, provenance) = match request.fusion {
            FusionMode::None => {
                params.insert("alpha".to_string(), Value::from(alpha_used));
                self.single_strategy(query, &query_vector, request.limit, params)
                    .await?
            }
            FusionMode::Rrf => {
                let shards = self.store.shards().await?;
                let results = MultiStrategySearch::new(&self.executor, &self.config.fusion)
                    .search(
                        &query_vector,
                        &shards,
                        self.store.as_ref(),
                        request.limit,
                        &params,
                    )
                    .await;
                (results, None)
            }
        };

        // Degraded answers are not pinned in the cache.
        if !provenance.is_some_and(|p| p.is_fallback()) {
            self.cache.cache_results(
                query,
                &cache_params,
                CachedSearch {
                    results: results.clone(),
                    alpha_used,
                    provenance,
                },
            );
        }

        log::debug!(
            "Search '{}' (alpha {:.3}, fusion {}) returned {} results in {:?}",
            query,
            alpha_used,
            request.fusion,
            results.len(),
            timer.elapsed()
        );

        Ok(HybridSearchResponse {
            results,
            alpha_used,
            source: ResultSource::Live,
            fusion: request.fusion,
            provenance,
        })
    }

    async fn query_vector(&self, query: &str) -> Result<Vec<f32>> {
        if let Some(vector) = self.cache.get_vector(query) {
            return Ok(vector);
        }

        let vector = self.embedder.embed(query).await.map_err(|e| match e {
            HybridOptError::EmbeddingUnavailable(_) => e,
            other => HybridOptError::embedding_unavailable(other.to_string()),
        })?;
        if vector.is_empty() {
            return Err(HybridOptError::embedding_unavailable(
                "embedder returned an empty vector",
            ));
        }

        self.cache.cache_vector(query, vector.clone());
        Ok(vector)
    }

    async fn single_strategy(
        &self,
        query: &str,
        query_vector: &[f32],
        limit: usize,
        params: SearchParams,
    ) -> Result<(Vec<SearchResult>, Option<SearchProvenance>)> {
        let store = self.store.as_ref();
        let executor = &self.executor;

        let Some(fallback) = &self.fallback else {
            let shards = store.shards().await?;
            let results = executor
                .search_shards(query_vector, &shards, store, limit, &params)
                .await;
            return Ok((results, None));
        };

        let (results, provenance) = executor
            .search_with_fallback(
                |_query, params| async move {
                    let shards = store.shards().await?;
                    Ok::<_, HybridOptError>(
                        executor
                            .search_shards(query_vector, &shards, store, limit, &params)
                            .await,
                    )
                },
                |query, params| async move {
                    let mut results = fallback.search(&query, &params).await?;
                    results.truncate(limit);
                    Ok::<_, HybridOptError>(results)
                },
                query,
                &params,
                self.config.parallel_search.fallback_timeout,
            )
            .await?;

        Ok((results, Some(provenance)))
    }

    /// Execute several requests, `batch_size` at a time.
    ///
    /// Results are returned in request order; each request succeeds or fails
    /// on its own.
    pub async fn batch_search(
        &self,
        requests: Vec<HybridSearchRequest>,
    ) -> Vec<Result<HybridSearchResponse>> {
        let mut responses = Vec::with_capacity(requests.len());

        for batch in requests.chunks(self.config.batch_size) {
            let batch_futures: Vec<_> = batch
                .iter()
                .map(|request| self.search(request.clone()))
                .collect();
            responses.extend(join_all(batch_futures).await);
        }

        responses
    }

    /// Remove expired cache entries.
    pub fn clear_expired(&self) -> usize {
        self.cache.clear_expired()
    }

    /// Drop every cached vector and result.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Shard search metrics.
    pub fn metrics(&self) -> SearchMetrics {
        self.executor.metrics()
    }
}
