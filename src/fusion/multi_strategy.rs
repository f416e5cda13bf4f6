//! Multi-strategy search: several alpha presets fused with RRF.

use futures::future::join_all;
use serde_json::Value;

use crate::fusion::config::FusionConfig;
use crate::fusion::rrf::fuse_and_rehydrate;
use crate::parallel_search::{ParallelSearchExecutor, SearchParams, SearchResult, VectorStore};

/// Runs one fan-out per alpha preset and fuses the result lists.
pub struct MultiStrategySearch<'a> {
    executor: &'a ParallelSearchExecutor,
    config: &'a FusionConfig,
}

impl<'a> MultiStrategySearch<'a> {
    pub fn new(executor: &'a ParallelSearchExecutor, config: &'a FusionConfig) -> Self {
        Self { executor, config }
    }

    /// Search every preset at an inflated limit and return the top `limit`
    /// fused records.
    pub async fn search<V: VectorStore>(
        &self,
        query_vector: &[f32],
        shards: &[V::Shard],
        store: &V,
        limit: usize,
        params: &SearchParams,
    ) -> Vec<SearchResult> {
        let candidates = limit.saturating_mul(self.config.candidate_multiplier);

        let preset_params: Vec<SearchParams> = self
            .config
            .presets
            .iter()
            .map(|preset| {
                let mut params = params.clone();
                params.insert("alpha".to_string(), Value::from(preset.alpha));
                params
            })
            .collect();

        // One gate for every preset keeps shard calls within max_workers.
        let admission = self.executor.admission();
        let lists = join_all(preset_params.iter().map(|params| {
            self.executor.search_shards_with_admission(
                query_vector,
                shards,
                store,
                candidates,
                params,
                &admission,
            )
        }))
        .await;

        for (preset, list) in self.config.presets.iter().zip(&lists) {
            log::debug!(
                "Strategy '{}' (alpha {}) returned {} candidates",
                preset.name,
                preset.alpha,
                list.len()
            );
        }

        fuse_and_rehydrate(&lists, self.config.k, limit)
    }
}
