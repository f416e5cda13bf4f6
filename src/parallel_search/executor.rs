//! Bounded fan-out of a query vector across vector store shards.

use std::cmp::Ordering;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ahash::AHashSet;
use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::error::{HybridOptError, Result};
use crate::parallel_search::config::{ParallelSearchConfig, shard_limit};
use crate::parallel_search::metrics::{SearchMetrics, SearchMetricsCollector, Timer};
use crate::parallel_search::search_task::{ShardOutcome, ShardTask, TaskStatus};
use crate::parallel_search::store::VectorStore;
use crate::parallel_search::types::{SearchParams, SearchProvenance, SearchResult};

/// Executes shard searches concurrently and merges their results.
#[derive(Debug)]
pub struct ParallelSearchExecutor {
    config: ParallelSearchConfig,
    metrics: Arc<SearchMetricsCollector>,
}

impl ParallelSearchExecutor {
    /// Create a new executor.
    pub fn new(config: ParallelSearchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            metrics: Arc::new(SearchMetricsCollector::new()),
        })
    }

    /// Get the executor configuration.
    pub fn config(&self) -> &ParallelSearchConfig {
        &self.config
    }

    /// Search every shard and merge the hits into at most `limit` results.
    ///
    /// At most `max_workers` shard calls are in flight at once. A shard that
    /// fails or times out contributes nothing; the call itself never fails.
    pub async fn search_shards<V: VectorStore>(
        &self,
        query_vector: &[f32],
        shards: &[V::Shard],
        store: &V,
        limit: usize,
        params: &SearchParams,
    ) -> Vec<SearchResult> {
        let semaphore = Semaphore::new(self.config.max_workers);
        self.search_shards_with_admission(query_vector, shards, store, limit, params, &semaphore)
            .await
    }

    /// Admission gate sized for this executor, for callers that run several
    /// fan-outs at once and must share one `max_workers` budget.
    pub fn admission(&self) -> Semaphore {
        Semaphore::new(self.config.max_workers)
    }

    /// Like [`search_shards`](Self::search_shards), but shard calls take
    /// their permits from `semaphore`.
    pub async fn search_shards_with_admission<V: VectorStore>(
        &self,
        query_vector: &[f32],
        shards: &[V::Shard],
        store: &V,
        limit: usize,
        params: &SearchParams,
        semaphore: &Semaphore,
    ) -> Vec<SearchResult> {
        if shards.is_empty() || limit == 0 {
            return Vec::new();
        }

        let timer = Timer::start();
        let per_shard = shard_limit(limit);

        let tasks = shards.iter().enumerate().map(|(index, shard)| {
            async move {
                let task = ShardTask::new(index, per_shard);
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return ShardOutcome::failure(
                            task,
                            HybridOptError::cancelled("shard admission closed"),
                            Duration::ZERO,
                        );
                    }
                };
                self.run_shard(store, shard, task, query_vector, params)
                    .await
            }
        });

        let outcomes = join_all(tasks).await;

        let mut lists = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            if self.config.enable_metrics {
                self.metrics.record_shard(
                    outcome.is_success(),
                    outcome.status == TaskStatus::TimedOut,
                    outcome.hit_count() as u64,
                );
            }
            match (&outcome.status, &outcome.error) {
                (TaskStatus::Completed, _) => {
                    log::debug!(
                        "{} returned {} hits in {:?}",
                        outcome.task_id,
                        outcome.hit_count(),
                        outcome.execution_time
                    );
                }
                (TaskStatus::TimedOut, _) => {
                    log::warn!(
                        "{} timed out after {:?}",
                        outcome.task_id,
                        outcome.execution_time
                    );
                }
                (TaskStatus::Failed, Some(error)) => {
                    log::error!("{} failed: {}", outcome.task_id, error);
                }
                (TaskStatus::Failed, None) => {
                    log::error!("{} failed", outcome.task_id);
                }
            }
            lists.push(outcome.results);
        }

        let total_hits: usize = lists.iter().map(Vec::len).sum();
        let (merged, duplicates) = merge_with_stats(lists, limit);

        if self.config.enable_metrics {
            self.metrics.record_search(timer.stop(), duplicates as u64);
        }
        log::debug!(
            "Merged {} hits from {} shards into {} results",
            total_hits,
            shards.len(),
            merged.len()
        );

        merged
    }

    async fn run_shard<V: VectorStore>(
        &self,
        store: &V,
        shard: &V::Shard,
        task: ShardTask,
        query_vector: &[f32],
        params: &SearchParams,
    ) -> ShardOutcome {
        let timer = Timer::start();
        let call = store.search(shard, query_vector, task.limit, params);

        let result = match self.config.shard_timeout {
            Some(deadline) => match tokio::time::timeout(deadline, call).await {
                Ok(result) => result,
                Err(_) => return ShardOutcome::timeout(task, timer.stop()),
            },
            None => call.await,
        };

        match result {
            Ok(results) => ShardOutcome::success(task, results, timer.stop()),
            Err(error) => ShardOutcome::failure(task, error, timer.stop()),
        }
    }

    /// Race `primary` against `timeout`, falling back on timeout or error.
    ///
    /// The primary future is dropped when the timeout fires, which cancels
    /// it. A failing fallback is reported as [`HybridOptError::Fallback`].
    pub async fn search_with_fallback<P, PF, F, FF>(
        &self,
        primary: P,
        fallback: F,
        query: &str,
        params: &SearchParams,
        timeout: Duration,
    ) -> Result<(Vec<SearchResult>, SearchProvenance)>
    where
        P: FnOnce(String, SearchParams) -> PF,
        PF: Future<Output = Result<Vec<SearchResult>>>,
        F: FnOnce(String, SearchParams) -> FF,
        FF: Future<Output = Result<Vec<SearchResult>>>,
    {
        let provenance =
            match tokio::time::timeout(timeout, primary(query.to_string(), params.clone())).await
            {
                Ok(Ok(results)) => {
                    self.record_fallback(false, false);
                    return Ok((results, SearchProvenance::Primary));
                }
                Ok(Err(error)) => {
                    log::warn!("Primary search failed, using fallback: {}", error);
                    self.record_fallback(false, true);
                    SearchProvenance::FallbackError
                }
                Err(_) => {
                    log::warn!(
                        "Primary search exceeded {:?}, using fallback",
                        timeout
                    );
                    self.record_fallback(true, false);
                    SearchProvenance::FallbackTimeout
                }
            };

        let results = fallback(query.to_string(), params.clone())
            .await
            .map_err(|e| HybridOptError::fallback(e.to_string()))?;
        Ok((results, provenance))
    }

    fn record_fallback(&self, timed_out: bool, errored: bool) {
        if self.config.enable_metrics {
            self.metrics.record_fallback(timed_out, errored);
        }
    }

    /// Get a snapshot of the executor metrics.
    pub fn metrics(&self) -> SearchMetrics {
        self.metrics.snapshot()
    }

    /// Reset the executor metrics.
    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }
}

/// Merge per-shard result lists.
///
/// Lists are concatenated in order and deduplicated by id, keeping the first
/// occurrence. The survivors are stably sorted by score, highest first, and
/// truncated to `limit`.
pub fn merge_shard_results(lists: Vec<Vec<SearchResult>>, limit: usize) -> Vec<SearchResult> {
    merge_with_stats(lists, limit).0
}

fn merge_with_stats(lists: Vec<Vec<SearchResult>>, limit: usize) -> (Vec<SearchResult>, usize) {
    let mut seen = AHashSet::new();
    let mut merged = Vec::new();
    let mut duplicates = 0;

    for result in lists.into_iter().flatten() {
        if seen.insert(result.id.clone()) {
            merged.push(result);
        } else {
            duplicates += 1;
        }
    }

    merged.sort_by(|a, b| {
        b.effective_score()
            .partial_cmp(&a.effective_score())
            .unwrap_or(Ordering::Equal)
    });
    merged.truncate(limit);
    (merged, duplicates)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;

    struct MockStore {
        shards: Vec<std::result::Result<Vec<SearchResult>, String>>,
        delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        requested_limits: Mutex<Vec<usize>>,
    }

    impl MockStore {
        fn new(shards: Vec<std::result::Result<Vec<SearchResult>, String>>) -> Self {
            Self {
                shards,
                delay: Duration::ZERO,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                requested_limits: Mutex::new(Vec::new()),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl VectorStore for MockStore {
        type Shard = usize;

        async fn shards(&self) -> Result<Vec<usize>> {
            Ok((0..self.shards.len()).collect())
        }

        async fn search(
            &self,
            shard: &usize,
            _query_vector: &[f32],
            limit: usize,
            _params: &SearchParams,
        ) -> Result<Vec<SearchResult>> {
            let current = self.in_flight.fetch_add(1, AtomicOrdering::SeqCst) + 1;
            self.peak.fetch_max(current, AtomicOrdering::SeqCst);
            self.requested_limits.lock().push(limit);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, AtomicOrdering::SeqCst);

            match &self.shards[*shard] {
                Ok(results) => Ok(results.clone()),
                Err(message) => Err(HybridOptError::shard_search(message.clone())),
            }
        }
    }

    fn executor(max_workers: usize) -> ParallelSearchExecutor {
        ParallelSearchExecutor::new(ParallelSearchConfig::default().with_max_workers(max_workers))
            .unwrap()
    }

    #[test]
    fn test_merge_keeps_first_occurrence() {
        let shard_a = vec![SearchResult::new("d1", 0.9), SearchResult::new("d2", 0.5)];
        let shard_b = vec![SearchResult::new("d1", 0.8), SearchResult::new("d3", 0.7)];

        let merged = merge_shard_results(vec![shard_a, shard_b], 2);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], SearchResult::new("d1", 0.9));
        assert_eq!(merged[1], SearchResult::new("d3", 0.7));
    }

    #[test]
    fn test_merge_missing_scores_rank_last() {
        let merged = merge_shard_results(
            vec![vec![
                SearchResult::unscored("a"),
                SearchResult::new("b", 0.1),
                SearchResult::unscored("c"),
            ]],
            10,
        );
        let ids: Vec<_> = merged.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_search_shards_merges_in_shard_order() {
        let store = MockStore::new(vec![
            Ok(vec![SearchResult::new("d1", 0.9), SearchResult::new("d2", 0.5)]),
            Ok(vec![SearchResult::new("d1", 0.8), SearchResult::new("d3", 0.7)]),
        ]);
        let shards = store.shards().await.unwrap();
        let executor = executor(4);

        let results = executor
            .search_shards(&[0.1, 0.2], &shards, &store, 2, &SearchParams::new())
            .await;

        assert_eq!(
            results,
            vec![SearchResult::new("d1", 0.9), SearchResult::new("d3", 0.7)]
        );
        assert_eq!(*store.requested_limits.lock(), vec![4, 4]);

        let metrics = executor.metrics();
        assert_eq!(metrics.total_searches, 1);
        assert_eq!(metrics.shard_successes, 2);
        assert_eq!(metrics.duplicates_dropped, 1);
    }

    #[tokio::test]
    async fn test_failing_shard_is_isolated() {
        let store = MockStore::new(vec![
            Err("connection refused".to_string()),
            Ok(vec![SearchResult::new("d7", 0.4)]),
        ]);
        let executor = executor(2);

        let results = executor
            .search_shards(&[1.0], &[0, 1], &store, 5, &SearchParams::new())
            .await;

        assert_eq!(results, vec![SearchResult::new("d7", 0.4)]);
        let metrics = executor.metrics();
        assert_eq!(metrics.shard_failures, 1);
        assert_eq!(metrics.shard_successes, 1);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let shards: Vec<_> = (0..6)
            .map(|i| Ok(vec![SearchResult::new(format!("d{i}"), i as f32)]))
            .collect();
        let store = MockStore::new(shards).with_delay(Duration::from_millis(20));
        let executor = executor(2);

        let results = executor
            .search_shards(&[1.0], &[0, 1, 2, 3, 4, 5], &store, 10, &SearchParams::new())
            .await;

        assert_eq!(results.len(), 6);
        assert_eq!(results[0].id, "d5");
        assert!(store.peak.load(AtomicOrdering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_shard_timeout_contributes_nothing() {
        let store = MockStore::new(vec![Ok(vec![SearchResult::new("slow", 1.0)])])
            .with_delay(Duration::from_millis(200));
        let executor = ParallelSearchExecutor::new(
            ParallelSearchConfig::default().with_shard_timeout(Duration::from_millis(10)),
        )
        .unwrap();

        let results = executor
            .search_shards(&[1.0], &[0], &store, 5, &SearchParams::new())
            .await;

        assert!(results.is_empty());
        assert_eq!(executor.metrics().shard_timeouts, 1);
    }

    #[tokio::test]
    async fn test_empty_shards() {
        let store = MockStore::new(Vec::new());
        let results = executor(2)
            .search_shards(&[1.0], &[], &store, 5, &SearchParams::new())
            .await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_primary_wins() {
        let executor = executor(2);
        let (results, provenance) = executor
            .search_with_fallback(
                |_q, _p| async { Ok::<_, HybridOptError>(vec![SearchResult::new("p", 1.0)]) },
                |_q, _p| async { Ok::<_, HybridOptError>(vec![SearchResult::new("f", 1.0)]) },
                "query",
                &SearchParams::new(),
                Duration::from_secs(1),
            )
            .await
            .unwrap();

        assert_eq!(provenance, SearchProvenance::Primary);
        assert_eq!(results[0].id, "p");
    }

    #[tokio::test]
    async fn test_fallback_on_timeout() {
        let executor = executor(2);
        let (results, provenance) = executor
            .search_with_fallback(
                |_q, _p| async {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    Ok::<_, HybridOptError>(vec![SearchResult::new("p", 1.0)])
                },
                |q, _p| async move { Ok::<_, HybridOptError>(vec![SearchResult::new(q, 0.5)]) },
                "late query",
                &SearchParams::new(),
                Duration::from_millis(20),
            )
            .await
            .unwrap();

        assert_eq!(provenance, SearchProvenance::FallbackTimeout);
        assert_eq!(results[0].id, "late query");
        assert_eq!(executor.metrics().fallback_timeouts, 1);
    }

    #[tokio::test]
    async fn test_fallback_on_error() {
        let executor = executor(2);
        let (results, provenance) = executor
            .search_with_fallback(
                |_q, _p| async { Err::<Vec<SearchResult>, _>(HybridOptError::vector_store("index offline")) },
                |_q, _p| async { Ok::<_, HybridOptError>(vec![SearchResult::new("f", 0.3)]) },
                "query",
                &SearchParams::new(),
                Duration::from_secs(1),
            )
            .await
            .unwrap();

        assert_eq!(provenance, SearchProvenance::FallbackError);
        assert_eq!(results[0].id, "f");
    }

    #[tokio::test]
    async fn test_fallback_failure_propagates() {
        let executor = executor(2);
        let error = executor
            .search_with_fallback(
                |_q, _p| async { Err::<Vec<SearchResult>, _>(HybridOptError::vector_store("index offline")) },
                |_q, _p| async { Err::<Vec<SearchResult>, _>(HybridOptError::other("keyword index offline")) },
                "query",
                &SearchParams::new(),
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();

        assert!(matches!(error, HybridOptError::Fallback(_)));
    }
}
