//! Metrics collection for shard fan-out and fallback search.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Snapshot of the executor's counters.
#[derive(Debug, Clone, Serialize)]
pub struct SearchMetrics {
    /// Number of fan-outs executed.
    pub total_searches: u64,

    /// Number of individual shard calls.
    pub shard_calls: u64,

    /// Shard calls that answered.
    pub shard_successes: u64,

    /// Shard calls that returned an error.
    pub shard_failures: u64,

    /// Shard calls that missed their deadline.
    pub shard_timeouts: u64,

    /// Hits returned by shards before deduplication.
    pub hits_returned: u64,

    /// Hits dropped as cross-shard duplicates.
    pub duplicates_dropped: u64,

    /// Fan-out latency.
    pub total_execution_time: Duration,
    pub avg_execution_time: Duration,
    pub max_execution_time: Duration,
    pub min_execution_time: Duration,

    /// Primary searches raced against the fallback.
    pub fallback_races: u64,

    /// Races won by the fallback after a timeout.
    pub fallback_timeouts: u64,

    /// Races won by the fallback after a primary error.
    pub fallback_errors: u64,
}

/// Thread-safe collector behind [`SearchMetrics`].
#[derive(Debug)]
pub struct SearchMetricsCollector {
    total_searches: AtomicU64,
    shard_calls: AtomicU64,
    shard_successes: AtomicU64,
    shard_failures: AtomicU64,
    shard_timeouts: AtomicU64,
    hits_returned: AtomicU64,
    duplicates_dropped: AtomicU64,
    total_execution_nanos: AtomicU64,
    max_execution_nanos: AtomicU64,
    min_execution_nanos: AtomicU64,
    fallback_races: AtomicU64,
    fallback_timeouts: AtomicU64,
    fallback_errors: AtomicU64,

    start_time: Instant,
}

impl SearchMetricsCollector {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self {
            total_searches: AtomicU64::new(0),
            shard_calls: AtomicU64::new(0),
            shard_successes: AtomicU64::new(0),
            shard_failures: AtomicU64::new(0),
            shard_timeouts: AtomicU64::new(0),
            hits_returned: AtomicU64::new(0),
            duplicates_dropped: AtomicU64::new(0),
            total_execution_nanos: AtomicU64::new(0),
            max_execution_nanos: AtomicU64::new(0),
            min_execution_nanos: AtomicU64::new(u64::MAX),
            fallback_races: AtomicU64::new(0),
            fallback_timeouts: AtomicU64::new(0),
            fallback_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record the outcome of a single shard call.
    pub fn record_shard(&self, success: bool, timed_out: bool, hits: u64) {
        self.shard_calls.fetch_add(1, Ordering::Relaxed);
        if success {
            self.shard_successes.fetch_add(1, Ordering::Relaxed);
            self.hits_returned.fetch_add(hits, Ordering::Relaxed);
        } else if timed_out {
            self.shard_timeouts.fetch_add(1, Ordering::Relaxed);
        } else {
            self.shard_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a completed fan-out.
    pub fn record_search(&self, execution_time: Duration, duplicates_dropped: u64) {
        self.total_searches.fetch_add(1, Ordering::Relaxed);
        self.duplicates_dropped
            .fetch_add(duplicates_dropped, Ordering::Relaxed);

        let nanos = execution_time.as_nanos() as u64;
        self.total_execution_nanos
            .fetch_add(nanos, Ordering::Relaxed);
        self.max_execution_nanos.fetch_max(nanos, Ordering::Relaxed);
        self.min_execution_nanos.fetch_min(nanos, Ordering::Relaxed);
    }

    /// Record a primary/fallback race and which side answered.
    pub fn record_fallback(&self, timed_out: bool, errored: bool) {
        self.fallback_races.fetch_add(1, Ordering::Relaxed);
        if timed_out {
            self.fallback_timeouts.fetch_add(1, Ordering::Relaxed);
        } else if errored {
            self.fallback_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get the current metrics snapshot.
    pub fn snapshot(&self) -> SearchMetrics {
        let total_searches = self.total_searches.load(Ordering::Relaxed);
        let total_nanos = self.total_execution_nanos.load(Ordering::Relaxed);

        let avg_nanos = if total_searches > 0 {
            total_nanos / total_searches
        } else {
            0
        };

        let min_nanos = self.min_execution_nanos.load(Ordering::Relaxed);
        let min_duration = if min_nanos == u64::MAX {
            Duration::ZERO
        } else {
            Duration::from_nanos(min_nanos)
        };

        SearchMetrics {
            total_searches,
            shard_calls: self.shard_calls.load(Ordering::Relaxed),
            shard_successes: self.shard_successes.load(Ordering::Relaxed),
            shard_failures: self.shard_failures.load(Ordering::Relaxed),
            shard_timeouts: self.shard_timeouts.load(Ordering::Relaxed),
            hits_returned: self.hits_returned.load(Ordering::Relaxed),
            duplicates_dropped: self.duplicates_dropped.load(Ordering::Relaxed),
            total_execution_time: Duration::from_nanos(total_nanos),
            avg_execution_time: Duration::from_nanos(avg_nanos),
            max_execution_time: Duration::from_nanos(
                self.max_execution_nanos.load(Ordering::Relaxed),
            ),
            min_execution_time: min_duration,
            fallback_races: self.fallback_races.load(Ordering::Relaxed),
            fallback_timeouts: self.fallback_timeouts.load(Ordering::Relaxed),
            fallback_errors: self.fallback_errors.load(Ordering::Relaxed),
        }
    }

    /// Reset all metrics.
    pub fn reset(&self) {
        for counter in [
            &self.total_searches,
            &self.shard_calls,
            &self.shard_successes,
            &self.shard_failures,
            &self.shard_timeouts,
            &self.hits_returned,
            &self.duplicates_dropped,
            &self.total_execution_nanos,
            &self.max_execution_nanos,
            &self.fallback_races,
            &self.fallback_timeouts,
            &self.fallback_errors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.min_execution_nanos.store(u64::MAX, Ordering::Relaxed);
    }

    /// Get the uptime of this collector.
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for SearchMetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper for timing operations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return elapsed time.
    pub fn stop(self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collection() {
        let collector = SearchMetricsCollector::new();

        collector.record_shard(true, false, 10);
        collector.record_shard(true, false, 5);
        collector.record_shard(false, true, 0);
        collector.record_shard(false, false, 0);
        collector.record_search(Duration::from_millis(100), 2);
        collector.record_search(Duration::from_millis(50), 0);
        collector.record_search(Duration::from_millis(200), 1);

        let metrics = collector.snapshot();

        assert_eq!(metrics.total_searches, 3);
        assert_eq!(metrics.shard_calls, 4);
        assert_eq!(metrics.shard_successes, 2);
        assert_eq!(metrics.shard_timeouts, 1);
        assert_eq!(metrics.shard_failures, 1);
        assert_eq!(metrics.hits_returned, 15);
        assert_eq!(metrics.duplicates_dropped, 3);

        assert_eq!(metrics.min_execution_time, Duration::from_millis(50));
        assert_eq!(metrics.max_execution_time, Duration::from_millis(200));
        assert!(metrics.avg_execution_time >= Duration::from_millis(100));
        assert!(metrics.avg_execution_time <= Duration::from_millis(120));
    }

    #[test]
    fn test_fallback_counters_and_reset() {
        let collector = SearchMetricsCollector::new();
        collector.record_fallback(false, false);
        collector.record_fallback(true, false);
        collector.record_fallback(false, true);

        let metrics = collector.snapshot();
        assert_eq!(metrics.fallback_races, 3);
        assert_eq!(metrics.fallback_timeouts, 1);
        assert_eq!(metrics.fallback_errors, 1);

        collector.reset();
        let metrics = collector.snapshot();
        assert_eq!(metrics.fallback_races, 0);
        assert_eq!(metrics.min_execution_time, Duration::ZERO);
    }

    #[test]
    fn test_timer() {
        let timer = Timer::start();
        std::thread::sleep(Duration::from_millis(10));
        let elapsed = timer.stop();

        assert!(elapsed >= Duration::from_millis(10));
        assert!(elapsed < Duration::from_secs(1));
    }
}
