//! Per-shard task bookkeeping.

use std::time::Duration;

use super::types::SearchResult;
use crate::error::HybridOptError;

/// One shard search within a fan-out.
#[derive(Debug, Clone)]
pub struct ShardTask {
    /// Unique identifier for this task, used in logs.
    pub task_id: String,

    /// Position of the shard in the caller's shard list.
    pub shard_index: usize,

    /// Number of candidates requested from the shard.
    pub limit: usize,
}

impl ShardTask {
    /// Create a new shard task.
    pub fn new(shard_index: usize, limit: usize) -> Self {
        let task_id = format!("shard{}_{}", shard_index, uuid::Uuid::new_v4());
        Self {
            task_id,
            shard_index,
            limit,
        }
    }
}

/// Status of a finished shard task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// The shard answered.
    Completed,
    /// The shard returned an error.
    Failed,
    /// The shard missed its deadline.
    TimedOut,
}

/// Result of executing a shard task.
#[derive(Debug)]
pub struct ShardOutcome {
    /// Task this outcome belongs to.
    pub task_id: String,

    /// Position of the shard in the caller's shard list.
    pub shard_index: usize,

    /// Hits returned by the shard. Empty unless the task completed.
    pub results: Vec<SearchResult>,

    /// Error if the task failed or timed out.
    pub error: Option<HybridOptError>,

    /// Final status.
    pub status: TaskStatus,

    /// Time spent in the shard call, excluding time waiting for a permit.
    pub execution_time: Duration,
}

impl ShardOutcome {
    /// Create a successful outcome.
    pub fn success(task: ShardTask, results: Vec<SearchResult>, execution_time: Duration) -> Self {
        Self {
            task_id: task.task_id,
            shard_index: task.shard_index,
            results,
            error: None,
            status: TaskStatus::Completed,
            execution_time,
        }
    }

    /// Create a failed outcome.
    pub fn failure(task: ShardTask, error: HybridOptError, execution_time: Duration) -> Self {
        Self {
            task_id: task.task_id,
            shard_index: task.shard_index,
            results: Vec::new(),
            error: Some(error),
            status: TaskStatus::Failed,
            execution_time,
        }
    }

    /// Create a timed-out outcome.
    pub fn timeout(task: ShardTask, execution_time: Duration) -> Self {
        let error = HybridOptError::timeout(format!(
            "Shard {} did not answer within {:?}",
            task.shard_index, execution_time
        ));
        Self {
            task_id: task.task_id,
            shard_index: task.shard_index,
            results: Vec::new(),
            error: Some(error),
            status: TaskStatus::TimedOut,
            execution_time,
        }
    }

    /// Check if the task was successful.
    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Number of hits returned.
    pub fn hit_count(&self) -> usize {
        self.results.len()
    }
}
