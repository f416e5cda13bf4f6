//! Vector store capability interface.

use std::fmt::Debug;

use async_trait::async_trait;

use super::types::{SearchParams, SearchResult};
use crate::error::Result;

/// The search backend the executor fans out to.
///
/// Implementations own their clients and any version differences between
/// backend APIs; the executor only ever calls these two methods.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Opaque reference to one partition of the index.
    type Shard: Send + Sync + Debug;

    /// The shards a query should be fanned out to.
    async fn shards(&self) -> Result<Vec<Self::Shard>>;

    /// Search one shard.
    async fn search(
        &self,
        shard: &Self::Shard,
        query_vector: &[f32],
        limit: usize,
        params: &SearchParams,
    ) -> Result<Vec<SearchResult>>;
}
