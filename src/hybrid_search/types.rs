//! Request and response types for hybrid search.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fusion::FusionMode;
use crate::parallel_search::{SearchParams, SearchProvenance, SearchResult};

/// Default number of results per request.
pub const DEFAULT_LIMIT: usize = 10;

/// A hybrid search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridSearchRequest {
    /// Free-text query.
    pub query: String,

    /// Opaque filter restricting the documents searched, forwarded to the
    /// vector store as the `filter` parameter.
    #[serde(default)]
    pub scope_filter: Option<Value>,

    /// Maximum number of results.
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Explicit vector/keyword balance. Skips adaptive weighting when set.
    #[serde(default)]
    pub alpha: Option<f32>,

    /// How retrieval strategies are combined.
    #[serde(default)]
    pub fusion: FusionMode,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

impl HybridSearchRequest {
    pub fn new<S: Into<String>>(query: S) -> Self {
        Self {
            query: query.into(),
            scope_filter: None,
            limit: DEFAULT_LIMIT,
            alpha: None,
            fusion: FusionMode::None,
        }
    }

    pub fn with_scope_filter(mut self, filter: Value) -> Self {
        self.scope_filter = Some(filter);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = Some(alpha);
        self
    }

    pub fn with_fusion(mut self, fusion: FusionMode) -> Self {
        self.fusion = fusion;
        self
    }

    /// Parameters that distinguish result cache entries for the same query.
    ///
    /// `alpha_used` is the resolved weight, so an entry cached under older
    /// corpus statistics is not served once they change the weight.
    pub(crate) fn cache_params(&self, alpha_used: f32) -> SearchParams {
        let mut params = SearchParams::new();
        params.insert(
            "filter".to_string(),
            self.scope_filter.clone().unwrap_or(Value::Null),
        );
        params.insert("limit".to_string(), Value::from(self.limit));
        params.insert("alpha".to_string(), Value::from(alpha_used));
        params.insert("fusion".to_string(), Value::from(self.fusion.as_str()));
        params
    }

    /// Parameters forwarded to the vector store, before alpha is added.
    pub(crate) fn store_params(&self) -> SearchParams {
        let mut params = SearchParams::new();
        if let Some(filter) = &self.scope_filter {
            params.insert("filter".to_string(), filter.clone());
        }
        params
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Cache,
    Live,
}

impl fmt::Display for ResultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultSource::Cache => f.write_str("cache"),
            ResultSource::Live => f.write_str("live"),
        }
    }
}

/// A hybrid search response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridSearchResponse {
    /// Ranked results, at most `limit`.
    pub results: Vec<SearchResult>,

    /// Alpha the search ran with.
    pub alpha_used: f32,

    pub source: ResultSource,

    pub fusion: FusionMode,

    /// Set when the search raced a fallback searcher.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<SearchProvenance>,
}

/// What the result cache stores for a request.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedSearch {
    pub results: Vec<SearchResult>,
    pub alpha_used: f32,
    pub provenance: Option<SearchProvenance>,
}

impl CachedSearch {
    pub(crate) fn into_response(self, fusion: FusionMode) -> HybridSearchResponse {
        HybridSearchResponse {
            results: self.results,
            alpha_used: self.alpha_used,
            source: ResultSource::Cache,
            fusion,
            provenance: self.provenance,
        }
    }
}
