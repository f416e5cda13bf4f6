//! Types shared by the search executor, rank fusion and the orchestrator.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameters forwarded verbatim to the vector store.
///
/// A JSON object; the orchestrator adds `alpha` before searching.
pub type SearchParams = Map<String, Value>;

/// A single hit returned by a shard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Document identifier, the deduplication key across shards.
    pub id: String,

    /// Relevance score. Missing scores rank as `0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,

    /// Opaque payload supplied by the vector store.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub fields: Map<String, Value>,
}

impl SearchResult {
    /// Create a scored result without fields.
    pub fn new<S: Into<String>>(id: S, score: f32) -> Self {
        Self {
            id: id.into(),
            score: Some(score),
            fields: Map::new(),
        }
    }

    /// Create a result with no score.
    pub fn unscored<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            score: None,
            fields: Map::new(),
        }
    }

    /// Attach a payload field.
    pub fn with_field<K: Into<String>>(mut self, key: K, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Score used for ranking.
    pub fn effective_score(&self) -> f32 {
        self.score.unwrap_or(0.0)
    }
}

/// Which search produced a result set in
/// [`ParallelSearchExecutor::search_with_fallback`](super::ParallelSearchExecutor::search_with_fallback).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchProvenance {
    /// The primary search answered in time.
    Primary,
    /// The primary search timed out.
    FallbackTimeout,
    /// The primary search failed.
    FallbackError,
}

impl SearchProvenance {
    /// Wire name of the provenance tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchProvenance::Primary => "primary",
            SearchProvenance::FallbackTimeout => "fallback_timeout",
            SearchProvenance::FallbackError => "fallback_error",
        }
    }

    /// Whether the fallback produced the results.
    pub fn is_fallback(&self) -> bool {
        !matches!(self, SearchProvenance::Primary)
    }
}

impl fmt::Display for SearchProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_effective_score() {
        assert_eq!(SearchResult::new("d1", 0.4).effective_score(), 0.4);
        assert_eq!(SearchResult::unscored("d2").effective_score(), 0.0);
    }

    #[test]
    fn test_deserialize_without_score() {
        let result: SearchResult =
            serde_json::from_value(json!({"id": "d1", "fields": {"title": "Rust"}})).unwrap();
        assert_eq!(result.score, None);
        assert_eq!(result.fields["title"], json!("Rust"));
    }

    #[test]
    fn test_provenance_names() {
        assert_eq!(SearchProvenance::Primary.as_str(), "primary");
        assert_eq!(
            serde_json::to_value(SearchProvenance::FallbackTimeout).unwrap(),
            json!("fallback_timeout")
        );
        assert_eq!(SearchProvenance::FallbackError.to_string(), "fallback_error");
        assert!(SearchProvenance::FallbackError.is_fallback());
    }
}
