//! Cache key derivation.
//!
//! Both key kinds hash the normalized query (trimmed, lower-cased), so
//! `"Foo"` and `" foo "` map to the same entry.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::parallel_search::SearchParams;

/// Normalize a query for hashing.
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

fn hex_digest(material: &[u8]) -> String {
    let digest = Sha256::digest(material);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Digest of a normalized query string, used to key cached embeddings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryFingerprint(String);

impl QueryFingerprint {
    /// Compute the fingerprint of a query.
    pub fn new(query: &str) -> Self {
        Self(hex_digest(normalize_query(query).as_bytes()))
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digest of a normalized query together with its search parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultCacheKey(String);

impl ResultCacheKey {
    /// Compute the key for a query and parameter set.
    ///
    /// Parameters are serialized with their keys sorted, so insertion order
    /// never changes the key. Fails only if a parameter value cannot be
    /// serialized.
    pub fn new(query: &str, params: &SearchParams) -> Result<Self> {
        let sorted: BTreeMap<&String, &serde_json::Value> = params.iter().collect();
        let param_str = serde_json::to_string(&sorted)?;
        let material = format!("{}|{}", normalize_query(query), param_str);
        Ok(Self(hex_digest(material.as_bytes())))
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResultCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: serde_json::Value) -> SearchParams {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_fingerprint_normalization() {
        assert_eq!(QueryFingerprint::new("Foo"), QueryFingerprint::new(" foo "));
        assert_ne!(QueryFingerprint::new("foo"), QueryFingerprint::new("bar"));
        assert_eq!(QueryFingerprint::new("foo").as_str().len(), 64);
    }

    #[test]
    fn test_result_key_distinguishes_params() {
        let a = ResultCacheKey::new("rust", &params(json!({"limit": 10}))).unwrap();
        let b = ResultCacheKey::new("rust", &params(json!({"limit": 20}))).unwrap();
        let c = ResultCacheKey::new(" RUST", &params(json!({"limit": 10}))).unwrap();

        assert_ne!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_result_key_ignores_param_order() {
        let mut first = SearchParams::new();
        first.insert("limit".to_string(), json!(10));
        first.insert("alpha".to_string(), json!(0.5));

        let mut second = SearchParams::new();
        second.insert("alpha".to_string(), json!(0.5));
        second.insert("limit".to_string(), json!(10));

        assert_eq!(
            ResultCacheKey::new("q", &first).unwrap(),
            ResultCacheKey::new("q", &second).unwrap()
        );
    }

    #[test]
    fn test_query_and_result_keys_differ() {
        let empty = SearchParams::new();
        let result_key = ResultCacheKey::new("rust", &empty).unwrap();
        assert_ne!(result_key.as_str(), QueryFingerprint::new("rust").as_str());
    }
}
