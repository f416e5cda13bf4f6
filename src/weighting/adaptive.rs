//! Adaptive alpha computation.
//!
//! Alpha blends vector similarity (alpha = 1) and keyword matching
//! (alpha = 0). Short queries made of rare, long terms lean towards vector
//! search; long queries, quoted phrases and boolean operators lean towards
//! keyword search.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::config::WeightingConfig;
use crate::error::{HybridOptError, Result};

/// Corpus statistics snapshot used to estimate term specificity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusStats {
    /// Document frequency per lower-cased term.
    pub term_frequencies: HashMap<String, u64>,

    /// Number of documents in the corpus.
    pub total_docs: u64,
}

impl CorpusStats {
    /// Create a statistics snapshot.
    pub fn new(term_frequencies: HashMap<String, u64>, total_docs: u64) -> Self {
        Self {
            term_frequencies,
            total_docs,
        }
    }
}

/// Per-query feature scores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryFeatures {
    pub length_score: f32,
    pub specificity_score: f32,
    pub structure_score: f32,
}

const OPERATOR_WORDS: [&str; 3] = ["and", "or", "not"];
const QUOTE_CHARS: [char; 3] = ['"', '\u{201C}', '\u{201D}'];

/// Maps query text to a blend coefficient between vector and keyword search.
#[derive(Debug, Clone)]
pub struct AdaptiveWeighting {
    config: WeightingConfig,
    word_pattern: Regex,
}

impl AdaptiveWeighting {
    /// Create a new weighting function.
    pub fn new(config: WeightingConfig) -> Result<Self> {
        config.validate()?;
        let word_pattern = Regex::new(r"\w+")
            .map_err(|e| HybridOptError::other(format!("Failed to compile tokenizer: {e}")))?;
        Ok(Self {
            config,
            word_pattern,
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &WeightingConfig {
        &self.config
    }

    /// Return the explicit alpha untouched if there is one, otherwise compute
    /// it from the query.
    pub fn resolve_alpha(
        &self,
        query: &str,
        explicit_alpha: Option<f32>,
        stats: Option<&CorpusStats>,
    ) -> f32 {
        match explicit_alpha {
            Some(alpha) => alpha,
            None => self.compute_alpha(query, stats),
        }
    }

    /// Compute alpha in `[min_alpha, max_alpha]`.
    pub fn compute_alpha(&self, query: &str, stats: Option<&CorpusStats>) -> f32 {
        let features = self.extract_features(query, stats);
        let weights = &self.config.weights;

        let score = features.length_score * weights.length
            + features.specificity_score * weights.specificity
            + features.structure_score * weights.structure;

        let alpha =
            self.config.min_alpha + score * (self.config.max_alpha - self.config.min_alpha);
        alpha.clamp(self.config.min_alpha, self.config.max_alpha)
    }

    /// Extract the three feature scores for a query.
    pub fn extract_features(&self, query: &str, stats: Option<&CorpusStats>) -> QueryFeatures {
        let lowered = query.to_lowercase();
        let tokens: Vec<&str> = self
            .word_pattern
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .collect();

        QueryFeatures {
            length_score: length_score(tokens.len()),
            specificity_score: specificity_score(&tokens, stats),
            structure_score: structure_score(query, &tokens),
        }
    }
}

/// Logistic decay around seven tokens.
fn length_score(n_tokens: usize) -> f32 {
    let n = n_tokens as f64;
    (1.0 - 1.0 / (1.0 + (-0.2 * (n - 7.0)).exp())) as f32
}

fn specificity_score(tokens: &[&str], stats: Option<&CorpusStats>) -> f32 {
    if let Some(stats) = stats {
        let total_docs = stats.total_docs as f64;
        let idfs: Vec<f64> = tokens
            .iter()
            .filter_map(|token| stats.term_frequencies.get(*token))
            .map(|&freq| (total_docs / (1.0 + freq as f64)).ln())
            .collect();

        if !idfs.is_empty() {
            let avg_idf = idfs.iter().sum::<f64>() / idfs.len() as f64;
            return (avg_idf / 10.0).clamp(0.0, 1.0) as f32;
        }
    }

    if tokens.is_empty() {
        return 0.0;
    }
    let total_chars: usize = tokens.iter().map(|t| t.chars().count()).sum();
    let mean_len = total_chars as f64 / tokens.len() as f64;
    (mean_len / 10.0).clamp(0.0, 1.0) as f32
}

fn structure_score(query: &str, tokens: &[&str]) -> f32 {
    let mut score = 0.5f32;

    if query.contains('?') {
        score += 0.2;
    }
    if query.contains(QUOTE_CHARS) {
        score -= 0.3;
    }

    let has_operator_word = tokens.iter().any(|t| OPERATOR_WORDS.contains(t));
    if has_operator_word || query.contains(['+', '-']) {
        score -= 0.2;
    }

    score.clamp(0.0, 1.0)
}
