//! Reciprocal Rank Fusion.

use std::cmp::Ordering;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::parallel_search::SearchResult;

/// A document id with its fused score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedHit {
    pub id: String,
    pub score: f32,
}

/// Fuse ranked lists with Reciprocal Rank Fusion.
///
/// A document at zero-based rank `r` in a list receives `1 / (r + k + 1)`
/// from that list. Equal scores keep the order in which ids were first seen
/// across the lists.
pub fn fuse(lists: &[Vec<SearchResult>], k: u32) -> Vec<FusedHit> {
    let mut positions: AHashMap<&str, usize> = AHashMap::new();
    let mut hits: Vec<FusedHit> = Vec::new();

    for list in lists {
        for (rank, result) in list.iter().enumerate() {
            let contribution = 1.0 / (rank as f32 + k as f32 + 1.0);
            match positions.get(result.id.as_str()) {
                Some(&position) => hits[position].score += contribution,
                None => {
                    positions.insert(result.id.as_str(), hits.len());
                    hits.push(FusedHit {
                        id: result.id.clone(),
                        score: contribution,
                    });
                }
            }
        }
    }

    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    hits
}

/// Fuse `lists` and return the top `limit` records.
///
/// Each returned record is the first occurrence of its id across the lists,
/// carrying the fused score. With no lists the result is empty; a single
/// list is returned truncated, without fusion.
pub fn fuse_and_rehydrate(lists: &[Vec<SearchResult>], k: u32, limit: usize) -> Vec<SearchResult> {
    match lists {
        [] => Vec::new(),
        [only] => only.iter().take(limit).cloned().collect(),
        _ => {
            let mut originals: AHashMap<&str, &SearchResult> = AHashMap::new();
            for result in lists.iter().flatten() {
                originals.entry(result.id.as_str()).or_insert(result);
            }

            fuse(lists, k)
                .into_iter()
                .take(limit)
                .filter_map(|hit| {
                    originals.get(hit.id.as_str()).map(|original| {
                        let mut record = (*original).clone();
                        record.score = Some(hit.score);
                        record
                    })
                })
                .collect()
        }
    }
}
