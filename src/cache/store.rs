//! Bounded TTL store backing each half of the query cache.

use std::time::{Duration, Instant};

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// A cached value with its insertion time.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// When the entry was inserted.
    pub inserted_at: Instant,
    /// The cached value.
    pub value: T,
    /// Insertion sequence number, breaks ties between equal instants.
    seq: u64,
}

/// Counters for one store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

/// A map of entries bounded by `max_size`, with lazy TTL expiry and
/// least-used eviction.
///
/// Not synchronized; [`QueryCache`](super::QueryCache) wraps it in a mutex.
#[derive(Debug)]
pub struct TtlStore<T> {
    entries: AHashMap<String, CacheEntry<T>>,
    usage: AHashMap<String, u64>,
    max_size: usize,
    ttl: Duration,
    next_seq: u64,
    stats: StoreStats,
}

impl<T: Clone> TtlStore<T> {
    /// Create an empty store.
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            entries: AHashMap::new(),
            usage: AHashMap::new(),
            max_size,
            ttl,
            next_seq: 0,
            stats: StoreStats::default(),
        }
    }

    /// Look up a key as of `now`.
    ///
    /// An entry older than the ttl is removed and reported as a miss.
    pub fn get(&mut self, key: &str, now: Instant) -> Option<T> {
        let expired = match self.entries.get(key) {
            Some(entry) => now.saturating_duration_since(entry.inserted_at) > self.ttl,
            None => {
                self.stats.misses += 1;
                return None;
            }
        };

        if expired {
            self.remove(key);
            self.stats.expirations += 1;
            self.stats.misses += 1;
            return None;
        }

        *self.usage.entry(key.to_string()).or_insert(0) += 1;
        self.stats.hits += 1;
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Insert a value as of `now`, evicting first if the store is full.
    ///
    /// Returns the number of evicted entries. Replacing an existing key
    /// never evicts.
    pub fn insert(&mut self, key: String, value: T, now: Instant) -> usize {
        let evicted = if self.entries.contains_key(&key) {
            0
        } else {
            self.ensure_capacity()
        };

        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            key,
            CacheEntry {
                inserted_at: now,
                value,
                seq,
            },
        );
        evicted
    }

    /// Remove every entry older than the ttl as of `now`.
    pub fn clear_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| now.saturating_duration_since(entry.inserted_at) > self.ttl)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove(key);
        }
        self.stats.expirations += expired.len() as u64;
        expired.len()
    }

    /// Make room for one new entry.
    ///
    /// Evicts `len - max_size + 1` entries ordered by usage count, then by
    /// insertion time (oldest first).
    fn ensure_capacity(&mut self) -> usize {
        if self.entries.len() < self.max_size {
            return 0;
        }

        let overflow = self.entries.len() - self.max_size + 1;
        let mut candidates: Vec<(u64, Instant, u64, &String)> = self
            .entries
            .iter()
            .map(|(key, entry)| {
                let usage = self.usage.get(key).copied().unwrap_or(0);
                (usage, entry.inserted_at, entry.seq, key)
            })
            .collect();
        candidates.sort_by(|a, b| (a.0, a.1, a.2).cmp(&(b.0, b.1, b.2)));

        let victims: Vec<String> = candidates
            .into_iter()
            .take(overflow)
            .map(|(_, _, _, key)| key.clone())
            .collect();

        for key in &victims {
            log::debug!("Evicting cache entry {key}");
            self.remove(key);
        }
        self.stats.evictions += victims.len() as u64;
        victims.len()
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.usage.remove(key);
    }

    /// Number of entries, including not yet collected expired ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a key is physically present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Hit count recorded for a key.
    pub fn usage_count(&self, key: &str) -> u64 {
        self.usage.get(key).copied().unwrap_or(0)
    }

    /// Counters snapshot.
    pub fn stats(&self) -> StoreStats {
        self.stats
    }

    /// Drop every entry and counter.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.usage.clear();
        self.stats = StoreStats::default();
    }
}
