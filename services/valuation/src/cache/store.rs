//! Shared price cache keyed by normalized component name

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::entry::{CacheEntry, FreshnessPolicy};
use crate::normalize::best_match;

/// A cache hit, possibly reached through fuzzy matching.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit {
    pub entry: CacheEntry,
    /// Present when the hit came from a different, similar key
    pub fuzzy_score: Option<f64>,
}

impl CacheHit {
    pub fn is_fuzzy(&self) -> bool {
        self.fuzzy_score.is_some()
    }
}

/// Concurrent key → entry map.
///
/// Reads never mutate. Writes are atomic per key and last-write-wins, so two
/// evaluations missing the same component at once both land and the later
/// one is what subsequent lookups see.
pub struct PriceCache {
    entries: DashMap<String, CacheEntry>,
    freshness: FreshnessPolicy,
    similarity_threshold: f64,
}

impl PriceCache {
    pub fn new(freshness: FreshnessPolicy, similarity_threshold: f64) -> Self {
        Self {
            entries: DashMap::new(),
            freshness,
            similarity_threshold,
        }
    }

    pub fn freshness(&self) -> FreshnessPolicy {
        self.freshness
    }

    /// Exact, fresh entry for `key`.
    pub fn lookup(&self, key: &str) -> Option<CacheEntry> {
        self.lookup_at(key, Utc::now())
    }

    pub fn lookup_at(&self, key: &str, now: DateTime<Utc>) -> Option<CacheEntry> {
        let entry = self.entries.get(key)?;
        if self.freshness.is_fresh(entry.value(), now) {
            Some(entry.value().clone())
        } else {
            debug!("Cache entry for '{}' is stale", key);
            None
        }
    }

    /// Exact lookup, then the most similar fresh key above the threshold.
    pub fn resolve(&self, key: &str) -> Option<CacheHit> {
        let now = Utc::now();
        if let Some(entry) = self.lookup_at(key, now) {
            return Some(CacheHit {
                entry,
                fuzzy_score: None,
            });
        }

        let fresh_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|e| self.freshness.is_fresh(e.value(), now))
            .map(|e| e.key().clone())
            .collect();

        let found = best_match(key, &fresh_keys, self.similarity_threshold)?;
        debug!("Fuzzy cache match '{}' → '{}' ({:.3})", key, found.key, found.score);
        let entry = self.lookup_at(&found.key, now)?;
        Some(CacheHit {
            entry,
            fuzzy_score: Some(found.score),
        })
    }

    /// Store `entry` under `key`, returning whatever it replaced.
    pub fn upsert(&self, key: &str, mut entry: CacheEntry) -> Option<CacheEntry> {
        entry.normalized_key = key.to_string();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let previous = occupied.insert(entry);
                if !previous.same_prices(occupied.get()) {
                    debug!(
                        "Cache entry '{}' overwritten: {} → {}",
                        key,
                        previous.estimated_price,
                        occupied.get().estimated_price
                    );
                }
                Some(previous)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
                None
            }
        }
    }

    /// Every entry, stale ones included, sorted by key.
    pub fn entries(&self) -> Vec<CacheEntry> {
        let mut all: Vec<CacheEntry> = self.entries.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.normalized_key.cmp(&b.normalized_key));
        all
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PriceCache {
    fn default() -> Self {
        Self::new(FreshnessPolicy::NeverExpire, 0.92)
    }
}
