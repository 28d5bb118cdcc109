use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::component::Category;

/// Last-known prices for one normalized component key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub normalized_key: String,
    pub estimated_price: f64,
    #[serde(default)]
    pub estimated_price_new: Option<f64>,
    #[serde(default)]
    pub category: Category,
    pub last_updated: DateTime<Utc>,
    /// Which price source produced the entry
    #[serde(default)]
    pub source: String,
}

impl CacheEntry {
    pub fn new(
        normalized_key: &str,
        estimated_price: f64,
        estimated_price_new: Option<f64>,
        category: Category,
        source: &str,
    ) -> Self {
        Self {
            normalized_key: normalized_key.to_string(),
            estimated_price,
            estimated_price_new,
            category,
            last_updated: Utc::now(),
            source: source.to_string(),
        }
    }

    pub fn with_last_updated(mut self, last_updated: DateTime<Utc>) -> Self {
        self.last_updated = last_updated;
        self
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.last_updated)
    }

    /// Same prices and category, ignoring timestamps and provenance
    pub fn same_prices(&self, other: &CacheEntry) -> bool {
        self.estimated_price == other.estimated_price
            && self.estimated_price_new == other.estimated_price_new
            && self.category == other.category
    }
}

/// When a cached entry stops counting as a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FreshnessPolicy {
    #[default]
    NeverExpire,
    MaxAge(chrono::Duration),
}

impl FreshnessPolicy {
    pub fn from_max_age(max_age: Option<chrono::Duration>) -> Self {
        match max_age {
            Some(age) => FreshnessPolicy::MaxAge(age),
            None => FreshnessPolicy::NeverExpire,
        }
    }

    pub fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        match self {
            FreshnessPolicy::NeverExpire => true,
            FreshnessPolicy::MaxAge(max_age) => entry.age(now) <= *max_age,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freshness_policy() {
        let now = Utc::now();
        let entry = CacheEntry::new("old gpu", 325.0, Some(500.0), Category::Gpu, "test")
            .with_last_updated(now - chrono::Duration::days(31));

        assert!(FreshnessPolicy::NeverExpire.is_fresh(&entry, now));
        let monthly = FreshnessPolicy::from_max_age(Some(chrono::Duration::days(30)));
        assert!(!monthly.is_fresh(&entry, now));
        let quarterly = FreshnessPolicy::MaxAge(chrono::Duration::days(90));
        assert!(quarterly.is_fresh(&entry, now));
    }

    #[test]
    fn test_same_prices_ignores_timestamp() {
        let a = CacheEntry::new("rtx 3060", 227.5, Some(350.0), Category::Gpu, "heuristic");
        let b = a.clone().with_last_updated(Utc::now() - chrono::Duration::hours(1));
        assert!(a.same_prices(&b));
        let c = CacheEntry::new("rtx 3060", 200.0, Some(350.0), Category::Gpu, "heuristic");
        assert!(!a.same_prices(&c));
    }
}
