//! Component Estimator: cache first, pricing collaborator on miss

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, PriceCache};
use crate::component::{Category, PartEstimate};
use crate::config::PricingConfig;
use crate::error::bounded;
use crate::normalize::{categorize, normalize, UNKNOWN_KEY};
use crate::pricing::{build_price_source, usable, PriceQuote, PriceSource};

/// Below this the part carries an uncertainty note
pub const LOW_CONFIDENCE: f64 = 0.5;

pub(crate) fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub struct ComponentEstimator {
    source: Arc<dyn PriceSource>,
    used_ratio: f64,
    timeout: Duration,
}

impl ComponentEstimator {
    pub fn new(source: Arc<dyn PriceSource>, used_ratio: f64, timeout: Duration) -> Self {
        Self {
            source,
            used_ratio,
            timeout,
        }
    }

    pub fn from_config(config: &PricingConfig) -> Self {
        Self::new(build_price_source(config), config.used_ratio, config.timeout())
    }

    /// Estimate one raw component name.
    ///
    /// Never fails: an unknown name, a collaborator error or a quote without
    /// any price yields a zero estimate with a note, and nothing is cached.
    pub async fn estimate(&self, raw: &str, cache: &PriceCache) -> PartEstimate {
        let key = normalize(raw);
        let mut part = PartEstimate::new(raw, &key);

        if key == UNKNOWN_KEY {
            part.add_note("unrecognised component name, valued at 0");
            return part.with_category(Category::Other);
        }

        if let Some(hit) = cache.resolve(&key) {
            let entry = hit.entry;
            part = part
                .with_prices(entry.estimated_price, entry.estimated_price_new)
                .with_category(entry.category)
                .mark_cached();
            if let Some(score) = hit.fuzzy_score {
                part.add_note(&format!(
                    "price taken from similar cached part '{}' (similarity {:.2})",
                    entry.normalized_key, score
                ));
            }
            debug!("Cache hit for '{}': {}", key, part.estimated_price);
            return part;
        }

        debug!("Cache miss for '{}', asking {}", key, self.source.name());
        match bounded(self.source.name(), self.timeout, self.source.price_lookup(&key)).await {
            Ok(quote) => self.apply_quote(part, &key, quote, cache),
            Err(e) => {
                warn!("Price lookup for '{}' failed: {}", key, e);
                part.add_note(&format!("price unavailable ({}), valued at 0", e));
                part.with_category(categorize(&key))
            }
        }
    }

    fn apply_quote(
        &self,
        mut part: PartEstimate,
        key: &str,
        quote: PriceQuote,
        cache: &PriceCache,
    ) -> PartEstimate {
        let category = match quote.category {
            Category::Other => categorize(key),
            category => category,
        };
        for note in &quote.notes {
            part.add_note(note);
        }

        let new_price = usable(quote.new_price);
        let direct_used = usable(quote.used_price);
        if (quote.new_price.is_some() && new_price.is_none())
            || (quote.used_price.is_some() && direct_used.is_none())
        {
            part.add_note("ignored invalid price from source");
        }

        let used = direct_used.or_else(|| new_price.map(|new| round_cents(new * self.used_ratio)));
        let Some(mut used) = used else {
            warn!("No pricing signal for '{}'", key);
            part.add_note("no pricing signal, valued at 0");
            return part.with_category(category);
        };

        if let Some(new) = new_price {
            if used > new {
                part.add_note("used price above new price, capped at new");
                used = new;
            }
        }
        if quote.confidence < LOW_CONFIDENCE {
            part.add_note("low-confidence estimate");
        }

        cache.upsert(
            key,
            CacheEntry::new(key, used, new_price, category, self.source.name()),
        );
        debug!("Estimated '{}' at {} (new {:?})", key, used, new_price);
        part.with_prices(used, new_price).with_category(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::{HeuristicPriceSource, MockPriceSource};

    fn estimator(source: MockPriceSource) -> (ComponentEstimator, Arc<MockPriceSource>) {
        let source = Arc::new(source);
        let estimator = ComponentEstimator::new(source.clone(), 0.65, Duration::from_millis(100));
        (estimator, source)
    }

    #[tokio::test]
    async fn test_second_lookup_is_cached() {
        let (estimator, source) = estimator(
            MockPriceSource::new().with_quote("rx 6800xt", PriceQuote::from_new(500.0, Category::Gpu)),
        );
        let cache = PriceCache::default();

        let first = estimator.estimate("AMD RX 6800XT", &cache).await;
        assert!(!first.cached);
        assert_eq!(first.estimated_price, 325.0);
        assert_eq!(first.estimated_price_new, Some(500.0));
        assert_eq!(first.category, Category::Gpu);

        let second = estimator.estimate("RX 6800 XT", &cache).await;
        assert!(second.cached);
        assert_eq!(second.estimated_price, first.estimated_price);
        assert_eq!(second.estimated_price_new, Some(500.0));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_depreciation_ratio() {
        let cache = PriceCache::default();
        let estimator = ComponentEstimator::new(
            Arc::new(HeuristicPriceSource::new()),
            0.65,
            Duration::from_millis(100),
        );
        assert_eq!(estimator.estimate("Ryzen 5 7600x", &cache).await.estimated_price, 149.5);
        assert_eq!(estimator.estimate("16GB DDR4", &cache).await.estimated_price, 52.0);
        assert_eq!(estimator.estimate("SSD 500GB", &cache).await.estimated_price, 32.5);

        let thrifty = ComponentEstimator::new(
            Arc::new(HeuristicPriceSource::new()),
            0.5,
            Duration::from_millis(100),
        );
        let cache = PriceCache::default();
        assert_eq!(thrifty.estimate("RX 6800XT", &cache).await.estimated_price, 250.0);
    }

    #[tokio::test]
    async fn test_direct_used_price_wins_and_is_capped() {
        let (estimator, _) = estimator(
            MockPriceSource::new()
                .with_quote("rtx 3060", PriceQuote::from_new(350.0, Category::Gpu).with_used(200.0))
                .with_quote("rtx 3070", PriceQuote::from_new(500.0, Category::Gpu).with_used(600.0)),
        );
        let cache = PriceCache::default();

        let direct = estimator.estimate("RTX 3060", &cache).await;
        assert_eq!(direct.estimated_price, 200.0);

        let capped = estimator.estimate("RTX 3070", &cache).await;
        assert_eq!(capped.estimated_price, 500.0);
        assert!(capped.prices_consistent());
        assert!(capped.notes.contains("capped"));
    }

    #[tokio::test]
    async fn test_unknown_name() {
        let (estimator, source) = estimator(MockPriceSource::flat(100.0));
        let cache = PriceCache::default();

        let part = estimator.estimate("   ", &cache).await;
        assert_eq!(part.normalized_key, UNKNOWN_KEY);
        assert_eq!(part.estimated_price, 0.0);
        assert_eq!(part.category, Category::Other);
        assert!(!part.notes.is_empty());
        assert_eq!(source.calls(), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_collaborator_failure_degrades() {
        let (estimator, _) = estimator(MockPriceSource::failing());
        let cache = PriceCache::default();

        let part = estimator.estimate("RTX 3060", &cache).await;
        assert_eq!(part.estimated_price, 0.0);
        assert_eq!(part.category, Category::Gpu);
        assert!(!part.cached);
        assert!(part.notes.contains("price unavailable"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_collaborator_timeout_degrades() {
        let (estimator, _) = estimator(MockPriceSource::flat(100.0).with_delay(Duration::from_millis(500)));
        let cache = PriceCache::default();

        let part = estimator.estimate("RTX 3060", &cache).await;
        assert_eq!(part.estimated_price, 0.0);
        assert!(part.notes.contains("timed out"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_no_signal_is_not_cached() {
        let (estimator, _) = estimator(
            MockPriceSource::new()
                .with_quote("mystery part", PriceQuote::unknown(Category::Other))
                .with_quote("broken part", PriceQuote::from_new(-5.0, Category::Other)),
        );
        let cache = PriceCache::default();

        let unknown = estimator.estimate("Mystery Part", &cache).await;
        assert_eq!(unknown.estimated_price, 0.0);
        assert!(unknown.notes.contains("no pricing signal"));

        let broken = estimator.estimate("Broken Part", &cache).await;
        assert_eq!(broken.estimated_price, 0.0);
        assert!(broken.notes.contains("ignored invalid price"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_low_confidence_note() {
        let (estimator, _) = estimator(
            MockPriceSource::new()
                .with_quote("old gpu", PriceQuote::from_new(100.0, Category::Gpu).with_confidence(0.3)),
        );
        let cache = PriceCache::default();
        let part = estimator.estimate("Old GPU", &cache).await;
        assert_eq!(part.estimated_price, 65.0);
        assert!(part.notes.contains("low-confidence"));
    }

    #[tokio::test]
    async fn test_fuzzy_cache_hit_noted() {
        let (estimator, source) = estimator(MockPriceSource::flat(100.0));
        let cache = PriceCache::default();
        cache.upsert(
            "asrock x670e steel legend",
            CacheEntry::new("asrock x670e steel legend", 162.5, Some(250.0), Category::Other, "test"),
        );

        let part = estimator.estimate("ASRock X670E Steel Legnd", &cache).await;
        assert!(part.cached);
        assert_eq!(part.estimated_price, 162.5);
        assert_eq!(part.normalized_key, "asrock x670e steel legnd");
        assert!(part.notes.contains("similar cached part"));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_misses_same_key() {
        let (estimator, _) = estimator(
            MockPriceSource::flat(200.0).with_delay(Duration::from_millis(10)),
        );
        let cache = PriceCache::default();

        let (a, b) = tokio::join!(
            estimator.estimate("Noctua NH-D15", &cache),
            estimator.estimate("noctua nh d15", &cache)
        );
        assert_eq!(a.estimated_price, 130.0);
        assert_eq!(b.estimated_price, 130.0);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup("noctua nh d15").unwrap().estimated_price, 130.0);
    }
}
