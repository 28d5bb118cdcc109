use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::{sleep, Duration};

use super::traits::{PriceQuote, PriceSource};
use crate::component::Category;
use crate::error::CollaboratorError;

/// Scriptable price source for tests and `--mock` runs.
pub struct MockPriceSource {
    quotes: HashMap<String, PriceQuote>,
    fallback: Option<PriceQuote>,
    delay: Option<Duration>,
    failing: bool,
    calls: AtomicUsize,
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self {
            quotes: HashMap::new(),
            fallback: None,
            delay: None,
            failing: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every key quotes the same new price
    pub fn flat(new_price: f64) -> Self {
        let mut source = Self::new();
        source.fallback = Some(PriceQuote::from_new(new_price, Category::Other));
        source
    }

    /// Always reports the collaborator as unavailable
    pub fn failing() -> Self {
        let mut source = Self::new();
        source.failing = true;
        source
    }

    pub fn with_quote(mut self, normalized_key: &str, quote: PriceQuote) -> Self {
        self.quotes.insert(normalized_key.to_string(), quote);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Default for MockPriceSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn price_lookup(&self, normalized_key: &str) -> Result<PriceQuote, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }
        if self.failing {
            return Err(CollaboratorError::unavailable(self.name(), "mock failure"));
        }
        self.quotes
            .get(normalized_key)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| CollaboratorError::unavailable(self.name(), format!("no quote for '{}'", normalized_key)))
    }
}
