//! Pricing knowledge collaborators

pub mod heuristic;
pub mod mock;
pub mod traits;

pub use heuristic::{HeuristicPriceSource, StaticPriceSource};
pub use mock::MockPriceSource;
pub use traits::{usable, PriceQuote, PriceSource};

use std::sync::Arc;

use crate::config::{PriceSourceKind, PricingConfig};

/// Price source selected by `[pricing] source`.
pub fn build_price_source(config: &PricingConfig) -> Arc<dyn PriceSource> {
    match config.source {
        PriceSourceKind::Heuristic => Arc::new(HeuristicPriceSource::new()),
        PriceSourceKind::Static => {
            let source = StaticPriceSource::new(&config.static_prices);
            tracing::info!("Static price source with {} entries", source.len());
            Arc::new(source)
        }
    }
}
