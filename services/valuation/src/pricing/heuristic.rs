//! Built-in price tables: keyword heuristics and a configured static map

use async_trait::async_trait;
use std::collections::HashMap;

use super::traits::{PriceQuote, PriceSource};
use crate::component::Category;
use crate::error::CollaboratorError;
use crate::normalize::{categorize, KeyTokens};

/// Confidence for a rule naming an exact model
const SPECIFIC: f64 = 0.9;
/// Confidence for a family-level rule (any GPU, any DDR4 stick, ...)
const GENERIC: f64 = 0.5;
/// Nothing matched
const FALLBACK: f64 = 0.2;
const FALLBACK_NEW_PRICE: f64 = 50.0;

/// (family token, model number, new price)
const GPU_MODELS: &[(&str, &str, f64)] = &[
    ("rtx", "4090", 1800.0),
    ("rtx", "4080", 1200.0),
    ("rtx", "4070", 700.0),
    ("rtx", "4060", 320.0),
    ("rtx", "3090", 1000.0),
    ("rtx", "3080", 700.0),
    ("rtx", "3070", 500.0),
    ("rtx", "3060", 350.0),
    ("rx", "6800", 500.0),
    ("rx", "6700", 380.0),
    ("rx", "6600", 250.0),
    ("rx", "7900", 750.0),
    ("rx", "7800", 400.0),
];

const CPU_MODELS: &[(&str, &str, f64)] = &[
    ("ryzen", "7950x", 500.0),
    ("ryzen", "7900x", 400.0),
    ("ryzen", "7700x", 300.0),
    ("ryzen", "7600x", 230.0),
    ("i9", "13900k", 580.0),
    ("i7", "13700k", 420.0),
    ("i5", "13600k", 280.0),
];

const GENERIC_GPU: &[&str] = &["gpu", "graphics", "gtx", "radeon", "geforce", "rtx", "rx"];
const GENERIC_CPU: &[&str] = &[
    "cpu", "processor", "processeur", "ryzen", "i3", "i5", "i7", "i9", "xeon",
];
const GENERIC_RAM: &[&str] = &["ram", "memory", "memoire", "ddr", "ddr3", "ddr4", "ddr5"];
const MODERN_DDR: &[&str] = &["ddr4", "ddr5"];
const FLASH: &[&str] = &["ssd", "nvme", "m2"];
const GENERIC_STORAGE: &[&str] = &["ssd", "nvme", "m2", "storage", "hdd", "disque"];
const MOTHERBOARD: &[&str] = &["motherboard", "mobo"];
const MOTHERBOARD_CHIPSETS: &[&str] = &["x870", "z790"];
const PREMIUM_PSU: &[&str] = &["corsair", "seasonic"];
const PSU: &[&str] = &["psu", "alimentation", "alim"];
const CASE: &[&str] = &["case", "chassis", "boitier", "tower"];
const PREMIUM_CASE: &[&str] = &["corsair", "nzxt", "lianli"];
const COOLER: &[&str] = &["cooler", "heatsink", "ventirad", "aio"];
const PREMIUM_COOLER: &[&str] = &["corsair", "noctua"];

/// `rtx 3060`, `rtx 3060ti` and `rtx3060` all name the same model family
fn names_model(tokens: &KeyTokens<'_>, family: &str, model: &str) -> bool {
    (tokens.has(family) && tokens.has_prefix(model)) || tokens.has_prefix(&format!("{}{}", family, model))
}

/// Largest kit count read from an `<n>x` token, as the normalizer only glues two digits
const MAX_KIT_COUNT: u32 = 99;

/// Total capacity in GB, honouring `2x 16gb` style kits and TB sizes.
/// Absurd sizes overflow to None and fall through to the generic rules.
fn capacity_gb(tokens: &KeyTokens<'_>) -> Option<u32> {
    let per_unit = match (tokens.quantity("tb"), tokens.quantity("gb")) {
        (Some(tb), _) => tb.checked_mul(1000)?,
        (None, Some(gb)) => gb,
        (None, None) => return None,
    };
    let count = tokens
        .quantity("x")
        .filter(|n| *n <= MAX_KIT_COUNT)
        .unwrap_or(1)
        .max(1);
    per_unit.checked_mul(count)
}

/// Heuristic new price for a normalized key: (price, confidence, note)
fn estimate_new_price(key: &str) -> (f64, f64, Option<&'static str>) {
    let tokens = KeyTokens::new(key);

    for (family, model, price) in GPU_MODELS {
        if names_model(&tokens, family, model) {
            return (*price, SPECIFIC, None);
        }
    }
    if tokens.has_any(GENERIC_GPU) {
        return (400.0, GENERIC, Some("generic GPU estimate, model not recognised"));
    }

    for (family, model, price) in CPU_MODELS {
        if names_model(&tokens, family, model) {
            return (*price, SPECIFIC, None);
        }
    }
    if tokens.has_any(GENERIC_CPU) || (tokens.has("core") && tokens.has_prefix("i")) {
        return (250.0, GENERIC, Some("generic CPU estimate, model not recognised"));
    }

    if tokens.has_any(MODERN_DDR) {
        match capacity_gb(&tokens) {
            Some(32) => return (150.0, SPECIFIC, None),
            Some(16) => return (80.0, SPECIFIC, None),
            Some(8) => return (40.0, SPECIFIC, None),
            _ => {}
        }
    }
    if tokens.has_any(GENERIC_RAM) {
        return (60.0, GENERIC, Some("generic RAM estimate, capacity assumed"));
    }

    if tokens.has_any(FLASH) {
        match capacity_gb(&tokens) {
            Some(2000) => return (150.0, SPECIFIC, None),
            Some(1000) => return (80.0, SPECIFIC, None),
            Some(500) | Some(512) => return (50.0, SPECIFIC, None),
            _ => {}
        }
    }
    if tokens.has_any(GENERIC_STORAGE) {
        return (70.0, GENERIC, Some("generic storage estimate, capacity assumed"));
    }

    if tokens.has_any(MOTHERBOARD) || MOTHERBOARD_CHIPSETS.iter().any(|c| tokens.has_prefix(c)) {
        return (250.0, GENERIC, Some("motherboard priced at family level"));
    }

    let is_psu = tokens.has_any(PSU) || tokens.has("power") || tokens.has_quantity("w");
    if is_psu && tokens.has_any(PREMIUM_PSU) {
        return match tokens.quantity("w") {
            Some(1000) => (180.0, SPECIFIC, None),
            Some(850) => (150.0, SPECIFIC, None),
            Some(750) => (120.0, SPECIFIC, None),
            _ => (100.0, GENERIC, Some("premium PSU, wattage not recognised")),
        };
    }
    if is_psu {
        return (0.0, GENERIC, Some("generic PSU valued at 0"));
    }

    if tokens.has_any(CASE) {
        return if tokens.has_any(PREMIUM_CASE) {
            (100.0, GENERIC, None)
        } else {
            (0.0, GENERIC, Some("generic case valued at 0"))
        };
    }

    if tokens.has_any(COOLER) {
        return if tokens.has_any(PREMIUM_COOLER) {
            (80.0, GENERIC, None)
        } else {
            (20.0, GENERIC, None)
        };
    }

    (FALLBACK_NEW_PRICE, FALLBACK, Some("no price rule matched, default estimate"))
}

/// Keyword table standing in for a market-data service.
#[derive(Debug, Clone, Default)]
pub struct HeuristicPriceSource;

impl HeuristicPriceSource {
    pub fn new() -> Self {
        Self
    }

    pub fn quote(&self, normalized_key: &str) -> PriceQuote {
        let (new_price, confidence, note) = estimate_new_price(normalized_key);
        let quote = PriceQuote::from_new(new_price, categorize(normalized_key)).with_confidence(confidence);
        match note {
            Some(note) => quote.with_note(note),
            None => quote,
        }
    }
}

#[async_trait]
impl PriceSource for HeuristicPriceSource {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn price_lookup(&self, normalized_key: &str) -> Result<PriceQuote, CollaboratorError> {
        Ok(self.quote(normalized_key))
    }
}

/// New prices read from `[pricing.static_prices]`. Keys are normalized on load.
#[derive(Debug, Clone, Default)]
pub struct StaticPriceSource {
    prices: HashMap<String, f64>,
}

impl StaticPriceSource {
    pub fn new(prices: &HashMap<String, f64>) -> Self {
        let prices = prices
            .iter()
            .map(|(key, price)| (crate::normalize::normalize(key), *price))
            .collect();
        Self { prices }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn price_lookup(&self, normalized_key: &str) -> Result<PriceQuote, CollaboratorError> {
        match self.prices.get(normalized_key) {
            Some(price) if price.is_finite() && *price >= 0.0 => {
                Ok(PriceQuote::from_new(*price, categorize(normalized_key)))
            }
            Some(price) => Err(CollaboratorError::malformed(
                self.name(),
                format!("configured price {} for '{}' is not a valid amount", price, normalized_key),
            )),
            None => Err(CollaboratorError::unavailable(
                self.name(),
                format!("no price configured for '{}'", normalized_key),
            )),
        }
    }
}
