//! Raw listings as handed over by the ad source

use serde::{Deserialize, Serialize};
use url::Url;

/// One classified ad, as scraped. Fetching and HTML parsing happen upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawListing {
    pub url: String,
    #[serde(default)]
    pub title: String,
    /// Asking price; absent, zero or negative means "unspecified"
    #[serde(default)]
    pub price: Option<f64>,
    /// Raw component names in listing order
    #[serde(default)]
    pub components: Vec<String>,
}

impl RawListing {
    pub fn new(url: &str, title: &str, price: Option<f64>, components: Vec<String>) -> Self {
        Self {
            url: url.to_string(),
            title: title.to_string(),
            price,
            components,
        }
    }

    /// The asking price when it is a usable cost basis
    pub fn effective_price(&self) -> Option<f64> {
        self.price.filter(|p| p.is_finite() && *p > 0.0)
    }

    pub fn canonical_url(&self) -> String {
        canonical_url(&self.url)
    }
}

/// Parse a scraped price string such as `1 500 €` or `1000,50`.
///
/// Returns `None` for empty, unparsable or negative input, which callers
/// treat as an unspecified price.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches(|c: char| c == '€' || c.is_whitespace())
        .to_lowercase()
        .trim_end_matches("eur")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{00A0}' && *c != '\u{202F}' && *c != '\u{2009}' && *c != '€')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    // "1.000,50" → thousands dot, decimal comma; "1000,50" → decimal comma
    let normalized = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) if dot < comma => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (None, Some(_)) => cleaned.replace(',', "."),
        _ => cleaned,
    };

    let value: f64 = normalized.parse().ok()?;
    if value.is_finite() && value >= 0.0 {
        Some(value)
    } else {
        None
    }
}

/// History key for an ad URL: scheme and host lower-cased, query and
/// fragment dropped. Unparsable input is only trimmed.
pub fn canonical_url(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            let mut canonical = url.to_string();
            if canonical.ends_with('/') && url.path() != "/" {
                canonical.pop();
            }
            canonical
        }
        Err(_) => trimmed.to_string(),
    }
}
