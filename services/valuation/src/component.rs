//! Core component types: category tags and per-part estimates

use serde::{Deserialize, Serialize};
use std::fmt;

/// Component category. Unrecognised labels in older history files land in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "CPU")]
    Cpu,
    #[serde(rename = "GPU")]
    Gpu,
    #[serde(rename = "RAM")]
    Ram,
    Storage,
    #[serde(rename = "PSU")]
    Psu,
    #[default]
    #[serde(other)]
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Cpu => "CPU",
            Category::Gpu => "GPU",
            Category::Ram => "RAM",
            Category::Storage => "Storage",
            Category::Psu => "PSU",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Valuation of a single listed part.
///
/// Field names are part of the persisted history format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartEstimate {
    /// Raw name as it appeared in the listing
    pub component: String,
    #[serde(rename = "normalizedKey", default)]
    pub normalized_key: String,
    /// Used-market value
    pub estimated_price: f64,
    /// New-market reference, when known
    #[serde(default)]
    pub estimated_price_new: Option<f64>,
    #[serde(default)]
    pub cached: bool,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub notes: String,
}

impl PartEstimate {
    pub fn new(component: &str, normalized_key: &str) -> Self {
        Self {
            component: component.to_string(),
            normalized_key: normalized_key.to_string(),
            estimated_price: 0.0,
            estimated_price_new: None,
            cached: false,
            category: Category::Other,
            notes: String::new(),
        }
    }

    pub fn with_prices(mut self, used: f64, new: Option<f64>) -> Self {
        self.estimated_price = used;
        self.estimated_price_new = new;
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn mark_cached(mut self) -> Self {
        self.cached = true;
        self
    }

    /// Append a provenance/uncertainty note, `; `-separated.
    pub fn add_note(&mut self, note: &str) {
        if note.is_empty() {
            return;
        }
        if !self.notes.is_empty() {
            self.notes.push_str("; ");
        }
        self.notes.push_str(note);
    }

    /// used ≤ new whenever both are present
    pub fn prices_consistent(&self) -> bool {
        match self.estimated_price_new {
            Some(new) => self.estimated_price <= new + 1e-9,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_labels() {
        assert_eq!(serde_json::to_string(&Category::Cpu).unwrap(), "\"CPU\"");
        assert_eq!(serde_json::to_string(&Category::Storage).unwrap(), "\"Storage\"");
        let parsed: Category = serde_json::from_str("\"PSU\"").unwrap();
        assert_eq!(parsed, Category::Psu);
        let legacy: Category = serde_json::from_str("\"Motherboard\"").unwrap();
        assert_eq!(legacy, Category::Other);
    }

    #[test]
    fn test_notes_accumulate() {
        let mut part = PartEstimate::new("RTX 3060", "rtx 3060");
        part.add_note("");
        assert!(part.notes.is_empty());
        part.add_note("assumed 12GB variant");
        part.add_note("low-confidence estimate");
        assert_eq!(part.notes, "assumed 12GB variant; low-confidence estimate");
    }

    #[test]
    fn test_legacy_part_deserializes_with_defaults() {
        let json = r#"{"component": "i5 7600K", "estimated_price": 40}"#;
        let part: PartEstimate = serde_json::from_str(json).unwrap();
        assert_eq!(part.estimated_price, 40.0);
        assert_eq!(part.estimated_price_new, None);
        assert!(!part.cached);
        assert_eq!(part.category, Category::Other);
        assert!(part.normalized_key.is_empty());
    }

    #[test]
    fn test_serialized_field_names() {
        let part = PartEstimate::new("AMD RX 6800XT", "rx 6800xt")
            .with_prices(325.0, Some(500.0))
            .with_category(Category::Gpu);
        let value = serde_json::to_value(&part).unwrap();
        assert_eq!(value["normalizedKey"], "rx 6800xt");
        assert_eq!(value["estimated_price"], 325.0);
        assert_eq!(value["estimated_price_new"], 500.0);
        assert_eq!(value["cached"], false);
        assert_eq!(value["category"], "GPU");
        assert!(part.prices_consistent());
    }
}
