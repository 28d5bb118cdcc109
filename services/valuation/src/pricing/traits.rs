use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::component::Category;
use crate::error::CollaboratorError;

/// What a pricing collaborator knows about one normalized key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Direct used-market price, if the source has one
    pub used_price: Option<f64>,
    pub new_price: Option<f64>,
    pub category: Category,
    /// 0.0..=1.0
    pub confidence: f64,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl PriceQuote {
    pub fn from_new(new_price: f64, category: Category) -> Self {
        Self {
            used_price: None,
            new_price: Some(new_price),
            category,
            confidence: 1.0,
            notes: Vec::new(),
        }
    }

    /// A quote with no price at all
    pub fn unknown(category: Category) -> Self {
        Self {
            used_price: None,
            new_price: None,
            category,
            confidence: 0.0,
            notes: Vec::new(),
        }
    }

    pub fn with_used(mut self, used_price: f64) -> Self {
        self.used_price = Some(used_price);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_note(mut self, note: &str) -> Self {
        self.notes.push(note.to_string());
        self
    }
}

/// Finite, non-negative prices only
pub fn usable(price: Option<f64>) -> Option<f64> {
    price.filter(|p| p.is_finite() && *p >= 0.0)
}

/// External pricing knowledge: `priceLookup(normalizedKey)`.
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &str;

    async fn price_lookup(&self, normalized_key: &str) -> Result<PriceQuote, CollaboratorError>;
}
