//! Listing Aggregator: parts → (estimated, profit, margin)

use serde::{Deserialize, Serialize};

use crate::component::PartEstimate;

/// Margin reported for a listing without a usable price but with value in it
pub const UNPRICED_MARGIN: f64 = 1.0;

/// Tolerance for recomputation checks
pub const EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub estimated: f64,
    pub profit: f64,
    /// profit / price as a ratio (−0.27 is −27%)
    pub margin: f64,
}

/// Sum used-market estimates and relate them to the asking price.
///
/// `price` of `None`, zero or below counts as unspecified: profit is then the
/// full estimate and the margin is [`UNPRICED_MARGIN`] (or 0 when nothing is
/// worth anything).
pub fn aggregate(parts: &[PartEstimate], price: Option<f64>) -> Aggregate {
    let estimated: f64 = parts.iter().map(|p| p.estimated_price).sum();

    match price.filter(|p| p.is_finite() && *p > 0.0) {
        Some(price) => {
            let profit = estimated - price;
            Aggregate {
                estimated,
                profit,
                margin: profit / price,
            }
        }
        None => Aggregate {
            estimated,
            profit: estimated,
            margin: if estimated > 0.0 { UNPRICED_MARGIN } else { 0.0 },
        },
    }
}

impl Aggregate {
    pub fn approx_eq(&self, other: &Aggregate) -> bool {
        (self.estimated - other.estimated).abs() <= EPSILON
            && (self.profit - other.profit).abs() <= EPSILON
            && (self.margin - other.margin).abs() <= EPSILON
    }
}
