//! Comparing successive evaluations of the same ad
//!
//! The store keeps every evaluation. Callers that want deduplication decide
//! here whether a new evaluation says anything the previous one did not.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::valuation::{EvaluationId, ListingEvaluation, Verdict};

/// Price/estimate movements below this are noise
pub const DEFAULT_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationDelta {
    pub previous_id: EvaluationId,
    pub next_id: EvaluationId,
    pub price_change: f64,
    pub estimated_change: f64,
    pub margin_change: f64,
    pub previous_verdict: Verdict,
    pub next_verdict: Verdict,
    /// Normalized keys added, removed or re-priced between the two
    pub changed_parts: Vec<String>,
}

impl EvaluationDelta {
    pub fn verdict_flipped(&self) -> bool {
        self.previous_verdict != self.next_verdict
    }

    pub fn is_equivalent(&self, tolerance: f64) -> bool {
        !self.verdict_flipped()
            && self.price_change.abs() <= tolerance
            && self.estimated_change.abs() <= tolerance
            && self.changed_parts.is_empty()
    }
}

fn priced_parts(evaluation: &ListingEvaluation) -> BTreeMap<&str, f64> {
    let mut totals = BTreeMap::new();
    for part in &evaluation.parts {
        *totals.entry(part.normalized_key.as_str()).or_insert(0.0) += part.estimated_price;
    }
    totals
}

pub fn compare(previous: &ListingEvaluation, next: &ListingEvaluation) -> EvaluationDelta {
    let before = priced_parts(previous);
    let after = priced_parts(next);

    let mut changed_parts: Vec<String> = Vec::new();
    for (key, price) in &before {
        match after.get(key) {
            Some(now) if (now - price).abs() <= DEFAULT_TOLERANCE => {}
            _ => changed_parts.push(key.to_string()),
        }
    }
    for key in after.keys() {
        if !before.contains_key(key) {
            changed_parts.push(key.to_string());
        }
    }
    changed_parts.sort();

    EvaluationDelta {
        previous_id: previous.id.clone(),
        next_id: next.id.clone(),
        price_change: next.price - previous.price,
        estimated_change: next.estimated - previous.estimated,
        margin_change: next.margin - previous.margin,
        previous_verdict: previous.verdict,
        next_verdict: next.verdict,
        changed_parts,
    }
}

/// Whether `next` is worth appending given the latest stored evaluation.
pub fn is_new_information(previous: Option<&ListingEvaluation>, next: &ListingEvaluation) -> bool {
    match previous {
        Some(previous) => !compare(previous, next).is_equivalent(DEFAULT_TOLERANCE),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::PartEstimate;
    use crate::history::IdGenerator;
    use crate::valuation::VerdictPolicy;

    fn evaluation(ids: &IdGenerator, price: f64, parts: &[(&str, f64)]) -> ListingEvaluation {
        let (_, at) = ids.next();
        let parts = parts
            .iter()
            .map(|(key, used)| PartEstimate::new(key, key).with_prices(*used, None))
            .collect();
        ListingEvaluation::assemble(
            at,
            "https://example.com/ad/1",
            "PC",
            Some(price),
            parts,
            &VerdictPolicy::default(),
        )
    }

    #[test]
    fn test_same_result_is_equivalent() {
        let ids = IdGenerator::new();
        let a = evaluation(&ids, 300.0, &[("rtx 3060", 227.5), ("ddr4 16gb", 52.0)]);
        let b = evaluation(&ids, 300.0, &[("ddr4 16gb", 52.0), ("rtx 3060", 227.5)]);
        let delta = compare(&a, &b);
        assert!(delta.is_equivalent(DEFAULT_TOLERANCE));
        assert!(!is_new_information(Some(&a), &b));
        assert!(is_new_information(None, &b));
    }

    #[test]
    fn test_cache_warming_drift() {
        let ids = IdGenerator::new();
        let a = evaluation(&ids, 300.0, &[("rtx 3060", 0.0), ("ddr4 16gb", 52.0)]);
        let b = evaluation(&ids, 300.0, &[("rtx 3060", 227.5), ("ddr4 16gb", 52.0), ("ssd 1tb", 52.0)]);
        let delta = compare(&a, &b);
        assert_eq!(delta.estimated_change, 279.5);
        assert_eq!(delta.changed_parts, vec!["rtx 3060", "ssd 1tb"]);
        assert!(!delta.verdict_flipped());
        assert!(is_new_information(Some(&a), &b));
    }

    #[test]
    fn test_price_drop_flips_verdict() {
        let ids = IdGenerator::new();
        let a = evaluation(&ids, 400.0, &[("rtx 3060", 227.5), ("ryzen 5 7600x", 149.5)]);
        let b = evaluation(&ids, 200.0, &[("rtx 3060", 227.5), ("ryzen 5 7600x", 149.5)]);
        let delta = compare(&a, &b);
        assert_eq!(delta.price_change, -200.0);
        assert_eq!(delta.previous_verdict, Verdict::Pass);
        assert_eq!(delta.next_verdict, Verdict::Buy);
        assert!(delta.verdict_flipped());
        assert!(delta.changed_parts.is_empty());
    }
}
