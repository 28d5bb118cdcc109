//! The persisted evaluation record

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::aggregate::{aggregate, Aggregate};
use super::verdict::{Verdict, VerdictPolicy};
use crate::component::PartEstimate;

const ID_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Time-ordered evaluation identifier, an ISO-8601 local timestamp with
/// microseconds. Fixed width, so string order is creation order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationId(String);

impl EvaluationId {
    pub fn from_timestamp(at: NaiveDateTime) -> Self {
        Self(at.format(ID_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.0, ID_FORMAT).ok()
    }
}

impl fmt::Display for EvaluationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `"2025-12-04 19:15"`, minute precision, as in the history log
mod minute_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M";

    pub fn serialize<S: Serializer>(date: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// One evaluation of one listing at one point in time. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingEvaluation {
    pub id: EvaluationId,
    #[serde(with = "minute_format")]
    pub date: NaiveDateTime,
    pub url: String,
    #[serde(default)]
    pub title: String,
    /// 0 when the listing had no usable price
    pub price: f64,
    pub estimated: f64,
    pub profit: f64,
    pub margin: f64,
    pub verdict: Verdict,
    #[serde(default)]
    pub parts: Vec<PartEstimate>,
    #[serde(default)]
    pub reasoning: String,
    /// Record-level degradations, e.g. a reasoning collaborator that failed
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

/// What the reasoning generator is allowed to see
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationFacts {
    pub title: String,
    pub price: f64,
    pub estimated: f64,
    pub profit: f64,
    pub margin: f64,
    pub verdict: Verdict,
    pub parts: Vec<PartEstimate>,
}

fn truncate_to_minute(at: NaiveDateTime) -> NaiveDateTime {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

impl ListingEvaluation {
    /// Build a record whose derived fields come from `parts` and `price` only.
    pub fn assemble(
        at: NaiveDateTime,
        url: &str,
        title: &str,
        price: Option<f64>,
        parts: Vec<PartEstimate>,
        policy: &VerdictPolicy,
    ) -> Self {
        let price = price.filter(|p| p.is_finite() && *p > 0.0).unwrap_or(0.0);
        let Aggregate {
            estimated,
            profit,
            margin,
        } = aggregate(&parts, Some(price));
        let verdict = policy.decide(price, estimated, margin);

        Self {
            id: EvaluationId::from_timestamp(at),
            date: truncate_to_minute(at),
            url: url.to_string(),
            title: title.to_string(),
            price,
            estimated,
            profit,
            margin,
            verdict,
            parts,
            reasoning: String::new(),
            notes: String::new(),
        }
    }

    /// Re-issue id and date, e.g. when the record is finally stored.
    pub fn restamp(&mut self, at: NaiveDateTime) {
        self.id = EvaluationId::from_timestamp(at);
        self.date = truncate_to_minute(at);
    }

    pub fn with_reasoning(mut self, reasoning: String) -> Self {
        self.reasoning = reasoning;
        self
    }

    pub fn add_note(&mut self, note: &str) {
        if note.is_empty() {
            return;
        }
        if !self.notes.is_empty() {
            self.notes.push_str("; ");
        }
        self.notes.push_str(note);
    }

    pub fn aggregate(&self) -> Aggregate {
        Aggregate {
            estimated: self.estimated,
            profit: self.profit,
            margin: self.margin,
        }
    }

    /// Stored totals match a recomputation from parts and price
    pub fn is_consistent(&self) -> bool {
        aggregate(&self.parts, Some(self.price)).approx_eq(&self.aggregate())
    }

    /// Rewrite the derived totals from parts and price. Returns whether
    /// anything changed. The verdict is left as recorded.
    pub fn recompute(&mut self) -> bool {
        let fresh = aggregate(&self.parts, Some(self.price));
        if fresh.approx_eq(&self.aggregate()) {
            return false;
        }
        self.estimated = fresh.estimated;
        self.profit = fresh.profit;
        self.margin = fresh.margin;
        true
    }

    pub fn facts(&self) -> EvaluationFacts {
        EvaluationFacts {
            title: self.title.clone(),
            price: self.price,
            estimated: self.estimated,
            profit: self.profit,
            margin: self.margin,
            verdict: self.verdict,
            parts: self.parts.clone(),
        }
    }
}
