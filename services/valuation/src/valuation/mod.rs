//! Aggregation, verdicts and the evaluation record

pub mod aggregate;
pub mod evaluation;
pub mod listing;
pub mod verdict;

pub use aggregate::{aggregate, Aggregate, UNPRICED_MARGIN};
pub use evaluation::{EvaluationFacts, EvaluationId, ListingEvaluation};
pub use listing::{canonical_url, parse_price, RawListing};
pub use verdict::{decide, Verdict, VerdictPolicy, VerdictRule};
