//! End-to-end listing evaluation

pub mod evaluator;

pub use evaluator::{EvaluationOutcome, Evaluator, Recorded};
