use async_trait::async_trait;

use crate::error::CollaboratorError;
use crate::valuation::EvaluationFacts;

/// Free-text explanation of an evaluation. Never consulted for the verdict.
#[async_trait]
pub trait ReasoningGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn summarize(&self, facts: &EvaluationFacts) -> Result<String, CollaboratorError>;
}
