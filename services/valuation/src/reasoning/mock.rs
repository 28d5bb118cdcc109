use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::{sleep, Duration};

use super::traits::ReasoningGenerator;
use crate::error::CollaboratorError;
use crate::valuation::EvaluationFacts;

/// Canned reasoning text, optionally slow or failing.
pub struct MockReasoner {
    response: String,
    delay: Option<Duration>,
    failing: bool,
    calls: AtomicUsize,
}

impl MockReasoner {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            delay: None,
            failing: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        let mut reasoner = Self::new("");
        reasoner.failing = true;
        reasoner
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ReasoningGenerator for MockReasoner {
    fn name(&self) -> &str {
        "mock-reasoner"
    }

    async fn summarize(&self, facts: &EvaluationFacts) -> Result<String, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }
        if self.failing {
            return Err(CollaboratorError::unavailable(self.name(), "mock failure"));
        }
        Ok(self.response.replace("{verdict}", facts.verdict.as_str()))
    }
}
