//! Deterministic reasoning text built from the evaluation facts

use async_trait::async_trait;

use super::traits::ReasoningGenerator;
use crate::error::CollaboratorError;
use crate::valuation::{EvaluationFacts, Verdict};

#[derive(Debug, Clone, Default)]
pub struct TemplateReasoner;

impl TemplateReasoner {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, facts: &EvaluationFacts) -> String {
        let mut sentences = Vec::new();

        if facts.price > 0.0 {
            sentences.push(format!(
                "The parts are estimated at {:.2} EUR against an asking price of {:.2} EUR, a {} of {:.2} EUR ({:+.1}%).",
                facts.estimated,
                facts.price,
                if facts.profit >= 0.0 { "profit" } else { "loss" },
                facts.profit.abs(),
                facts.margin * 100.0
            ));
        } else {
            sentences.push(format!(
                "No asking price is given; the parts are estimated at {:.2} EUR.",
                facts.estimated
            ));
        }

        if let Some(top) = facts
            .parts
            .iter()
            .filter(|p| p.estimated_price > 0.0)
            .max_by(|a, b| a.estimated_price.total_cmp(&b.estimated_price))
        {
            sentences.push(format!(
                "Most of the value sits in the {} ({:.2} EUR).",
                top.component, top.estimated_price
            ));
        }

        let unpriced = facts.parts.iter().filter(|p| p.estimated_price == 0.0).count();
        if unpriced > 0 {
            sentences.push(format!("{} part(s) contribute no resale value.", unpriced));
        }

        sentences.push(match facts.verdict {
            Verdict::Buy => "Recommendation: BUY.".to_string(),
            Verdict::Pass => "Recommendation: PASS.".to_string(),
        });
        sentences.join(" ")
    }
}

#[async_trait]
impl ReasoningGenerator for TemplateReasoner {
    fn name(&self) -> &str {
        "template"
    }

    async fn summarize(&self, facts: &EvaluationFacts) -> Result<String, CollaboratorError> {
        Ok(self.render(facts))
    }
}
