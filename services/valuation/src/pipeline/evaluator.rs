use anyhow::{Context, Result};
use chrono::Local;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

use crate::cache::PriceCache;
use crate::config::Config;
use crate::error::bounded;
use crate::estimator::ComponentEstimator;
use crate::history::{is_new_information, HistoryStore, IdGenerator};
use crate::reasoning::{build_reasoner, ReasoningGenerator};
use crate::valuation::{canonical_url, ListingEvaluation, RawListing, VerdictPolicy};

const DEFAULT_REASONING_TIMEOUT: Duration = Duration::from_secs(3);

/// Record note prefix when the reasoning collaborator failed or timed out
pub const REASONING_UNAVAILABLE: &str = "reasoning unavailable";

/// What happened when the evaluation was handed to the history store
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum Recorded {
    Appended,
    /// Equivalent to the latest stored evaluation of the same ad
    Unchanged,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationOutcome {
    pub evaluation: ListingEvaluation,
    pub recorded: Recorded,
}

/// normalize → lookup → estimate → aggregate → decide → append, per listing.
pub struct Evaluator {
    cache: Arc<PriceCache>,
    estimator: ComponentEstimator,
    reasoner: Option<Arc<dyn ReasoningGenerator>>,
    reasoning_timeout: Duration,
    policy: VerdictPolicy,
    history: Arc<dyn HistoryStore>,
    ids: IdGenerator,
    /// Serialises id issue and append so ids reach the store in order
    record_lock: Mutex<()>,
    skip_unchanged: bool,
}

impl Evaluator {
    pub fn new(
        cache: Arc<PriceCache>,
        estimator: ComponentEstimator,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        let ids = IdGenerator::resume_after(history.last_id().as_ref());
        Self {
            cache,
            estimator,
            reasoner: None,
            reasoning_timeout: DEFAULT_REASONING_TIMEOUT,
            policy: VerdictPolicy::default(),
            history,
            ids,
            record_lock: Mutex::new(()),
            skip_unchanged: false,
        }
    }

    pub fn from_config(config: &Config, cache: Arc<PriceCache>, history: Arc<dyn HistoryStore>) -> Self {
        Self::new(cache, ComponentEstimator::from_config(&config.pricing), history)
            .with_reasoner(build_reasoner(&config.reasoning), config.reasoning.timeout())
            .with_policy(VerdictPolicy::from(&config.verdict))
    }

    pub fn with_reasoner(mut self, reasoner: Option<Arc<dyn ReasoningGenerator>>, timeout: Duration) -> Self {
        self.reasoner = reasoner;
        self.reasoning_timeout = timeout;
        self
    }

    pub fn with_policy(mut self, policy: VerdictPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Don't append an evaluation equivalent to the latest one for its URL
    pub fn skip_unchanged(mut self, skip: bool) -> Self {
        self.skip_unchanged = skip;
        self
    }

    pub fn cache(&self) -> &Arc<PriceCache> {
        &self.cache
    }

    /// Evaluate one listing. Collaborator failures degrade the record
    /// (zero-priced parts, empty reasoning) but never abort it.
    pub async fn evaluate(&self, listing: &RawListing) -> EvaluationOutcome {
        let url = canonical_url(&listing.url);

        let mut parts = Vec::with_capacity(listing.components.len());
        for raw in &listing.components {
            parts.push(self.estimator.estimate(raw, &self.cache).await);
        }

        let mut evaluation = ListingEvaluation::assemble(
            Local::now().naive_local(),
            &url,
            &listing.title,
            listing.effective_price(),
            parts,
            &self.policy,
        );
        info!(
            "{} → {} (estimated {:.2}, price {:.2}, margin {:.3})",
            url, evaluation.verdict, evaluation.estimated, evaluation.price, evaluation.margin
        );

        self.attach_reasoning(&mut evaluation).await;
        let recorded = self.record(&mut evaluation);

        EvaluationOutcome {
            evaluation,
            recorded,
        }
    }

    /// Empty reasoning with no note when disabled; a failed call leaves a
    /// note so the record reads as degraded.
    async fn attach_reasoning(&self, evaluation: &mut ListingEvaluation) {
        let Some(reasoner) = &self.reasoner else {
            return;
        };
        let facts = evaluation.facts();
        match bounded(reasoner.name(), self.reasoning_timeout, reasoner.summarize(&facts)).await {
            Ok(text) => evaluation.reasoning = text,
            Err(e) => {
                warn!("Reasoning for {} unavailable: {}", evaluation.url, e);
                evaluation.reasoning = String::new();
                evaluation.add_note(&format!("{}: {}", REASONING_UNAVAILABLE, e));
            }
        }
    }

    fn record(&self, evaluation: &mut ListingEvaluation) -> Recorded {
        let _guard = match self.record_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let (_, at) = self.ids.next();
        evaluation.restamp(at);

        if self.skip_unchanged {
            match self.history.latest_for_url(&evaluation.url) {
                Ok(previous) if !is_new_information(previous.as_ref(), evaluation) => {
                    info!("Evaluation of {} unchanged, not recorded", evaluation.url);
                    return Recorded::Unchanged;
                }
                Ok(_) => {}
                Err(e) => warn!("Could not read history for {}: {}", evaluation.url, e),
            }
        }

        match self.history.append(evaluation) {
            Ok(()) => Recorded::Appended,
            Err(e) => {
                warn!("Failed to record evaluation {}: {:#}", evaluation.id, e);
                Recorded::Failed(format!("{:#}", e))
            }
        }
    }

    /// Evaluate listings concurrently, at most `concurrency` at a time.
    /// Results come back in input order; a panicking evaluation only fails
    /// its own slot.
    pub async fn evaluate_batch(
        self: &Arc<Self>,
        listings: Vec<RawListing>,
        concurrency: usize,
    ) -> Vec<Result<EvaluationOutcome>> {
        let total = listings.len();
        let results: Vec<Result<EvaluationOutcome>> = stream::iter(listings.into_iter().map(|listing| {
            let evaluator = Arc::clone(self);
            async move {
                let url = listing.url.clone();
                tokio::spawn(async move { evaluator.evaluate(&listing).await })
                    .await
                    .with_context(|| format!("Evaluation task for {} failed", url))
            }
        }))
        .buffered(concurrency.max(1))
        .collect()
        .await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        let buys = results
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .filter(|o| o.evaluation.verdict == crate::valuation::Verdict::Buy)
            .count();
        info!("Batch done: {} listings, {} BUY, {} failed", total, buys, failed);
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Category;
    use crate::history::{JsonlHistoryStore, MemoryHistoryStore};
    use crate::pricing::{HeuristicPriceSource, MockPriceSource, PriceSource};
    use crate::reasoning::MockReasoner;
    use crate::valuation::{EvaluationId, Verdict};
    use tempfile::TempDir;

    fn evaluator_with(source: Arc<dyn PriceSource>, history: Arc<dyn HistoryStore>) -> Evaluator {
        let estimator = ComponentEstimator::new(source, 0.65, Duration::from_millis(200));
        Evaluator::new(Arc::new(PriceCache::default()), estimator, history)
    }

    fn gaming_pc(price: Option<f64>) -> RawListing {
        RawListing::new(
            "https://www.leboncoin.fr/ad/ordinateurs/3101234567",
            "PC gamer Ryzen 5 7600X / RX 6800XT",
            price,
            vec![
                "Ryzen 5 7600x".to_string(),
                "AMD RX 6800XT".to_string(),
                "16GB DDR5".to_string(),
                "SSD 1TB".to_string(),
                "Corsair RM PSU".to_string(),
            ],
        )
    }

    #[tokio::test]
    async fn test_full_evaluation() {
        let history = Arc::new(MemoryHistoryStore::new());
        let evaluator = evaluator_with(Arc::new(HeuristicPriceSource::new()), history.clone())
            .with_reasoner(Some(Arc::new(MockReasoner::new("Verdict {verdict}"))), Duration::from_millis(200));

        let outcome = evaluator.evaluate(&gaming_pc(Some(1000.0))).await;
        let eval = &outcome.evaluation;
        assert_eq!(outcome.recorded, Recorded::Appended);
        assert!((eval.estimated - 643.5).abs() < 1e-6);
        assert!((eval.profit + 356.5).abs() < 1e-6);
        assert!((eval.margin + 0.3565).abs() < 1e-6);
        assert_eq!(eval.verdict, Verdict::Pass);
        assert_eq!(eval.reasoning, "Verdict PASS");
        assert!(eval.notes.is_empty());
        assert_eq!(eval.parts[1].category, Category::Gpu);
        assert!(eval.parts.iter().all(|p| !p.cached));
        assert!(eval.is_consistent());
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_reevaluation_uses_cache() {
        let history = Arc::new(MemoryHistoryStore::new());
        let evaluator = evaluator_with(Arc::new(HeuristicPriceSource::new()), history.clone());

        let first = evaluator.evaluate(&gaming_pc(Some(1000.0))).await.evaluation;
        let second = evaluator.evaluate(&gaming_pc(Some(1000.0))).await.evaluation;
        assert!(second.parts.iter().all(|p| p.cached));
        assert_eq!(second.parts[1].estimated_price, 325.0);
        assert_eq!(first.estimated, second.estimated);
        assert!(second.id > first.id);

        let stored = history.list_by_url(&first.url).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].id, second.id);
    }

    #[tokio::test]
    async fn test_skip_unchanged() {
        let history = Arc::new(MemoryHistoryStore::new());
        let evaluator =
            evaluator_with(Arc::new(HeuristicPriceSource::new()), history.clone()).skip_unchanged(true);

        assert_eq!(evaluator.evaluate(&gaming_pc(Some(1000.0))).await.recorded, Recorded::Appended);
        assert_eq!(evaluator.evaluate(&gaming_pc(Some(1000.0))).await.recorded, Recorded::Unchanged);
        assert_eq!(evaluator.evaluate(&gaming_pc(Some(400.0))).await.recorded, Recorded::Appended);
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_unpriced_listing_buys() {
        let history = Arc::new(MemoryHistoryStore::new());
        let evaluator = evaluator_with(Arc::new(HeuristicPriceSource::new()), history);
        let eval = evaluator.evaluate(&gaming_pc(None)).await.evaluation;
        assert_eq!(eval.price, 0.0);
        assert_eq!(eval.profit, eval.estimated);
        assert_eq!(eval.margin, 1.0);
        assert_eq!(eval.verdict, Verdict::Buy);
    }

    #[tokio::test]
    async fn test_slow_reasoner_does_not_block_verdict() {
        let history = Arc::new(MemoryHistoryStore::new());
        let reasoner = Arc::new(MockReasoner::new("late").with_delay(Duration::from_millis(500)));
        let evaluator = evaluator_with(Arc::new(HeuristicPriceSource::new()), history.clone())
            .with_reasoner(Some(reasoner.clone()), Duration::from_millis(20));

        let outcome = evaluator.evaluate(&gaming_pc(Some(200.0))).await;
        assert_eq!(outcome.evaluation.reasoning, "");
        assert!(outcome.evaluation.notes.starts_with(REASONING_UNAVAILABLE));
        assert!(outcome.evaluation.notes.contains("timed out"));
        assert_eq!(outcome.evaluation.verdict, Verdict::Buy);
        assert_eq!(outcome.recorded, Recorded::Appended);
        assert_eq!(reasoner.calls(), 1);
    }

    #[tokio::test]
    async fn test_failing_collaborators_still_record() {
        let history = Arc::new(MemoryHistoryStore::new());
        let evaluator = evaluator_with(Arc::new(MockPriceSource::failing()), history.clone())
            .with_reasoner(Some(Arc::new(MockReasoner::failing())), Duration::from_millis(50));

        let outcome = evaluator.evaluate(&gaming_pc(Some(500.0))).await;
        let eval = &outcome.evaluation;
        assert_eq!(eval.estimated, 0.0);
        assert_eq!(eval.verdict, Verdict::Pass);
        assert!(eval.parts.iter().all(|p| p.notes.contains("price unavailable")));
        assert!(eval.reasoning.is_empty());
        assert!(eval.notes.starts_with(REASONING_UNAVAILABLE));
        assert_eq!(history.list_all().unwrap()[0].notes, eval.notes);
        assert_eq!(history.len(), 1);
        assert!(evaluator.cache().is_empty());
    }

    struct BrokenStore;

    impl HistoryStore for BrokenStore {
        fn append(&self, _evaluation: &ListingEvaluation) -> Result<()> {
            anyhow::bail!("disk full")
        }

        fn list_all(&self) -> Result<Vec<ListingEvaluation>> {
            Ok(Vec::new())
        }

        fn last_id(&self) -> Option<EvaluationId> {
            None
        }
    }

    #[tokio::test]
    async fn test_history_failure_is_reported_not_fatal() {
        let evaluator = evaluator_with(Arc::new(HeuristicPriceSource::new()), Arc::new(BrokenStore));
        let outcome = evaluator.evaluate(&gaming_pc(Some(1000.0))).await;
        assert!(matches!(outcome.recorded, Recorded::Failed(ref msg) if msg.contains("disk full")));
        assert_eq!(outcome.evaluation.parts.len(), 5);
    }

    #[tokio::test]
    async fn test_batch_preserves_order_and_ids() {
        let dir = TempDir::new().unwrap();
        let history = Arc::new(JsonlHistoryStore::open(dir.path().join("evaluations.jsonl")).unwrap());
        let source = Arc::new(MockPriceSource::flat(100.0).with_delay(Duration::from_millis(5)));
        let evaluator = Arc::new(evaluator_with(source, history.clone()));

        let listings: Vec<RawListing> = (0..8)
            .map(|i| {
                RawListing::new(
                    &format!("https://example.com/ad/{}", i),
                    &format!("PC {}", i),
                    Some(50.0 * (i + 1) as f64),
                    vec![format!("Part {}", i), "Shared fan".to_string()],
                )
            })
            .collect();

        let results = evaluator.evaluate_batch(listings, 4).await;
        assert_eq!(results.len(), 8);
        for (i, result) in results.iter().enumerate() {
            let outcome = result.as_ref().unwrap();
            assert_eq!(outcome.evaluation.url, format!("https://example.com/ad/{}", i));
            assert_eq!(outcome.recorded, Recorded::Appended);
            assert_eq!(outcome.evaluation.estimated, 130.0);
        }

        let stored = history.list_all().unwrap();
        assert_eq!(stored.len(), 8);
        assert!(stored.windows(2).all(|w| w[0].id < w[1].id));
        assert_eq!(evaluator.cache().len(), 9);
    }
}
