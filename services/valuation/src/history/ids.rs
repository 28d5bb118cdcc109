use chrono::{Duration, Local, NaiveDateTime, Timelike};
use std::sync::Mutex;

use crate::valuation::EvaluationId;

/// Hands out strictly increasing local timestamps, one per evaluation.
///
/// Two evaluations finishing in the same microsecond, or a clock stepping
/// backwards, still get distinct ordered ids.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: Mutex<Option<NaiveDateTime>>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue after an id already present in the store
    pub fn resume_after(last: Option<&EvaluationId>) -> Self {
        Self {
            last: Mutex::new(last.and_then(|id| id.timestamp())),
        }
    }

    pub fn next(&self) -> (EvaluationId, NaiveDateTime) {
        self.next_at(Local::now().naive_local())
    }

    pub fn next_at(&self, now: NaiveDateTime) -> (EvaluationId, NaiveDateTime) {
        // Ids keep microseconds only
        let now = now
            .with_nanosecond(now.nanosecond() / 1_000 * 1_000)
            .unwrap_or(now);
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let at = match *last {
            Some(prev) if now <= prev => prev + Duration::microseconds(1),
            _ => now,
        };
        *last = Some(at);
        (EvaluationId::from_timestamp(at), at)
    }
}
