//! Error types shared across the valuation pipeline

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by an external collaborator (pricing knowledge, reasoning text).
///
/// None of these are fatal to an evaluation: the caller records a note or an
/// empty string and carries on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollaboratorError {
    #[error("{collaborator} timed out after {after_ms}ms")]
    Timeout { collaborator: String, after_ms: u64 },

    #[error("{collaborator} unavailable: {reason}")]
    Unavailable { collaborator: String, reason: String },

    #[error("{collaborator} returned malformed data: {reason}")]
    Malformed { collaborator: String, reason: String },
}

impl CollaboratorError {
    pub fn timeout(collaborator: &str, after: Duration) -> Self {
        Self::Timeout {
            collaborator: collaborator.to_string(),
            after_ms: after.as_millis() as u64,
        }
    }

    pub fn unavailable(collaborator: &str, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            collaborator: collaborator.to_string(),
            reason: reason.into(),
        }
    }

    pub fn malformed(collaborator: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            collaborator: collaborator.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Run a collaborator call under a deadline.
pub async fn bounded<T, F>(collaborator: &str, limit: Duration, call: F) -> Result<T, CollaboratorError>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(CollaboratorError::timeout(collaborator, limit)),
    }
}

/// Invalid values in an otherwise well-formed configuration file.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("pricing.used_ratio must be in (0, 1], got {0}")]
    UsedRatio(f64),

    #[error("cache.similarity_threshold must be in (0, 1], got {0}")]
    SimilarityThreshold(f64),

    #[error("verdict.margin_threshold must be finite and non-negative, got {0}")]
    MarginThreshold(f64),

    #[error("pipeline.concurrency must be at least 1")]
    Concurrency,

    #[error("{section}.timeout_ms must be greater than zero")]
    Timeout { section: &'static str },
}
