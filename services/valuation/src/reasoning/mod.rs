//! Reasoning-text collaborators

pub mod mock;
pub mod template;
pub mod traits;

pub use mock::MockReasoner;
pub use template::TemplateReasoner;
pub use traits::ReasoningGenerator;

use std::sync::Arc;

use crate::config::ReasoningConfig;

/// `None` when reasoning is disabled; records then carry an empty string.
pub fn build_reasoner(config: &ReasoningConfig) -> Option<Arc<dyn ReasoningGenerator>> {
    if config.enabled {
        Some(Arc::new(TemplateReasoner::new()))
    } else {
        None
    }
}
