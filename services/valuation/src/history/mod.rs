//! Evaluation history: ids, storage, legacy format and comparison

pub mod compare;
pub mod ids;
pub mod legacy;
pub mod store;

pub use compare::{compare, is_new_information, EvaluationDelta};
pub use ids::IdGenerator;
pub use legacy::{export_legacy, import_legacy, parse_legacy, render_legacy, ImportSummary};
pub use store::{HistoryStore, JsonlHistoryStore, MemoryHistoryStore};
