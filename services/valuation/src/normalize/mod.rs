//! Component name normalisation
//!
//! 1. Canonicalise noisy listing names into stable cache keys
//! 2. Tag keys with a component category
//! 3. Fuzzy-match keys against already-known keys

pub mod category;
pub mod name;
pub mod similarity;
pub mod tokens;

pub use category::categorize;
pub use name::{normalize, UNKNOWN_KEY};
pub use similarity::{best_match, similarity, FuzzyMatch};
pub use tokens::KeyTokens;
