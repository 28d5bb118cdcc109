pub mod entry;
pub mod persist;
pub mod store;

pub use entry::{CacheEntry, FreshnessPolicy};
pub use persist::{load_cache, save_cache};
pub use store::{CacheHit, PriceCache};
