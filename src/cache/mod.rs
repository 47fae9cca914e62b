//! Cache Module
//!
//! Provides an in-memory read-through cache with TTL expiry and
//! pattern/tag based invalidation.

mod entry;
mod invalidator;
pub mod keys;
mod manager;
mod pattern;
mod stats;
mod store;


// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry, CacheTag};
pub use invalidator::{CacheInvalidator, Mutation};
pub use manager::{CacheManager, ManagerSettings, ReadThrough, StalePolicy};
pub use pattern::KeyPattern;
pub use stats::CacheStats;
pub use store::{CacheStore, Lookup};

// == Public Constants ==
/// Maximum allowed key length in bytes for keys written over the API
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed encoded value size in bytes for values written over the API
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
