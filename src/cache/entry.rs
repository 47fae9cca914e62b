//! Cache Entry Module
//!
//! Defines individual cache entries with TTL support and dependency tags.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Tag ==
/// Structured dependency key attached to an entry at write time.
///
/// A tag without an id stands for every instance of the entity, so
/// invalidating `projects` also clears entries tagged `project/42`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheTag {
    pub entity: String,
    pub id: Option<String>,
}

impl CacheTag {
    /// Tag covering every instance of an entity.
    pub fn entity(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            id: None,
        }
    }

    /// Tag for one instance of an entity.
    pub fn instance(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            id: Some(id.into()),
        }
    }

    /// Returns true if invalidating `self` should drop an entry tagged `other`.
    pub fn covers(&self, other: &CacheTag) -> bool {
        self.entity == other.entity
            && match (&self.id, &other.id) {
                (None, _) => true,
                (Some(a), Some(b)) => a == b,
                (Some(_), None) => false,
            }
    }
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}/{}", self.entity, id),
            None => write!(f, "{}", self.entity),
        }
    }
}

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Dependency tags used by tag invalidation
    pub tags: Vec<CacheTag>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry expiring `ttl_seconds` from now.
    pub fn new(value: Value, ttl_seconds: u64) -> Self {
        let now = current_timestamp_ms();

        Self {
            value,
            created_at: now,
            expires_at: now.saturating_add(ttl_seconds.saturating_mul(1000)),
            tags: Vec::new(),
        }
    }

    /// Attaches dependency tags to the entry.
    pub fn with_tags(mut self, tags: Vec<CacheTag>) -> Self {
        self.tags = tags;
        self
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is fresh only while `now < expires_at`; at the boundary it
    /// is already expired.
    pub fn is_expired(&self) -> bool {
        current_timestamp_ms() >= self.expires_at
    }

    /// Returns true if any of the entry's tags is covered by `tag`.
    pub fn has_tag(&self, tag: &CacheTag) -> bool {
        self.tags.iter().any(|t| tag.covers(t))
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self) -> u64 {
        self.expires_at.saturating_sub(current_timestamp_ms())
    }

    /// Returns remaining TTL in whole seconds.
    pub fn ttl_remaining(&self) -> u64 {
        self.ttl_remaining_ms() / 1000
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
