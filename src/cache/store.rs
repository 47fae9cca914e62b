//! Cache Store Module
//!
//! Key-value storage with lazy TTL expiry and pattern/tag invalidation.

use std::collections::HashMap;

use serde_json::Value;

use crate::cache::{CacheEntry, CacheStats, CacheTag, KeyPattern};

// == Lookup ==
/// Outcome of a freshness check.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// A non-expired entry was found
    Fresh(Value),
    /// An expired entry was found and removed; its last value is returned
    Stale(Value),
    /// Nothing stored under the key
    Missing,
}

// == Cache Store ==
/// In-memory cache storage with TTL support.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Performance statistics
    stats: CacheStats,
    /// Default TTL in seconds for entries without explicit TTL
    default_ttl: u64,
    /// Bumped by every delete, invalidation and clear
    generation: u64,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore.
    ///
    /// # Arguments
    /// * `default_ttl` - TTL in seconds for entries written without one
    pub fn new(default_ttl: u64) -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
            default_ttl,
            generation: 0,
        }
    }

    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    // == Set ==
    /// Stores a value, replacing any existing entry and resetting its TTL.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl` - Optional TTL in seconds (uses default_ttl if None)
    pub fn set(&mut self, key: impl Into<String>, value: Value, ttl: Option<u64>) {
        self.set_tagged(key, value, ttl, Vec::new());
    }

    /// Stores a value together with its dependency tags.
    pub fn set_tagged(
        &mut self,
        key: impl Into<String>,
        value: Value,
        ttl: Option<u64>,
        tags: Vec<CacheTag>,
    ) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let entry = CacheEntry::new(value, ttl).with_tags(tags);
        self.entries.insert(key.into(), entry);
        self.stats.set_size(self.entries.len());
    }

    /// Puts an expired value back so later stale-tolerant reads can still
    /// use it. Skipped when the key was rewritten or anything was removed
    /// since `generation` was observed.
    pub fn restore_stale(
        &mut self,
        key: &str,
        value: Value,
        tags: Vec<CacheTag>,
        generation: u64,
    ) -> bool {
        if generation != self.generation || self.entries.contains_key(key) {
            return false;
        }
        let entry = CacheEntry::new(value, 0).with_tags(tags);
        self.entries.insert(key.to_string(), entry);
        self.stats.set_size(self.entries.len());
        true
    }

    // == Lookup ==
    /// Freshness check without touching hit/miss counters.
    ///
    /// Expired entries are removed here; nothing sweeps them proactively
    /// unless the background cleanup task is running.
    pub fn lookup(&mut self, key: &str) -> Lookup {
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => return Lookup::Fresh(entry.value.clone()),
            Some(_) => {}
            None => return Lookup::Missing,
        }

        let stale = self.entries.remove(key).map(|e| e.value);
        self.stats.record_expired(1);
        self.stats.set_size(self.entries.len());
        stale.map_or(Lookup::Missing, Lookup::Stale)
    }

    // == Get ==
    /// Retrieves a value if present and fresh, recording a hit or a miss.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        match self.lookup(key) {
            Lookup::Fresh(value) => {
                self.stats.record_hit();
                Some(value)
            }
            Lookup::Stale(_) | Lookup::Missing => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Delete ==
    /// Removes an entry by key. Returns true if something was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        self.generation += 1;
        if removed {
            self.stats.record_invalidated(1);
            self.stats.set_size(self.entries.len());
        }
        removed
    }

    // == Invalidate ==
    /// Removes every entry whose key matches `pattern`.
    ///
    /// Returns the number of removed entries. Matching nothing is normal.
    pub fn invalidate(&mut self, pattern: &str) -> usize {
        let pattern = KeyPattern::parse_lossy(pattern);
        self.remove_where(|key, _| pattern.matches(key))
    }

    /// Removes every entry carrying a tag covered by `tag`.
    pub fn invalidate_tag(&mut self, tag: &CacheTag) -> usize {
        self.remove_where(|_, entry| entry.has_tag(tag))
    }

    fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&str, &CacheEntry) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|key, entry| !predicate(key, entry));
        let removed = before - self.entries.len();
        self.generation += 1;

        self.stats.record_invalidated(removed);
        self.stats.set_size(self.entries.len());
        removed
    }

    // == Clear ==
    /// Removes all entries and resets counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats = CacheStats::new();
        self.generation += 1;
    }

    /// Changes whenever entries are removed other than by expiry.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // == Keys ==
    /// Returns the fresh keys matching `pattern`, sorted.
    pub fn keys(&self, pattern: &str) -> Vec<String> {
        let pattern = KeyPattern::parse_lossy(pattern);
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired() && pattern.matches(key))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    // == Entry ==
    /// Returns a fresh entry with its metadata, without counting a read.
    pub fn entry(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key).filter(|entry| !entry.is_expired())
    }

    pub(crate) fn record_hit(&mut self) {
        self.stats.record_hit();
    }

    pub(crate) fn record_miss(&mut self) {
        self.stats.record_miss();
    }

    pub(crate) fn record_error(&mut self) {
        self.stats.record_error();
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_size(self.entries.len());
        stats
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        let count = before - self.entries.len();

        self.stats.record_expired(count);
        self.stats.set_size(self.entries.len());
        count
    }

    // == Length ==
    /// Returns the current number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
