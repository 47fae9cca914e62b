//! Response DTOs for the HTTP API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::{CacheEntry, CacheStats};

/// Response body for `GET /cache/entries/:key`
#[derive(Debug, Clone, Serialize)]
pub struct EntryResponse {
    pub key: String,
    pub value: Value,
    /// Seconds until the entry expires
    pub ttl_remaining: u64,
    pub tags: Vec<String>,
}

impl EntryResponse {
    pub fn new(key: impl Into<String>, entry: &CacheEntry) -> Self {
        Self {
            key: key.into(),
            value: entry.value.clone(),
            ttl_remaining: entry.ttl_remaining(),
            tags: entry.tags.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Acknowledgement for writes and removals
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn stored(key: &str) -> Self {
        Self::new(format!("Key '{}' set successfully", key))
    }

    pub fn deleted(key: &str) -> Self {
        Self::new(format!("Key '{}' deleted successfully", key))
    }

    pub fn invalidated(pattern: &str) -> Self {
        Self::new(format!("Invalidated entries matching '{}'", pattern))
    }
}

/// Response body for `GET /cache/keys`
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub pattern: String,
    pub count: usize,
    pub keys: Vec<String>,
}

impl KeysResponse {
    pub fn new(pattern: impl Into<String>, keys: Vec<String>) -> Self {
        Self {
            pattern: pattern.into(),
            count: keys.len(),
            keys,
        }
    }
}

/// Response body for `GET /cache/stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    pub expired: u64,
    pub invalidated: u64,
    pub size: usize,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            errors: stats.errors,
            expired: stats.expired,
            invalidated: stats.invalidated,
            size: stats.size,
        }
    }
}

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    pub cache_enabled: bool,
}

impl HealthResponse {
    pub fn healthy(cache_enabled: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            cache_enabled,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
