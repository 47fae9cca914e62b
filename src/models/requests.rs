//! Request DTOs for the HTTP API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::{MAX_KEY_LENGTH, MAX_VALUE_SIZE};
use crate::projects::ProjectUpdate;

/// Request body for `PUT /cache/entries`
///
/// `ttl` is in seconds; the store default applies when it is absent.
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl SetRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} characters",
                MAX_KEY_LENGTH
            ));
        }
        let size = serde_json::to_vec(&self.value).map_or(0, |bytes| bytes.len());
        if size > MAX_VALUE_SIZE {
            return Some(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            ));
        }
        None
    }
}

/// Request body for `POST /cache/invalidate`
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    pub pattern: String,
}

impl InvalidateRequest {
    pub fn validate(&self) -> Option<String> {
        if self.pattern.trim().is_empty() {
            return Some("Pattern cannot be empty; use DELETE /cache to clear".to_string());
        }
        None
    }
}

/// Query string for `GET /cache/keys`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeysQuery {
    #[serde(default)]
    pub pattern: Option<String>,
}

/// Query string for `GET /payments/queue`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentQueueQuery {
    /// Limits the queue to one project
    #[serde(default)]
    pub project_id: Option<String>,
}

/// One item of `POST /projects/batch`
#[derive(Debug, Clone, Deserialize)]
pub struct BatchUpdateItem {
    pub id: String,
    #[serde(flatten)]
    pub update: ProjectUpdate,
}

/// Request body for `POST /projects/batch`
#[derive(Debug, Clone, Deserialize)]
pub struct BatchUpdateRequest {
    pub updates: Vec<BatchUpdateItem>,
}

impl BatchUpdateRequest {
    pub fn validate(&self) -> Option<String> {
        if self.updates.is_empty() {
            return Some("Batch contains no updates".to_string());
        }
        if self.updates.iter().any(|item| item.id.is_empty()) {
            return Some("Every update needs a project id".to_string());
        }
        None
    }

    pub fn into_pairs(self) -> Vec<(String, ProjectUpdate)> {
        self.updates
            .into_iter()
            .map(|item| (item.id, item.update))
            .collect()
    }
}
