//! Cache key and TTL catalogue.
//!
//! Keys follow `<entity>:<operation>[:<params>]`. Everything derived from one
//! project lives under `project:<id>` so a single prefix clears it.

use serde::Serialize;

/// TTLs in seconds per kind of data.
pub mod ttl {
    pub const PROJECT_DETAILS: u64 = 600;
    pub const PROJECT_LIST: u64 = 300;
    pub const PROJECT_ACTIVE: u64 = 180;
    pub const PROJECT_STATS: u64 = 3600;
    pub const PROJECT_STAFF: u64 = 300;
    pub const ANALYTICS_DAILY: u64 = 3600;
    pub const ANALYTICS_WEEKLY: u64 = 7200;
    pub const ANALYTICS_MONTHLY: u64 = 14400;
    pub const PAYMENT_QUEUE: u64 = 180;
    pub const EXPENSE_CLAIMS: u64 = 300;
}

pub const PROJECTS_ALL: &str = "projects:all";
pub const PROJECTS_ACTIVE: &str = "projects:active";

pub fn project(id: &str) -> String {
    format!("project:{}", id)
}

pub fn project_stats(id: &str) -> String {
    format!("project:{}:stats", id)
}

pub fn project_staff(id: &str) -> String {
    format!("project:{}:staff", id)
}

/// Filtered list key. The filter's JSON form keeps distinct filters apart.
pub fn projects_filtered<F: Serialize>(filter: &F) -> String {
    let params = serde_json::to_string(filter).unwrap_or_default();
    format!("projects:filter:{}", params)
}

pub fn expense_claims(project_id: &str) -> String {
    format!("expenses:claims:{}", project_id)
}

pub fn payment_queue(project_id: Option<&str>) -> String {
    format!("payments:queue:{}", project_id.unwrap_or("all"))
}

pub fn analytics(kind: &str, period: &str) -> String {
    format!("analytics:{}:{}", kind, period)
}

/// Analytics TTL by reporting period.
pub fn analytics_ttl(period: &str) -> u64 {
    match period {
        "daily" => ttl::ANALYTICS_DAILY,
        "weekly" => ttl::ANALYTICS_WEEKLY,
        _ => ttl::ANALYTICS_MONTHLY,
    }
}
