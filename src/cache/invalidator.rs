//! Cache Invalidator Module
//!
//! Maps domain mutations to the key patterns and tags they make stale.
//! Every cached query derived from an entity must be covered by a pattern
//! here, otherwise it keeps serving pre-write data until its TTL runs out.

use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheManager, CacheTag};

// == Mutation ==
/// A successful write to the system of record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    ProjectCreated,
    ProjectUpdated { project_id: String },
    ProjectDeleted { project_id: String },
    StaffAssigned { project_id: String },
    StaffUpdated { staff_id: String },
    PaymentCreated { project_id: String },
    ExpenseUpdated { project_id: String },
    UserUpdated { user_id: String },
}

impl Mutation {
    // == Patterns ==
    /// Key patterns cleared by this mutation.
    pub fn patterns(&self) -> Vec<String> {
        match self {
            Mutation::ProjectCreated => {
                vec!["projects:*".to_string(), "analytics:*".to_string()]
            }
            Mutation::ProjectUpdated { project_id } | Mutation::ProjectDeleted { project_id } => {
                vec![
                    format!("project:{}*", project_id),
                    "projects:*".to_string(),
                    "analytics:*".to_string(),
                ]
            }
            Mutation::StaffAssigned { project_id } => vec![
                format!("project:{}:staff", project_id),
                format!("project:{}:stats", project_id),
                "staff:available:*".to_string(),
            ],
            Mutation::StaffUpdated { staff_id } => vec![
                format!("staff:{}*", staff_id),
                "staff:available:*".to_string(),
            ],
            Mutation::PaymentCreated { project_id } => vec![
                format!("project:{}:stats", project_id),
                "payments:*".to_string(),
                "analytics:payment:*".to_string(),
            ],
            Mutation::ExpenseUpdated { project_id } => vec![
                format!("project:{}:stats", project_id),
                format!("expenses:claims:{}", project_id),
                "analytics:expense:*".to_string(),
            ],
            Mutation::UserUpdated { user_id } => vec![format!("user:{}*", user_id)],
        }
    }

    // == Tags ==
    /// Structured tags cleared by this mutation.
    pub fn tags(&self) -> Vec<CacheTag> {
        match self {
            Mutation::ProjectCreated => vec![CacheTag::entity("projects")],
            Mutation::ProjectUpdated { project_id } | Mutation::ProjectDeleted { project_id } => {
                vec![
                    CacheTag::instance("project", project_id.as_str()),
                    CacheTag::entity("projects"),
                ]
            }
            Mutation::StaffUpdated { staff_id } => {
                vec![CacheTag::instance("staff", staff_id.as_str())]
            }
            Mutation::UserUpdated { user_id } => {
                vec![CacheTag::instance("user", user_id.as_str())]
            }
            Mutation::StaffAssigned { .. }
            | Mutation::PaymentCreated { .. }
            | Mutation::ExpenseUpdated { .. } => Vec::new(),
        }
    }
}

// == Cache Invalidator ==
/// Clears cache entries after writes.
///
/// Invalidation is fire-and-forget: it returns nothing and can never fail
/// the write that triggered it.
#[derive(Debug, Clone)]
pub struct CacheInvalidator {
    cache: Arc<CacheManager>,
}

impl CacheInvalidator {
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self { cache }
    }

    pub async fn apply(&self, mutation: &Mutation) {
        debug!("Invalidating cache for {:?}", mutation);
        for pattern in mutation.patterns() {
            self.cache.invalidate(&pattern).await;
        }
        for tag in mutation.tags() {
            self.cache.invalidate_tag(&tag).await;
        }
    }

    pub async fn on_project_created(&self) {
        self.apply(&Mutation::ProjectCreated).await;
    }

    pub async fn on_project_updated(&self, project_id: &str) {
        self.apply(&Mutation::ProjectUpdated {
            project_id: project_id.to_string(),
        })
        .await;
    }

    pub async fn on_project_deleted(&self, project_id: &str) {
        self.apply(&Mutation::ProjectDeleted {
            project_id: project_id.to_string(),
        })
        .await;
    }

    pub async fn on_staff_assigned(&self, project_id: &str) {
        self.apply(&Mutation::StaffAssigned {
            project_id: project_id.to_string(),
        })
        .await;
    }

    pub async fn on_payment_created(&self, project_id: &str) {
        self.apply(&Mutation::PaymentCreated {
            project_id: project_id.to_string(),
        })
        .await;
    }

    pub async fn on_expense_updated(&self, project_id: &str) {
        self.apply(&Mutation::ExpenseUpdated {
            project_id: project_id.to_string(),
        })
        .await;
    }
}
