//! Projects Module
//!
//! Project records, the backend they live in, and the cached service the
//! HTTP layer talks to.

mod model;
mod service;
mod source;

pub use model::{
    project_color, AnalyticsKind, AnalyticsSummary, Expense, NewProject, Payment, PaymentRecord,
    Priority, Project, ProjectFilter, ProjectStats, ProjectStatus, ProjectUpdate, ReportPeriod,
    StaffAssignment, StaffStatus, DEFAULT_COLOR,
};
pub use service::{ProjectService, ACTIVE_LIMIT};
pub use source::{InMemoryProjectSource, ProjectSource};
