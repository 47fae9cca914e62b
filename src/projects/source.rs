//! Project data sources.
//!
//! [`ProjectSource`] is the contract the cached service needs from the
//! system of record. [`InMemoryProjectSource`] backs the binary and the tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{SourceError, SourceResult};
use crate::projects::model::{
    project_color, AnalyticsKind, AnalyticsSummary, Expense, NewProject, Payment, PaymentRecord,
    Project, ProjectFilter, ProjectStats, ProjectUpdate, ReportPeriod, StaffAssignment,
    StaffStatus,
};

// == Project Source ==
/// Remote system of record for projects.
#[async_trait]
pub trait ProjectSource: Send + Sync {
    /// Non-deleted projects matching `filter`, ordered by start date.
    async fn list_projects(&self, filter: &ProjectFilter) -> SourceResult<Vec<Project>>;

    /// A project by id, `None` if it does not exist or was deleted.
    async fn get_project(&self, id: &str) -> SourceResult<Option<Project>>;

    async fn project_stats(&self, id: &str) -> SourceResult<ProjectStats>;

    async fn project_staff(&self, id: &str) -> SourceResult<Vec<StaffAssignment>>;

    /// Every expense claim filed against a project, approved or not.
    async fn expense_claims(&self, project_id: &str) -> SourceResult<Vec<Expense>>;

    /// Payments not yet completed, for one project or across all live ones.
    async fn payment_queue(&self, project_id: Option<&str>) -> SourceResult<Vec<PaymentRecord>>;

    /// Completed payments or approved expenses over the period ending today.
    async fn analytics(
        &self,
        kind: AnalyticsKind,
        period: ReportPeriod,
    ) -> SourceResult<AnalyticsSummary>;

    async fn create_project(&self, project: NewProject) -> SourceResult<Project>;

    async fn update_project(&self, id: &str, update: ProjectUpdate) -> SourceResult<Project>;

    /// Soft delete: the row stays but is excluded from listings.
    async fn delete_project(&self, id: &str) -> SourceResult<()>;

    async fn record_payment(&self, project_id: &str, payment: Payment) -> SourceResult<()>;

    async fn record_expense(&self, project_id: &str, expense: Expense) -> SourceResult<()>;

    async fn assign_staff(&self, project_id: &str, assignment: StaffAssignment)
        -> SourceResult<()>;
}

// == In-Memory Source ==
#[derive(Debug, Default)]
struct Tables {
    projects: HashMap<String, Project>,
    staff: HashMap<String, Vec<StaffAssignment>>,
    payments: HashMap<String, Vec<Payment>>,
    expenses: HashMap<String, Vec<Expense>>,
}

/// Process-local stand-in for the hosted backend.
///
/// Counts read calls and can be switched offline so callers can observe
/// caching and failure behaviour.
#[derive(Debug)]
pub struct InMemoryProjectSource {
    tables: RwLock<Tables>,
    reads: AtomicUsize,
    online: AtomicBool,
}

impl Default for InMemoryProjectSource {
    fn default() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            reads: AtomicUsize::new(0),
            online: AtomicBool::new(true),
        }
    }
}

impl InMemoryProjectSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of read queries served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// While offline every call fails with `SourceError::Unavailable`.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn check_online(&self) -> SourceResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SourceError::Unavailable("project backend offline".to_string()))
        }
    }

    fn begin_read(&self) -> SourceResult<()> {
        self.check_online()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn live<'a>(tables: &'a Tables, id: &str) -> SourceResult<&'a Project> {
        tables
            .projects
            .get(id)
            .filter(|p| !p.is_deleted())
            .ok_or_else(|| SourceError::NotFound(format!("project {}", id)))
    }
}

#[async_trait]
impl ProjectSource for InMemoryProjectSource {
    async fn list_projects(&self, filter: &ProjectFilter) -> SourceResult<Vec<Project>> {
        self.begin_read()?;
        let tables = self.tables.read().await;

        let mut projects: Vec<Project> = tables
            .projects
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        // Undated projects sort last; ties broken by creation time.
        projects.sort_by(|a, b| {
            (a.start_date.is_none(), a.start_date, a.created_at)
                .cmp(&(b.start_date.is_none(), b.start_date, b.created_at))
        });
        if let Some(limit) = filter.limit {
            projects.truncate(limit);
        }
        Ok(projects)
    }

    async fn get_project(&self, id: &str) -> SourceResult<Option<Project>> {
        self.begin_read()?;
        let tables = self.tables.read().await;
        Ok(Self::live(&tables, id).ok().cloned())
    }

    async fn project_stats(&self, id: &str) -> SourceResult<ProjectStats> {
        self.begin_read()?;
        let tables = self.tables.read().await;
        Self::live(&tables, id)?;

        let staff: Vec<_> = tables
            .staff
            .get(id)
            .map(|rows| rows.iter().map(|s| s.status).collect())
            .unwrap_or_default();
        let expenses = tables
            .expenses
            .get(id)
            .into_iter()
            .flatten()
            .filter(|e| e.approved)
            .map(|e| e.amount);
        let payments = tables
            .payments
            .get(id)
            .into_iter()
            .flatten()
            .filter(|p| p.completed)
            .map(|p| p.amount);

        Ok(ProjectStats::compute(&staff, expenses, payments))
    }

    async fn project_staff(&self, id: &str) -> SourceResult<Vec<StaffAssignment>> {
        self.begin_read()?;
        let tables = self.tables.read().await;
        Self::live(&tables, id)?;
        Ok(tables.staff.get(id).cloned().unwrap_or_default())
    }

    async fn expense_claims(&self, project_id: &str) -> SourceResult<Vec<Expense>> {
        self.begin_read()?;
        let tables = self.tables.read().await;
        Self::live(&tables, project_id)?;
        Ok(tables.expenses.get(project_id).cloned().unwrap_or_default())
    }

    async fn payment_queue(&self, project_id: Option<&str>) -> SourceResult<Vec<PaymentRecord>> {
        self.begin_read()?;
        let tables = self.tables.read().await;
        if let Some(id) = project_id {
            Self::live(&tables, id)?;
        }

        let mut queue: Vec<PaymentRecord> = tables
            .payments
            .iter()
            .filter(|(id, _)| project_id.map_or(true, |wanted| wanted == id.as_str()))
            .filter(|(id, _)| Self::live(&tables, id).is_ok())
            .flat_map(|(id, payments)| {
                payments
                    .iter()
                    .filter(|p| !p.completed)
                    .map(move |payment| PaymentRecord {
                        project_id: id.clone(),
                        payment: payment.clone(),
                    })
            })
            .collect();
        queue.sort_by(|a, b| {
            (a.payment.recorded_on, &a.project_id).cmp(&(b.payment.recorded_on, &b.project_id))
        });
        Ok(queue)
    }

    async fn analytics(
        &self,
        kind: AnalyticsKind,
        period: ReportPeriod,
    ) -> SourceResult<AnalyticsSummary> {
        self.begin_read()?;
        let tables = self.tables.read().await;
        let live = |id: &String| Self::live(&tables, id).is_ok();

        let rows: Vec<_> = match kind {
            AnalyticsKind::Payment => tables
                .payments
                .iter()
                .filter(|(id, _)| live(*id))
                .flat_map(|(_, rows)| rows.iter())
                .filter(|p| p.completed)
                .map(|p| (p.recorded_on, p.amount))
                .collect(),
            AnalyticsKind::Expense => tables
                .expenses
                .iter()
                .filter(|(id, _)| live(*id))
                .flat_map(|(_, rows)| rows.iter())
                .filter(|e| e.approved)
                .map(|e| (e.recorded_on, e.amount))
                .collect(),
        };

        Ok(AnalyticsSummary::compute(
            kind,
            period,
            Utc::now().date_naive(),
            rows,
        ))
    }

    async fn create_project(&self, project: NewProject) -> SourceResult<Project> {
        self.check_online()?;
        if project.title.trim().is_empty() {
            return Err(SourceError::Rejected("title is required".to_string()));
        }

        let now = Utc::now();
        let created = Project {
            id: Uuid::new_v4().to_string(),
            color: project_color(&project.title, project.color.as_deref()),
            title: project.title,
            description: project.description,
            status: project.status,
            priority: project.priority,
            start_date: project.start_date,
            end_date: project.end_date,
            client_id: project.client_id,
            venue_address: project.venue_address,
            crew_count: project.crew_count,
            filled_positions: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let mut tables = self.tables.write().await;
        tables.projects.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn update_project(&self, id: &str, update: ProjectUpdate) -> SourceResult<Project> {
        self.check_online()?;
        if update.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(SourceError::Rejected("title cannot be empty".to_string()));
        }

        let mut tables = self.tables.write().await;
        Self::live(&tables, id)?;
        let project = tables
            .projects
            .get_mut(id)
            .ok_or_else(|| SourceError::NotFound(format!("project {}", id)))?;

        update.apply_to(project);
        project.updated_at = Utc::now();
        Ok(project.clone())
    }

    async fn delete_project(&self, id: &str) -> SourceResult<()> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        Self::live(&tables, id)?;
        if let Some(project) = tables.projects.get_mut(id) {
            let now = Utc::now();
            project.deleted_at = Some(now);
            project.updated_at = now;
        }
        Ok(())
    }

    async fn record_payment(&self, project_id: &str, payment: Payment) -> SourceResult<()> {
        self.check_online()?;
        if payment.amount < 0.0 {
            return Err(SourceError::Rejected("payment amount must be positive".to_string()));
        }
        let mut tables = self.tables.write().await;
        Self::live(&tables, project_id)?;
        tables
            .payments
            .entry(project_id.to_string())
            .or_default()
            .push(payment);
        Ok(())
    }

    async fn record_expense(&self, project_id: &str, expense: Expense) -> SourceResult<()> {
        self.check_online()?;
        if expense.amount < 0.0 {
            return Err(SourceError::Rejected("expense amount must be positive".to_string()));
        }
        let mut tables = self.tables.write().await;
        Self::live(&tables, project_id)?;
        tables
            .expenses
            .entry(project_id.to_string())
            .or_default()
            .push(expense);
        Ok(())
    }

    async fn assign_staff(
        &self,
        project_id: &str,
        assignment: StaffAssignment,
    ) -> SourceResult<()> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        Self::live(&tables, project_id)?;

        let rows = tables.staff.entry(project_id.to_string()).or_default();
        match rows
            .iter_mut()
            .find(|s| s.candidate_id == assignment.candidate_id)
        {
            Some(existing) => existing.status = assignment.status,
            None => rows.push(assignment),
        }
        let filled = rows
            .iter()
            .filter(|s| s.status == StaffStatus::Confirmed)
            .count() as u32;

        if let Some(project) = tables.projects.get_mut(project_id) {
            project.filled_positions = filled;
        }
        Ok(())
    }
}
