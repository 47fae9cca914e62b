//! Cached project data access.
//!
//! Reads go through the shared [`CacheManager`]; every write goes to the
//! source first and then clears the affected keys before returning, so the
//! next read after a write never sees pre-write data.

use std::sync::Arc;

use futures::future::join_all;
use futures::TryFutureExt;
use tracing::{info, warn};

use crate::cache::keys::{self, ttl};
use crate::cache::{CacheInvalidator, CacheManager, CacheTag, ReadThrough};
use crate::error::SourceResult;
use crate::projects::model::{
    AnalyticsKind, AnalyticsSummary, Expense, NewProject, Payment, PaymentRecord, Project,
    ProjectFilter, ProjectStats, ProjectUpdate, ReportPeriod, StaffAssignment,
};
use crate::projects::source::ProjectSource;

/// Maximum number of projects returned by the active list
pub const ACTIVE_LIMIT: usize = 20;

/// Number of updates sent concurrently by `batch_update_projects`
const BATCH_SIZE: usize = 5;

fn list_tag() -> CacheTag {
    CacheTag::entity("projects")
}

fn project_tag(id: &str) -> CacheTag {
    CacheTag::instance("project", id)
}

/// Rows are coloured on every read so brand keywords added by a rename show up.
fn painted(mut projects: Vec<Project>) -> Vec<Project> {
    projects.iter_mut().for_each(Project::refresh_color);
    projects
}

// == Project Service ==
#[derive(Clone)]
pub struct ProjectService {
    source: Arc<dyn ProjectSource>,
    cache: Arc<CacheManager>,
    invalidator: CacheInvalidator,
}

impl ProjectService {
    pub fn new(source: Arc<dyn ProjectSource>, cache: Arc<CacheManager>) -> Self {
        Self {
            source,
            invalidator: CacheInvalidator::new(cache.clone()),
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    // == Reads ==
    /// All live projects ordered by start date.
    ///
    /// When the source fails and an expired copy is still around, the
    /// expired copy is returned instead of the error.
    pub async fn fetch_projects(&self) -> SourceResult<Vec<Project>> {
        let filter = ProjectFilter::default();
        self.cache
            .get_or_set_with(
                keys::PROJECTS_ALL,
                || self.source.list_projects(&filter).map_ok(painted),
                ReadThrough::ttl(ttl::PROJECT_LIST)
                    .serve_stale()
                    .tagged(vec![list_tag()]),
            )
            .await
    }

    pub async fn fetch_projects_with_filter(
        &self,
        filter: &ProjectFilter,
    ) -> SourceResult<Vec<Project>> {
        self.cache
            .get_or_set_with(
                &keys::projects_filtered(filter),
                || self.source.list_projects(filter).map_ok(painted),
                ReadThrough::ttl(ttl::PROJECT_LIST).tagged(vec![list_tag()]),
            )
            .await
    }

    pub async fn get_active_projects(&self) -> SourceResult<Vec<Project>> {
        let filter = ProjectFilter::active(ACTIVE_LIMIT);
        self.cache
            .get_or_set_with(
                keys::PROJECTS_ACTIVE,
                || self.source.list_projects(&filter).map_ok(painted),
                ReadThrough::ttl(ttl::PROJECT_ACTIVE).tagged(vec![list_tag()]),
            )
            .await
    }

    /// A project by id. Unknown ids are cached as `None` too.
    pub async fn get_project_by_id(&self, id: &str) -> SourceResult<Option<Project>> {
        self.cache
            .get_or_set_with(
                &keys::project(id),
                || {
                    self.source.get_project(id).map_ok(|project| {
                        project.map(|mut p| {
                            p.refresh_color();
                            p
                        })
                    })
                },
                ReadThrough::ttl(ttl::PROJECT_DETAILS).tagged(vec![project_tag(id)]),
            )
            .await
    }

    pub async fn get_project_stats(&self, id: &str) -> SourceResult<ProjectStats> {
        self.cache
            .get_or_set_with(
                &keys::project_stats(id),
                || self.source.project_stats(id),
                ReadThrough::ttl(ttl::PROJECT_STATS).tagged(vec![project_tag(id)]),
            )
            .await
    }

    pub async fn get_project_staff(&self, id: &str) -> SourceResult<Vec<StaffAssignment>> {
        self.cache
            .get_or_set_with(
                &keys::project_staff(id),
                || self.source.project_staff(id),
                ReadThrough::ttl(ttl::PROJECT_STAFF).tagged(vec![project_tag(id)]),
            )
            .await
    }

    pub async fn get_expense_claims(&self, project_id: &str) -> SourceResult<Vec<Expense>> {
        self.cache
            .get_or_set_with(
                &keys::expense_claims(project_id),
                || self.source.expense_claims(project_id),
                ReadThrough::ttl(ttl::EXPENSE_CLAIMS).tagged(vec![project_tag(project_id)]),
            )
            .await
    }

    /// Pending payments for one project, or for every live project.
    ///
    /// The global queue is tagged like the lists so deleting any project
    /// drops it.
    pub async fn get_payment_queue(
        &self,
        project_id: Option<&str>,
    ) -> SourceResult<Vec<PaymentRecord>> {
        let tag = project_id.map_or_else(list_tag, project_tag);
        self.cache
            .get_or_set_with(
                &keys::payment_queue(project_id),
                || self.source.payment_queue(project_id),
                ReadThrough::ttl(ttl::PAYMENT_QUEUE).tagged(vec![tag]),
            )
            .await
    }

    pub async fn get_analytics(
        &self,
        kind: AnalyticsKind,
        period: ReportPeriod,
    ) -> SourceResult<AnalyticsSummary> {
        self.cache
            .get_or_set_with(
                &keys::analytics(kind.as_str(), period.as_str()),
                || self.source.analytics(kind, period),
                ReadThrough::ttl(keys::analytics_ttl(period.as_str())),
            )
            .await
    }

    // == Writes ==
    pub async fn create_project(&self, project: NewProject) -> SourceResult<Project> {
        let created = self.source.create_project(project).await?;
        self.invalidator.on_project_created().await;
        info!("Created project {}", created.id);
        Ok(created)
    }

    pub async fn update_project(&self, id: &str, update: ProjectUpdate) -> SourceResult<Project> {
        let updated = self.source.update_project(id, update).await?;
        self.invalidator.on_project_updated(id).await;
        Ok(updated)
    }

    /// Soft-deletes a project.
    pub async fn delete_project(&self, id: &str) -> SourceResult<()> {
        self.source.delete_project(id).await?;
        self.invalidator.on_project_deleted(id).await;
        info!("Deleted project {}", id);
        Ok(())
    }

    /// Applies updates in concurrent chunks of five.
    ///
    /// Every attempted project is invalidated, including after a partial
    /// failure, and the first error is returned.
    pub async fn batch_update_projects(
        &self,
        updates: Vec<(String, ProjectUpdate)>,
    ) -> SourceResult<Vec<Project>> {
        let ids: Vec<String> = updates.iter().map(|(id, _)| id.clone()).collect();
        let mut results = Vec::with_capacity(updates.len());

        let mut pending = updates.into_iter().peekable();
        while pending.peek().is_some() {
            let chunk: Vec<_> = pending.by_ref().take(BATCH_SIZE).collect();
            let writes = chunk
                .into_iter()
                .map(|(id, update)| async move { self.source.update_project(&id, update).await });
            results.extend(join_all(writes).await);
        }

        for id in &ids {
            self.invalidator.on_project_updated(id).await;
        }

        results.into_iter().collect()
    }

    pub async fn record_payment(&self, project_id: &str, payment: Payment) -> SourceResult<()> {
        self.source.record_payment(project_id, payment).await?;
        self.invalidator.on_payment_created(project_id).await;
        Ok(())
    }

    pub async fn record_expense(&self, project_id: &str, expense: Expense) -> SourceResult<()> {
        self.source.record_expense(project_id, expense).await?;
        self.invalidator.on_expense_updated(project_id).await;
        Ok(())
    }

    pub async fn assign_staff(
        &self,
        project_id: &str,
        assignment: StaffAssignment,
    ) -> SourceResult<()> {
        self.source.assign_staff(project_id, assignment).await?;
        self.invalidator.on_staff_assigned(project_id).await;
        // Filled positions live on the project row itself.
        self.invalidator.on_project_updated(project_id).await;
        Ok(())
    }

    // == Prefetch ==
    /// Warms the active and full project lists. Failures are only logged.
    pub async fn prefetch_projects(&self) {
        if let Err(err) = self.get_active_projects().await {
            warn!("Prefetching active projects failed: {}", err);
            return;
        }
        match self.fetch_projects().await {
            Ok(projects) => info!("Prefetched {} projects", projects.len()),
            Err(err) => warn!("Prefetching projects failed: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManagerSettings;
    use crate::error::SourceError;
    use crate::projects::model::{ProjectStatus, StaffStatus};
    use crate::projects::source::InMemoryProjectSource;
    use chrono::NaiveDate;

    fn setup() -> (Arc<InMemoryProjectSource>, ProjectService) {
        setup_with(ManagerSettings::default())
    }

    fn setup_with(settings: ManagerSettings) -> (Arc<InMemoryProjectSource>, ProjectService) {
        let source = Arc::new(InMemoryProjectSource::new());
        let cache = Arc::new(CacheManager::new(300, settings));
        let service = ProjectService::new(source.clone(), cache);
        (source, service)
    }

    fn titled(title: &str) -> NewProject {
        NewProject {
            title: title.to_string(),
            ..NewProject::default()
        }
    }

    #[tokio::test]
    async fn test_list_is_cached() {
        let (source, service) = setup();
        service.create_project(titled("A")).await.unwrap();

        let first = service.fetch_projects().await.unwrap();
        let second = service.fetch_projects().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.reads(), 1);
    }

    #[tokio::test]
    async fn test_update_then_list_returns_new_title() {
        let (source, service) = setup();
        let project = service.create_project(titled("A")).await.unwrap();

        let before = service.fetch_projects().await.unwrap();
        assert_eq!(before[0].title, "A");

        service
            .update_project(&project.id, ProjectUpdate::title("B"))
            .await
            .unwrap();

        let after = service.fetch_projects().await.unwrap();
        assert_eq!(after[0].title, "B");
        assert_eq!(source.reads(), 2);
    }

    #[tokio::test]
    async fn test_update_clears_detail_and_stats() {
        let (source, service) = setup();
        let project = service.create_project(titled("A")).await.unwrap();
        let id = project.id.as_str();

        service.get_project_by_id(id).await.unwrap();
        service.get_project_stats(id).await.unwrap();
        assert_eq!(source.reads(), 2);

        service
            .update_project(id, ProjectUpdate::title("B"))
            .await
            .unwrap();

        let detail = service.get_project_by_id(id).await.unwrap().unwrap();
        service.get_project_stats(id).await.unwrap();
        assert_eq!(detail.title, "B");
        assert_eq!(source.reads(), 4);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_cache() {
        let (source, service) = setup();
        service.create_project(titled("A")).await.unwrap();
        service.fetch_projects().await.unwrap();

        let err = service
            .update_project("missing", ProjectUpdate::title("B"))
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::NotFound(_)));
        service.fetch_projects().await.unwrap();
        assert_eq!(source.reads(), 1);
    }

    #[tokio::test]
    async fn test_source_error_reaches_caller_unchanged() {
        let (source, service) = setup();
        source.set_online(false);

        let err = service.get_active_projects().await.unwrap_err();
        assert_eq!(
            err,
            SourceError::Unavailable("project backend offline".to_string())
        );

        source.set_online(true);
        assert!(service.get_active_projects().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_projects_serves_stale_when_source_is_down() {
        let (source, service) = setup();
        service.create_project(titled("A")).await.unwrap();
        let cache = service.cache().clone();

        let projects = service.fetch_projects().await.unwrap();
        // Re-store with an already elapsed TTL to simulate expiry.
        cache.set(keys::PROJECTS_ALL, &projects, Some(0)).await;
        source.set_online(false);

        let served = service.fetch_projects().await.unwrap();
        assert_eq!(served, projects);

        // Still served while the outage lasts.
        assert_eq!(service.fetch_projects().await.unwrap(), projects);
    }

    #[tokio::test]
    async fn test_concurrent_fetches_both_get_stale_list() {
        let (source, service) = setup();
        service.create_project(titled("A")).await.unwrap();
        let projects = service.fetch_projects().await.unwrap();
        service
            .cache()
            .set(keys::PROJECTS_ALL, &projects, Some(0))
            .await;
        source.set_online(false);

        let (first, second) = tokio::join!(service.fetch_projects(), service.fetch_projects());

        assert_eq!(first.unwrap(), projects);
        assert_eq!(second.unwrap(), projects);
    }

    #[tokio::test]
    async fn test_stale_list_dropped_once_projects_change() {
        let (source, service) = setup();
        service.create_project(titled("A")).await.unwrap();
        let projects = service.fetch_projects().await.unwrap();
        service
            .cache()
            .set(keys::PROJECTS_ALL, &projects, Some(0))
            .await;
        service.create_project(titled("B")).await.unwrap();
        source.set_online(false);

        let err = service.fetch_projects().await.unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_unknown_id_is_cached_as_none() {
        let (source, service) = setup();

        assert_eq!(service.get_project_by_id("nope").await.unwrap(), None);
        assert_eq!(service.get_project_by_id("nope").await.unwrap(), None);
        assert_eq!(source.reads(), 1);
    }

    #[tokio::test]
    async fn test_delete_hides_project() {
        let (_, service) = setup();
        let project = service.create_project(titled("A")).await.unwrap();
        service.get_project_by_id(&project.id).await.unwrap();
        service.fetch_projects().await.unwrap();

        service.delete_project(&project.id).await.unwrap();

        assert_eq!(service.get_project_by_id(&project.id).await.unwrap(), None);
        assert!(service.fetch_projects().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_payment_refreshes_stats_only() {
        let (source, service) = setup();
        let project = service.create_project(titled("A")).await.unwrap();
        let id = project.id.as_str();
        service.get_project_by_id(id).await.unwrap();
        assert_eq!(service.get_project_stats(id).await.unwrap().total_payments, 0.0);

        service
            .record_payment(id, Payment::completed(120.0))
            .await
            .unwrap();

        assert_eq!(service.get_project_stats(id).await.unwrap().total_payments, 120.0);
        service.get_project_by_id(id).await.unwrap();
        // detail, stats, stats again; the detail stayed cached
        assert_eq!(source.reads(), 3);
    }

    #[tokio::test]
    async fn test_expense_and_staff_update_stats() {
        let (_, service) = setup();
        let project = service.create_project(titled("A")).await.unwrap();
        let id = project.id.as_str();
        service.get_project_stats(id).await.unwrap();

        service
            .record_expense(id, Expense::approved(30.0))
            .await
            .unwrap();
        service
            .assign_staff(
                id,
                StaffAssignment {
                    candidate_id: "c1".to_string(),
                    status: StaffStatus::Confirmed,
                },
            )
            .await
            .unwrap();

        let stats = service.get_project_stats(id).await.unwrap();
        assert_eq!(stats.total_expenses, 30.0);
        assert_eq!(stats.confirmed_staff, 1);
        assert_eq!(stats.completion_rate, 100.0);

        let detail = service.get_project_by_id(id).await.unwrap().unwrap();
        assert_eq!(detail.filled_positions, 1);
    }

    #[tokio::test]
    async fn test_renamed_project_takes_brand_color() {
        let (_, service) = setup();
        let project = service.create_project(titled("Office party")).await.unwrap();
        assert_eq!(project.color, crate::projects::DEFAULT_COLOR);

        service
            .update_project(&project.id, ProjectUpdate::title("Nestle Sampling"))
            .await
            .unwrap();

        let listed = service.fetch_projects().await.unwrap();
        assert_eq!(listed[0].color, "#FCA5A5");
        let filtered = service
            .fetch_projects_with_filter(&ProjectFilter::default())
            .await
            .unwrap();
        assert_eq!(filtered[0].color, "#FCA5A5");
        let detail = service.get_project_by_id(&project.id).await.unwrap().unwrap();
        assert_eq!(detail.color, "#FCA5A5");
    }

    #[tokio::test]
    async fn test_staff_and_claims_are_cached_until_written() {
        let (source, service) = setup();
        let project = service.create_project(titled("A")).await.unwrap();
        let id = project.id.as_str();

        assert!(service.get_project_staff(id).await.unwrap().is_empty());
        assert!(service.get_expense_claims(id).await.unwrap().is_empty());
        service.get_project_staff(id).await.unwrap();
        service.get_expense_claims(id).await.unwrap();
        assert_eq!(source.reads(), 2);

        service
            .assign_staff(
                id,
                StaffAssignment {
                    candidate_id: "c1".to_string(),
                    status: StaffStatus::Pending,
                },
            )
            .await
            .unwrap();
        service
            .record_expense(id, Expense::submitted(12.5))
            .await
            .unwrap();

        assert_eq!(service.get_project_staff(id).await.unwrap().len(), 1);
        assert_eq!(
            service.get_expense_claims(id).await.unwrap(),
            vec![Expense::submitted(12.5)]
        );
    }

    #[tokio::test]
    async fn test_payment_refreshes_queue_and_analytics() {
        let (source, service) = setup();
        let project = service.create_project(titled("A")).await.unwrap();
        let id = project.id.as_str();

        assert!(service.get_payment_queue(None).await.unwrap().is_empty());
        assert!(service.get_payment_queue(Some(id)).await.unwrap().is_empty());
        let before = service
            .get_analytics(AnalyticsKind::Payment, ReportPeriod::Daily)
            .await
            .unwrap();
        assert_eq!(before.total, 0.0);
        service
            .get_analytics(AnalyticsKind::Payment, ReportPeriod::Daily)
            .await
            .unwrap();
        assert_eq!(source.reads(), 3);

        service.record_payment(id, Payment::pending(80.0)).await.unwrap();
        service.record_payment(id, Payment::completed(20.0)).await.unwrap();

        let queue = service.get_payment_queue(None).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].payment.amount, 80.0);
        assert_eq!(service.get_payment_queue(Some(id)).await.unwrap(), queue);
        let after = service
            .get_analytics(AnalyticsKind::Payment, ReportPeriod::Daily)
            .await
            .unwrap();
        assert_eq!(after.total, 20.0);
        assert_eq!(after.count, 1);
    }

    #[tokio::test]
    async fn test_delete_drops_project_from_payment_queue() {
        let (_, service) = setup();
        let project = service.create_project(titled("A")).await.unwrap();
        service
            .record_payment(&project.id, Payment::pending(10.0))
            .await
            .unwrap();
        assert_eq!(service.get_payment_queue(None).await.unwrap().len(), 1);

        service.delete_project(&project.id).await.unwrap();

        assert!(service.get_payment_queue(None).await.unwrap().is_empty());
        let err = service.get_expense_claims(&project.id).await.unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_expense_analytics_untouched_by_payment() {
        let (source, service) = setup();
        let project = service.create_project(titled("A")).await.unwrap();
        service
            .get_analytics(AnalyticsKind::Expense, ReportPeriod::Weekly)
            .await
            .unwrap();

        service
            .record_payment(&project.id, Payment::completed(5.0))
            .await
            .unwrap();
        service
            .get_analytics(AnalyticsKind::Expense, ReportPeriod::Weekly)
            .await
            .unwrap();

        assert_eq!(source.reads(), 1);
    }

    #[tokio::test]
    async fn test_filtered_lists_are_cached_separately() {
        let (source, service) = setup();
        service
            .create_project(NewProject {
                title: "A".to_string(),
                status: ProjectStatus::Active,
                start_date: NaiveDate::from_ymd_opt(2026, 4, 1),
                ..NewProject::default()
            })
            .await
            .unwrap();
        service.create_project(titled("B")).await.unwrap();

        let active = ProjectFilter {
            status: Some(ProjectStatus::Active),
            ..ProjectFilter::default()
        };
        let planned = ProjectFilter {
            status: Some(ProjectStatus::Planned),
            ..ProjectFilter::default()
        };

        assert_eq!(service.fetch_projects_with_filter(&active).await.unwrap()[0].title, "A");
        assert_eq!(service.fetch_projects_with_filter(&planned).await.unwrap()[0].title, "B");
        service.fetch_projects_with_filter(&active).await.unwrap();
        assert_eq!(source.reads(), 2);

        service.create_project(titled("C")).await.unwrap();
        assert_eq!(service.fetch_projects_with_filter(&planned).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_batch_update_invalidates_every_project() {
        let (_, service) = setup();
        let mut ids = Vec::new();
        for i in 0..7 {
            ids.push(service.create_project(titled(&format!("P{}", i))).await.unwrap().id);
        }
        for id in &ids {
            service.get_project_by_id(id).await.unwrap();
        }

        let updates = ids
            .iter()
            .map(|id| (id.clone(), ProjectUpdate::title("Renamed")))
            .collect();
        let updated = service.batch_update_projects(updates).await.unwrap();

        assert_eq!(updated.len(), 7);
        for id in &ids {
            let project = service.get_project_by_id(id).await.unwrap().unwrap();
            assert_eq!(project.title, "Renamed");
        }
    }

    #[tokio::test]
    async fn test_batch_update_reports_first_error() {
        let (_, service) = setup();
        let project = service.create_project(titled("A")).await.unwrap();
        service.get_project_by_id(&project.id).await.unwrap();

        let err = service
            .batch_update_projects(vec![
                (project.id.clone(), ProjectUpdate::title("B")),
                ("missing".to_string(), ProjectUpdate::title("C")),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::NotFound(_)));
        let detail = service.get_project_by_id(&project.id).await.unwrap().unwrap();
        assert_eq!(detail.title, "B");
    }

    #[tokio::test]
    async fn test_prefetch_warms_lists() {
        let (source, service) = setup();
        service.create_project(titled("A")).await.unwrap();

        service.prefetch_projects().await;
        assert_eq!(source.reads(), 2);

        service.fetch_projects().await.unwrap();
        service.get_active_projects().await.unwrap();
        assert_eq!(source.reads(), 2);
    }

    #[tokio::test]
    async fn test_disabled_cache_reads_through_every_time() {
        let (source, service) = setup_with(ManagerSettings {
            enabled: false,
            collapse_concurrent: true,
        });

        service.fetch_projects().await.unwrap();
        service.fetch_projects().await.unwrap();
        assert_eq!(source.reads(), 2);
    }
}
