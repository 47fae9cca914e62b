//! API Handlers
//!
//! HTTP request handlers for the cache and project endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::cache::CacheManager;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{
    BatchUpdateRequest, EntryResponse, HealthResponse, InvalidateRequest, KeysQuery,
    KeysResponse, MessageResponse, PaymentQueueQuery, SetRequest, StatsResponse,
};
use crate::projects::{
    AnalyticsKind, AnalyticsSummary, Expense, NewProject, Payment, PaymentRecord, Project,
    ProjectFilter, ProjectService, ProjectSource, ProjectStats, ProjectUpdate, ReportPeriod,
    StaffAssignment,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheManager>,
    pub projects: Arc<ProjectService>,
}

impl AppState {
    /// Wires a project service over `source` to the given cache.
    pub fn new(cache: Arc<CacheManager>, source: Arc<dyn ProjectSource>) -> Self {
        let projects = Arc::new(ProjectService::new(source, cache.clone()));
        Self { cache, projects }
    }

    pub fn from_config(config: &Config, source: Arc<dyn ProjectSource>) -> Self {
        Self::new(Arc::new(CacheManager::from_config(config)), source)
    }
}

// == Service Endpoints ==
/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.settings().enabled))
}

/// Handler for GET /cache/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.cache.stats().await.into())
}

// == Cache Endpoints ==
/// Handler for GET /cache/keys?pattern=
///
/// Lists fresh keys. Without a pattern every key is returned.
pub async fn keys_handler(
    State(state): State<AppState>,
    Query(query): Query<KeysQuery>,
) -> Json<KeysResponse> {
    let pattern = query.pattern.unwrap_or_else(|| "*".to_string());
    let keys = state.cache.keys(&pattern).await;
    Json(KeysResponse::new(pattern, keys))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<MessageResponse> {
    state.cache.clear().await;
    Json(MessageResponse::new("Cache cleared"))
}

/// Handler for GET /cache/entries/:key
pub async fn get_entry_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<EntryResponse>> {
    let entry = state
        .cache
        .entry(&key)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Key '{}'", key)))?;

    Ok(Json(EntryResponse::new(key, &entry)))
}

/// Handler for PUT /cache/entries
pub async fn set_entry_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<MessageResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(AppError::InvalidRequest(error_msg));
    }

    state.cache.set(&req.key, &req.value, req.ttl).await;
    Ok(Json(MessageResponse::stored(&req.key)))
}

/// Handler for DELETE /cache/entries/:key
pub async fn delete_entry_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<MessageResponse>> {
    if !state.cache.delete(&key).await {
        return Err(AppError::NotFound(format!("Key '{}'", key)));
    }
    Ok(Json(MessageResponse::deleted(&key)))
}

/// Handler for POST /cache/invalidate
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<MessageResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(AppError::InvalidRequest(error_msg));
    }

    state.cache.invalidate(&req.pattern).await;
    Ok(Json(MessageResponse::invalidated(&req.pattern)))
}

// == Project Endpoints ==
/// Handler for GET /projects
///
/// Without query parameters this is the full list, which falls back to a
/// stale copy when the backend is down.
pub async fn list_projects_handler(
    State(state): State<AppState>,
    Query(filter): Query<ProjectFilter>,
) -> Result<Json<Vec<Project>>> {
    let projects = if filter == ProjectFilter::default() {
        state.projects.fetch_projects().await?
    } else {
        state.projects.fetch_projects_with_filter(&filter).await?
    };
    Ok(Json(projects))
}

/// Handler for GET /projects/active
pub async fn active_projects_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Project>>> {
    Ok(Json(state.projects.get_active_projects().await?))
}

/// Handler for POST /projects
pub async fn create_project_handler(
    State(state): State<AppState>,
    Json(project): Json<NewProject>,
) -> Result<(StatusCode, Json<Project>)> {
    let created = state.projects.create_project(project).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Handler for GET /projects/:id
pub async fn get_project_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Project>> {
    state
        .projects
        .get_project_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("project {}", id)))
}

/// Handler for PATCH /projects/:id
pub async fn update_project_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<ProjectUpdate>,
) -> Result<Json<Project>> {
    Ok(Json(state.projects.update_project(&id, update).await?))
}

/// Handler for DELETE /projects/:id
pub async fn delete_project_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    state.projects.delete_project(&id).await?;
    Ok(Json(MessageResponse::new(format!("Project '{}' deleted", id))))
}

/// Handler for GET /projects/:id/stats
pub async fn project_stats_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProjectStats>> {
    Ok(Json(state.projects.get_project_stats(&id).await?))
}

/// Handler for GET /projects/:id/staff
pub async fn project_staff_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<StaffAssignment>>> {
    Ok(Json(state.projects.get_project_staff(&id).await?))
}

/// Handler for GET /projects/:id/expenses
pub async fn expense_claims_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Expense>>> {
    Ok(Json(state.projects.get_expense_claims(&id).await?))
}

/// Handler for GET /payments/queue
pub async fn payment_queue_handler(
    State(state): State<AppState>,
    Query(query): Query<PaymentQueueQuery>,
) -> Result<Json<Vec<PaymentRecord>>> {
    let queue = state
        .projects
        .get_payment_queue(query.project_id.as_deref())
        .await?;
    Ok(Json(queue))
}

/// Handler for GET /analytics/:kind/:period
pub async fn analytics_handler(
    State(state): State<AppState>,
    Path((kind, period)): Path<(AnalyticsKind, ReportPeriod)>,
) -> Result<Json<AnalyticsSummary>> {
    Ok(Json(state.projects.get_analytics(kind, period).await?))
}

/// Handler for POST /projects/batch
pub async fn batch_update_handler(
    State(state): State<AppState>,
    Json(req): Json<BatchUpdateRequest>,
) -> Result<Json<Vec<Project>>> {
    if let Some(error_msg) = req.validate() {
        return Err(AppError::InvalidRequest(error_msg));
    }

    let updated = state
        .projects
        .batch_update_projects(req.into_pairs())
        .await?;
    Ok(Json(updated))
}

/// Handler for POST /projects/:id/payments
pub async fn record_payment_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payment): Json<Payment>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    state.projects.record_payment(&id, payment).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(format!("Payment recorded for '{}'", id))),
    ))
}

/// Handler for POST /projects/:id/expenses
pub async fn record_expense_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(expense): Json<Expense>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    state.projects.record_expense(&id, expense).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(format!("Expense recorded for '{}'", id))),
    ))
}

/// Handler for POST /projects/:id/staff
pub async fn assign_staff_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(assignment): Json<StaffAssignment>,
) -> Result<Json<MessageResponse>> {
    let candidate = assignment.candidate_id.clone();
    state.projects.assign_staff(&id, assignment).await?;
    Ok(Json(MessageResponse::new(format!(
        "Candidate '{}' assigned to '{}'",
        candidate, id
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::projects::InMemoryProjectSource;
    use serde_json::json;

    fn test_state() -> (Arc<InMemoryProjectSource>, AppState) {
        let source = Arc::new(InMemoryProjectSource::new());
        let state = AppState::from_config(&Config::default(), source.clone());
        (source, state)
    }

    fn set_request(key: &str, value: serde_json::Value) -> SetRequest {
        SetRequest {
            key: key.to_string(),
            value,
            ttl: None,
        }
    }

    #[tokio::test]
    async fn test_set_and_get_entry() {
        let (_, state) = test_state();

        let result = set_entry_handler(
            State(state.clone()),
            Json(set_request("board:1", json!({"columns": 3}))),
        )
        .await;
        assert!(result.is_ok());

        let response = get_entry_handler(State(state), Path("board:1".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, json!({"columns": 3}));
        assert!(response.ttl_remaining > 0);
    }

    #[tokio::test]
    async fn test_get_missing_entry() {
        let (_, state) = test_state();

        let result = get_entry_handler(State(state), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let (_, state) = test_state();
        set_entry_handler(State(state.clone()), Json(set_request("gone", json!(1))))
            .await
            .unwrap();

        let result = delete_entry_handler(State(state.clone()), Path("gone".to_string())).await;
        assert!(result.is_ok());

        let result = delete_entry_handler(State(state), Path("gone".to_string())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let (_, state) = test_state();

        let result = set_entry_handler(State(state), Json(set_request("", json!("v")))).await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_invalidate_and_keys() {
        let (_, state) = test_state();
        for key in ["project:1", "project:1:stats", "project:2", "user:1"] {
            set_entry_handler(State(state.clone()), Json(set_request(key, json!(true))))
                .await
                .unwrap();
        }

        invalidate_handler(
            State(state.clone()),
            Json(InvalidateRequest {
                pattern: "project:1*".to_string(),
            }),
        )
        .await
        .unwrap();

        let response = keys_handler(State(state), Query(KeysQuery::default())).await;
        assert_eq!(response.keys, vec!["project:2", "user:1"]);
        assert_eq!(response.count, 2);
    }

    #[tokio::test]
    async fn test_stats_and_clear() {
        let (_, state) = test_state();
        set_entry_handler(State(state.clone()), Json(set_request("a", json!(1))))
            .await
            .unwrap();
        get_entry_handler(State(state.clone()), Path("a".to_string()))
            .await
            .unwrap();

        let stats = stats_handler(State(state.clone())).await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.size, 1);

        clear_handler(State(state.clone())).await;
        let stats = stats_handler(State(state)).await;
        assert_eq!(stats.size, 0);
        assert_eq!(stats.hits, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let (_, state) = test_state();
        let response = health_handler(State(state)).await;
        assert_eq!(response.status, "healthy");
        assert!(response.cache_enabled);
    }

    #[tokio::test]
    async fn test_project_write_then_read() {
        let (_, state) = test_state();
        let (status, created) = create_project_handler(
            State(state.clone()),
            Json(NewProject {
                title: "Roadshow".to_string(),
                ..NewProject::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let listed = list_projects_handler(State(state.clone()), Query(ProjectFilter::default()))
            .await
            .unwrap();
        assert_eq!(listed[0].title, "Roadshow");

        update_project_handler(
            State(state.clone()),
            Path(created.id.clone()),
            Json(ProjectUpdate::title("Roadshow 2")),
        )
        .await
        .unwrap();

        let listed = list_projects_handler(State(state.clone()), Query(ProjectFilter::default()))
            .await
            .unwrap();
        assert_eq!(listed[0].title, "Roadshow 2");

        let detail = get_project_handler(State(state), Path(created.id.clone()))
            .await
            .unwrap();
        assert_eq!(detail.title, "Roadshow 2");
    }

    #[tokio::test]
    async fn test_missing_project_is_not_found() {
        let (_, state) = test_state();
        let result = get_project_handler(State(state.clone()), Path("nope".to_string())).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let result = project_stats_handler(State(state), Path("nope".to_string())).await;
        assert!(matches!(
            result,
            Err(AppError::Source(SourceError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_source_outage_surfaces_as_source_error() {
        let (source, state) = test_state();
        source.set_online(false);

        let result = active_projects_handler(State(state)).await;
        assert!(matches!(
            result,
            Err(AppError::Source(SourceError::Unavailable(_)))
        ));
    }

    #[tokio::test]
    async fn test_payment_updates_stats() {
        let (_, state) = test_state();
        let (_, created) = create_project_handler(
            State(state.clone()),
            Json(NewProject {
                title: "Sampling".to_string(),
                ..NewProject::default()
            }),
        )
        .await
        .unwrap();
        let id = created.id.clone();

        project_stats_handler(State(state.clone()), Path(id.clone()))
            .await
            .unwrap();
        record_payment_handler(
            State(state.clone()),
            Path(id.clone()),
            Json(Payment::completed(50.0)),
        )
        .await
        .unwrap();

        let stats = project_stats_handler(State(state), Path(id)).await.unwrap();
        assert_eq!(stats.total_payments, 50.0);
    }

    #[tokio::test]
    async fn test_pending_payment_shows_in_queue() {
        let (_, state) = test_state();
        let (_, created) = create_project_handler(
            State(state.clone()),
            Json(NewProject {
                title: "Roadshow".to_string(),
                ..NewProject::default()
            }),
        )
        .await
        .unwrap();
        let id = created.id.clone();

        record_payment_handler(
            State(state.clone()),
            Path(id.clone()),
            Json(Payment::pending(75.0)),
        )
        .await
        .unwrap();

        let queue = payment_queue_handler(
            State(state.clone()),
            Query(PaymentQueueQuery {
                project_id: Some(id.clone()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].project_id, id);

        let summary = analytics_handler(
            State(state),
            Path((AnalyticsKind::Payment, ReportPeriod::Daily)),
        )
        .await
        .unwrap();
        assert_eq!(summary.count, 0);
    }

    #[tokio::test]
    async fn test_staff_and_claims_of_missing_project() {
        let (_, state) = test_state();

        let staff = project_staff_handler(State(state.clone()), Path("nope".to_string())).await;
        assert!(matches!(
            staff,
            Err(AppError::Source(SourceError::NotFound(_)))
        ));

        let claims = expense_claims_handler(State(state), Path("nope".to_string())).await;
        assert!(matches!(
            claims,
            Err(AppError::Source(SourceError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_batch_requires_updates() {
        let (_, state) = test_state();
        let result = batch_update_handler(
            State(state),
            Json(BatchUpdateRequest {
                updates: Vec::new(),
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }
}
