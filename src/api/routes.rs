//! API Routes
//!
//! Configures the Axum router with the cache and project endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    active_projects_handler, analytics_handler, assign_staff_handler, batch_update_handler,
    clear_handler, create_project_handler, delete_entry_handler, delete_project_handler,
    expense_claims_handler, get_entry_handler, get_project_handler, health_handler,
    invalidate_handler, keys_handler, list_projects_handler, payment_queue_handler,
    project_staff_handler, project_stats_handler, record_expense_handler, record_payment_handler,
    set_entry_handler, stats_handler, update_project_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .merge(cache_routes())
        .merge(project_routes())
        .merge(finance_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cache_routes() -> Router<AppState> {
    Router::new()
        .route("/cache", delete(clear_handler))
        .route("/cache/stats", get(stats_handler))
        .route("/cache/keys", get(keys_handler))
        .route("/cache/entries", put(set_entry_handler))
        .route(
            "/cache/entries/:key",
            get(get_entry_handler).delete(delete_entry_handler),
        )
        .route("/cache/invalidate", post(invalidate_handler))
}

fn project_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/projects",
            get(list_projects_handler).post(create_project_handler),
        )
        .route("/projects/active", get(active_projects_handler))
        .route("/projects/batch", post(batch_update_handler))
        .route(
            "/projects/:id",
            get(get_project_handler)
                .patch(update_project_handler)
                .delete(delete_project_handler),
        )
        .route("/projects/:id/stats", get(project_stats_handler))
        .route("/projects/:id/payments", post(record_payment_handler))
        .route(
            "/projects/:id/expenses",
            get(expense_claims_handler).post(record_expense_handler),
        )
        .route(
            "/projects/:id/staff",
            get(project_staff_handler).post(assign_staff_handler),
        )
}

fn finance_routes() -> Router<AppState> {
    Router::new()
        .route("/payments/queue", get(payment_queue_handler))
        .route("/analytics/:kind/:period", get(analytics_handler))
}
