//! centers-web library - role-gated record management service
//!
//! Tracks project centers and their participants, with bulk CSV import
//! (validate-then-commit), an immutable audit trail, and national reporting.

use axum::Router;
use sqlx::SqlitePool;

use crate::import::PreviewStore;

pub mod api;
pub mod auth;
pub mod csv;
pub mod db;
pub mod error;
pub mod import;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Staged CSV import previews, keyed by opaque token
    pub previews: PreviewStore,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            previews: PreviewStore::new(),
        }
    }
}

/// Build application router
///
/// The public map view and health check skip authentication; everything else
/// goes through the bearer-token middleware.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    // Protected routes (require authentication)
    let protected = Router::new()
        .route(
            "/api/participants",
            get(api::list_participants).post(api::create_participant),
        )
        .route("/api/participants/map", get(api::participant_map))
        .route(
            "/api/participants/:guid",
            get(api::get_participant)
                .put(api::update_participant)
                .delete(api::delete_participant),
        )
        .route("/api/import/preview", post(api::import_preview))
        .route("/api/import/confirm", post(api::import_confirm))
        .route("/api/import/template", get(api::import_template))
        .route(
            "/api/national/centers",
            get(api::national_centers_list).post(api::national_center_add),
        )
        .route("/api/national/dashboard", get(api::national_dashboard))
        .route("/api/audit", get(api::list_audit_log))
        .route("/api/audit/export", get(api::export_audit_log))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    // Public routes (no authentication)
    let public = Router::new()
        .route("/api/centers", get(api::map_view))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
