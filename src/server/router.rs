use std::sync::Arc;

use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{content, corpus, health};
use crate::state::AppState;

/// Creates the application router.
///
/// - `/`, `/health`, `/health/db`: liveness and database checks
/// - `/api/v1/generate`: audience-routed content generation
/// - `/api/v1/audit`, `/api/v1/ingest`, `/api/v1/ingest/report`: corpus management
/// - `/api/v1/search`: retrieval trace for debugging
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/health/db", get(health::health_db))
        .route("/api/v1/generate", post(content::generate))
        .route("/api/v1/audit", get(corpus::audit))
        .route("/api/v1/ingest", post(corpus::trigger_ingestion))
        .route("/api/v1/ingest/report", get(corpus::ingestion_report))
        .route("/api/v1/search", post(corpus::search))
        .with_state(state)
        .layer(build_cors_layer())
        .layer(TraceLayer::new_for_http())
}

/// Any origin may call the API; there is no cookie or key based auth.
fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}
