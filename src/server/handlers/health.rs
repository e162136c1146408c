use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::rag::RagError;
use crate::state::AppState;

pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "message": format!("{} content service is running", state.settings.content.organization)
    }))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

pub async fn health_db(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    match state.store.ping().await {
        Ok(()) => Ok(Json(json!({ "status": "healthy", "result": 1 }))),
        Err(RagError::NotConfigured(what)) => Err(ApiError::ServiceUnavailable(format!(
            "Database not configured: {} is not set",
            what
        ))),
        Err(err) => {
            tracing::error!("Database health check failed: {}", err);
            Err(ApiError::ServiceUnavailable(err.to_string()))
        }
    }
}
