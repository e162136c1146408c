use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::errors::ApiError;
use crate::rag::{CorpusAudit, RagError, SearchTrace};
use crate::state::AppState;

const MAX_SEARCH_K: usize = 50;

#[derive(Debug, Serialize)]
pub struct AuditFile {
    pub filename: String,
    pub chunks: u64,
}

#[derive(Debug, Serialize)]
pub struct AuditResponse {
    pub status: &'static str,
    pub total_chunks: u64,
    pub files: Vec<AuditFile>,
}

impl From<CorpusAudit> for AuditResponse {
    fn from(audit: CorpusAudit) -> Self {
        Self {
            status: "success",
            total_chunks: audit.total_chunks,
            files: audit
                .sources
                .into_iter()
                .map(|(filename, chunks)| AuditFile { filename, chunks })
                .collect(),
        }
    }
}

pub async fn audit(State(state): State<Arc<AppState>>) -> Result<Json<AuditResponse>, ApiError> {
    let counts = state.store.count_by_source().await.map_err(|err| match err {
        RagError::NotConfigured(what) => {
            ApiError::ServiceUnavailable(format!("Database not configured: {} is not set", what))
        }
        other => {
            tracing::error!("Corpus audit failed: {}", other);
            ApiError::ServiceUnavailable(other.to_string())
        }
    })?;
    Ok(Json(CorpusAudit::from_counts(counts).into()))
}

pub async fn trigger_ingestion(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    state.start_ingestion()?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "accepted",
            "message": "Ingestion started in background. Check logs or /api/v1/ingest/report for progress."
        })),
    ))
}

pub async fn ingestion_report(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "running": state.ingestion_running(),
        "report": state.last_report().await,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_search_k")]
    pub k: usize,
}

fn default_search_k() -> usize {
    5
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchTrace>, ApiError> {
    if payload.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }
    if payload.k == 0 || payload.k > MAX_SEARCH_K {
        return Err(ApiError::BadRequest(format!(
            "k must be between 1 and {}",
            MAX_SEARCH_K
        )));
    }

    let trace = state.retriever.search_traced(&payload.query, payload.k).await;
    tracing::info!(
        outcome = ?trace.outcome,
        neighbors = trace.neighbor_ids.len(),
        missing = trace.missing_ids.len(),
        "Debug search served"
    );
    Ok(Json(trace))
}
