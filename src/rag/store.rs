//! Durable chunk text keyed by the vector index IDs.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::chunker::Chunk;
use super::error::RagError;
use super::postgres::PgTextStore;
use super::sqlite::SqliteTextStore;
use crate::core::config::{AppPaths, Settings};

/// Database engine selected by the connection URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Postgres,
}

impl StoreBackend {
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.trim().split_once(':')?.0.to_ascii_lowercase();
        match scheme.as_str() {
            "sqlite" => Some(StoreBackend::Sqlite),
            "postgres" | "postgresql" => Some(StoreBackend::Postgres),
            _ => None,
        }
    }
}

/// Opens the configured text store; without a URL, the SQLite file in the data directory.
///
/// Settings validation rejects unknown schemes, so the SQLite arm only sees
/// SQLite URLs in practice.
pub fn open_text_store(settings: &Settings, paths: &AppPaths) -> Arc<dyn TextStore> {
    let url = settings
        .database
        .url
        .as_deref()
        .filter(|u| !u.trim().is_empty());
    match url.map(|u| (u, StoreBackend::from_url(u))) {
        Some((url, Some(StoreBackend::Postgres))) => {
            Arc::new(PgTextStore::new(Some(url.to_string())))
        }
        Some((url, _)) => Arc::new(SqliteTextStore::new(Some(url.to_string()))),
        None => Arc::new(SqliteTextStore::with_path(&paths.db_path)),
    }
}

/// Per-source chunk totals for auditing the corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusAudit {
    pub total_chunks: u64,
    pub sources: BTreeMap<String, u64>,
}

impl CorpusAudit {
    pub fn from_counts(sources: BTreeMap<String, u64>) -> Self {
        Self {
            total_chunks: sources.values().sum(),
            sources,
        }
    }
}

#[async_trait]
pub trait TextStore: Send + Sync {
    /// Inserts new rows; existing IDs get their content replaced and keep the
    /// source recorded on first insert. A failure aborts the whole call.
    async fn upsert_chunks(&self, chunks: &[Chunk]) -> Result<usize, RagError>;

    async fn upsert(&self, id: &str, content: &str, source: &str) -> Result<(), RagError> {
        let chunk = Chunk {
            id: id.to_string(),
            content: content.to_string(),
            source: source.to_string(),
            start_offset: 0,
        };
        self.upsert_chunks(std::slice::from_ref(&chunk)).await.map(|_| ())
    }

    /// Content for the IDs that exist; unknown IDs are silently omitted.
    async fn fetch_by_ids(&self, ids: &[String]) -> Result<HashMap<String, String>, RagError>;

    async fn count_by_source(&self) -> Result<BTreeMap<String, u64>, RagError>;

    /// Cheap connectivity check.
    async fn ping(&self) -> Result<(), RagError>;
}
