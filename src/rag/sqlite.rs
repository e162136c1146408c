//! SQLite-backed text store.
//!
//! The pool is opened lazily on first use and the `document_chunks` table is
//! created at that point if missing.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tokio::sync::OnceCell;

use super::chunker::Chunk;
use super::error::RagError;
use super::store::TextStore;

pub struct SqliteTextStore {
    url: Option<String>,
    pool: OnceCell<SqlitePool>,
}

impl SqliteTextStore {
    pub fn new(url: Option<String>) -> Self {
        Self {
            url: url.filter(|u| !u.trim().is_empty()),
            pool: OnceCell::new(),
        }
    }

    pub fn with_path(db_path: &Path) -> Self {
        Self::new(Some(format!("sqlite://{}", db_path.display())))
    }

    async fn pool(&self) -> Result<&SqlitePool, RagError> {
        self.pool
            .get_or_try_init(|| async {
                let url = self
                    .url
                    .as_deref()
                    .ok_or(RagError::NotConfigured("database url"))?;
                let options = SqliteConnectOptions::from_str(url)?
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal);

                let pool = SqlitePoolOptions::new()
                    .min_connections(1)
                    .max_connections(4)
                    .connect_with(options)
                    .await?;

                init_schema(&pool).await?;
                Ok::<_, RagError>(pool)
            })
            .await
    }
}

async fn init_schema(pool: &SqlitePool) -> Result<(), RagError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS document_chunks (
            id TEXT PRIMARY KEY,
            content TEXT,
            source TEXT
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_document_chunks_source ON document_chunks(source)")
        .execute(pool)
        .await?;

    tracing::debug!("Ensured 'document_chunks' table exists");
    Ok(())
}

#[async_trait]
impl TextStore for SqliteTextStore {
    async fn upsert_chunks(&self, chunks: &[Chunk]) -> Result<usize, RagError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let pool = self.pool().await?;
        let mut tx = pool.begin().await?;

        for chunk in chunks {
            sqlx::query(
                "INSERT INTO document_chunks (id, content, source)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET content = excluded.content",
            )
            .bind(&chunk.id)
            .bind(&chunk.content)
            .bind(&chunk.source)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(chunks.len())
    }

    async fn fetch_by_ids(&self, ids: &[String]) -> Result<HashMap<String, String>, RagError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let pool = self.pool().await?;
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id, content FROM document_chunks WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(")");

        let rows = query.build().fetch_all(pool).await?;
        Ok(rows
            .iter()
            .map(|row| {
                let id: String = row.get("id");
                let content: Option<String> = row.get("content");
                (id, content.unwrap_or_default())
            })
            .collect())
    }

    async fn count_by_source(&self) -> Result<BTreeMap<String, u64>, RagError> {
        let pool = self.pool().await?;
        let rows = sqlx::query(
            "SELECT COALESCE(source, '') AS source, COUNT(*) AS chunks
             FROM document_chunks
             GROUP BY source",
        )
        .fetch_all(pool)
        .await?;

        let mut counts = BTreeMap::new();
        for row in &rows {
            let source: String = row.get("source");
            let chunks: i64 = row.get("chunks");
            *counts.entry(source).or_insert(0) += chunks.max(0) as u64;
        }
        Ok(counts)
    }

    async fn ping(&self) -> Result<(), RagError> {
        let pool = self.pool().await?;
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(pool)
            .await?;
        Ok(())
    }
}
