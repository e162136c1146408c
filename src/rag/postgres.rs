//! PostgreSQL-backed text store, for Cloud SQL deployments.
//!
//! Same `document_chunks` table as the SQLite store. Cloud SQL socket URLs of
//! the form `postgresql://user:pass@/db?host=/cloudsql/...` are accepted.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Row};
use tokio::sync::OnceCell;

use super::chunker::Chunk;
use super::error::RagError;
use super::store::TextStore;

pub struct PgTextStore {
    url: Option<String>,
    pool: OnceCell<PgPool>,
}

impl PgTextStore {
    pub fn new(url: Option<String>) -> Self {
        Self {
            url: url.filter(|u| !u.trim().is_empty()),
            pool: OnceCell::new(),
        }
    }

    async fn pool(&self) -> Result<&PgPool, RagError> {
        self.pool
            .get_or_try_init(|| async {
                let url = self
                    .url
                    .as_deref()
                    .ok_or(RagError::NotConfigured("database url"))?;
                let options = PgConnectOptions::from_str(&normalize_socket_url(url))?;

                let pool = PgPoolOptions::new()
                    .min_connections(1)
                    .max_connections(4)
                    .acquire_timeout(Duration::from_secs(10))
                    .connect_with(options)
                    .await?;

                init_schema(&pool).await?;
                Ok::<_, RagError>(pool)
            })
            .await
    }
}

/// Fills in a placeholder host when the URL names only a socket directory.
///
/// `user:pass@/db` has no host, which the URL parser rejects; the `host`
/// query parameter still wins because it starts with `/`.
fn normalize_socket_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let authority_start = scheme_end + 3;
    let rest = &url[authority_start..];
    let authority_len = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..authority_len];
    if authority.is_empty() || authority.ends_with('@') {
        format!(
            "{}{}localhost{}",
            &url[..authority_start],
            authority,
            &rest[authority_len..]
        )
    } else {
        url.to_string()
    }
}

async fn init_schema(pool: &PgPool) -> Result<(), RagError> {
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
impl TextStore for PgTextStore {
    async fn upsert_chunks(&self, chunks: &[Chunk]) -> Result<usize, RagError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let pool = self.pool().await?;
        let mut tx = pool.begin().await?;

        for chunk in chunks {
            sqlx::query(
                "INSERT INTO document_chunks (id, content, source)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (id) DO UPDATE SET content = EXCLUDED.content",
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
        let rows = sqlx::query("SELECT id, content FROM document_chunks WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await?;

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
        sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_urls_get_a_placeholder_host() {
        assert_eq!(
            normalize_socket_url("postgresql://sdc:pw@/sdc?host=/cloudsql/p:r:i"),
            "postgresql://sdc:pw@localhost/sdc?host=/cloudsql/p:r:i"
        );
        assert_eq!(
            normalize_socket_url("postgres:///sdc?host=/var/run/postgresql"),
            "postgres://localhost/sdc?host=/var/run/postgresql"
        );
        assert_eq!(
            normalize_socket_url("postgres://u:p@db.internal:5432/sdc"),
            "postgres://u:p@db.internal:5432/sdc"
        );
    }

    #[test]
    fn cloud_sql_socket_url_parses() {
        let options =
            PgConnectOptions::from_str(&normalize_socket_url("postgresql://sdc:pw@/sdc?host=/cloudsql/p:r:i"))
                .unwrap();
        assert_eq!(options.get_database(), Some("sdc"));
        assert_eq!(options.get_username(), "sdc");
    }

    #[tokio::test]
    async fn unconfigured_store_reports_not_configured() {
        let store = PgTextStore::new(Some("  ".to_string()));
        assert!(matches!(store.ping().await, Err(RagError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_database_error() {
        let store = PgTextStore::new(Some("postgres://sdc:pw@127.0.0.1:1/sdc".to_string()));
        assert!(matches!(
            store.fetch_by_ids(&["a_0".to_string()]).await,
            Err(RagError::Database(_))
        ));
        assert!(store.fetch_by_ids(&[]).await.unwrap().is_empty());
    }

    /// Runs against a live server when `SDC_TEST_POSTGRES_URL` is set.
    #[tokio::test]
    async fn upsert_and_fetch_against_live_server() {
        let Ok(url) = std::env::var("SDC_TEST_POSTGRES_URL") else {
            return;
        };
        let store = PgTextStore::new(Some(url));
        let id = format!("pg-test-{}_0", uuid::Uuid::new_v4());

        store.upsert(&id, "first", "pg.pdf").await.unwrap();
        store.upsert(&id, "second", "other.pdf").await.unwrap();

        let rows = store.fetch_by_ids(&[id.clone(), "missing_0".to_string()]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[&id], "second");
        assert!(store.count_by_source().await.unwrap().contains_key("pg.pdf"));
    }
}
