//! Publishes the embedding batch file to object storage for index builds.

use std::path::Path;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use tokio::sync::OnceCell;

use super::auth::GoogleTokenSource;
use super::error::RagError;
use crate::core::config::Settings;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Uploads `local` as `object_name`, replacing any previous version.
    /// Returns the object URI.
    async fn upload_file(&self, local: &Path, object_name: &str) -> Result<String, RagError>;
}

/// Google Cloud Storage JSON API, single-request media upload.
pub struct GcsObjectStore {
    bucket: Option<String>,
    api_base: String,
    tokens: GoogleTokenSource,
    client: OnceCell<Client>,
}

impl GcsObjectStore {
    pub fn new(settings: &Settings) -> Self {
        Self {
            bucket: settings
                .storage
                .bucket
                .clone()
                .filter(|b| !b.trim().is_empty()),
            api_base: settings.storage.api_base.trim_end_matches('/').to_string(),
            tokens: GoogleTokenSource::from_settings(settings),
            client: OnceCell::new(),
        }
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    async fn upload_file(&self, local: &Path, object_name: &str) -> Result<String, RagError> {
        let bucket = self
            .bucket
            .as_deref()
            .ok_or(RagError::NotConfigured("GCS_BUCKET_NAME"))?;
        let client = self
            .client
            .get_or_try_init(|| async { Client::builder().build() })
            .await?;

        let body = tokio::fs::read(local).await?;
        let url = format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.api_base,
            urlencoding::encode(bucket),
            urlencoding::encode(object_name)
        );

        let res = self
            .tokens
            .authorize(client.post(&url))
            .await?
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body)
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::from_status(status.as_u16(), text));
        }

        Ok(format!("gs://{}/{}", bucket, object_name))
    }
}
