//! Embedding provider: batched text embeddings with quota-aware retry.
//!
//! `EmbeddingProvider` is all-or-nothing per call. A batch either comes back
//! fully embedded and positionally aligned with its input, or the caller gets
//! an empty vector meaning "no embeddings available".

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use super::auth::GoogleTokenSource;
use super::error::RagError;
use crate::core::config::Settings;

/// Raw embedding call against a concrete model service.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Embeds `texts` in order. Errors are returned untouched for the retry layer.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;
}

/// Exponential backoff: attempt `n` (0-based) waits `base_delay * 2^n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            base_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

pub struct EmbeddingProvider {
    backend: Arc<dyn EmbeddingBackend>,
    retry: RetryPolicy,
}

impl EmbeddingProvider {
    pub fn new(backend: Arc<dyn EmbeddingBackend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let retry = RetryPolicy {
            max_attempts: settings.embedding.max_attempts.max(1),
            base_delay: settings.embedding.backoff_base(),
        };
        Self::new(Arc::new(VertexEmbeddingBackend::new(settings)), retry)
    }

    /// Embeds a batch; an empty result means the whole batch failed.
    pub async fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        match self.try_embed_batch(texts).await {
            Ok(embeddings) => embeddings,
            Err(RagError::NotConfigured(what)) => {
                tracing::warn!("Embedding provider unavailable: {} is not configured", what);
                Vec::new()
            }
            Err(err) => {
                tracing::error!(
                    backend = self.backend.name(),
                    batch = texts.len(),
                    "Embedding batch failed: {}",
                    err
                );
                Vec::new()
            }
        }
    }

    pub async fn embed_one(&self, text: &str) -> Vec<f32> {
        self.embed_batch(&[text.to_string()])
            .await
            .into_iter()
            .next()
            .unwrap_or_default()
    }

    /// Same as [`embed_batch`](Self::embed_batch) but keeps the failure.
    pub async fn try_embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut attempt = 0u32;
        loop {
            match self.backend.embed(texts).await {
                Ok(embeddings) => {
                    if embeddings.len() != texts.len() {
                        return Err(RagError::Provider {
                            status: 200,
                            message: format!(
                                "{} returned {} embeddings for {} inputs",
                                self.backend.name(),
                                embeddings.len(),
                                texts.len()
                            ),
                        });
                    }
                    return Ok(embeddings);
                }
                Err(err) if err.is_transient() && attempt + 1 < self.retry.max_attempts => {
                    let wait = self.retry.delay_for(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = self.retry.max_attempts,
                        "Quota exceeded, retrying in {:?}: {}",
                        wait,
                        err
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Vertex AI `:predict` endpoint for text embedding models.
pub struct VertexEmbeddingBackend {
    project_id: Option<String>,
    region: String,
    model: String,
    api_base: Option<String>,
    tokens: GoogleTokenSource,
    timeout: Duration,
    client: OnceCell<Client>,
}

impl VertexEmbeddingBackend {
    pub fn new(settings: &Settings) -> Self {
        Self {
            project_id: settings.google.project_id.clone(),
            region: settings.google.region.clone(),
            model: settings.embedding.model.clone(),
            api_base: settings.embedding.api_base.clone(),
            tokens: GoogleTokenSource::from_settings(settings),
            timeout: Duration::from_secs(settings.embedding.timeout_secs),
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> Result<&Client, RagError> {
        self.client
            .get_or_try_init(|| async {
                let mut headers = HeaderMap::new();
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                let client = Client::builder()
                    .timeout(self.timeout)
                    .default_headers(headers)
                    .build()?;
                Ok::<_, RagError>(client)
            })
            .await
    }

    fn endpoint(&self, project_id: &str) -> String {
        let base = self
            .api_base
            .clone()
            .unwrap_or_else(|| format!("https://{}-aiplatform.googleapis.com", self.region));
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:predict",
            base.trim_end_matches('/'),
            project_id,
            self.region,
            self.model
        )
    }
}

#[async_trait]
impl EmbeddingBackend for VertexEmbeddingBackend {
    fn name(&self) -> &str {
        "vertex"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let project_id = self
            .project_id
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or(RagError::NotConfigured("GOOGLE_CLOUD_PROJECT"))?;
        let client = self.client().await?;

        let request = PredictRequest {
            instances: texts
                .iter()
                .map(|content| PredictInstance {
                    content: content.as_str(),
                })
                .collect(),
        };

        let res = self
            .tokens
            .authorize(client.post(self.endpoint(project_id)))
            .await?
            .json(&request)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(RagError::from_status(status.as_u16(), body));
        }

        let payload: PredictResponse = res.json().await?;
        Ok(payload
            .predictions
            .into_iter()
            .map(|p| p.embeddings.values)
            .collect())
    }
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    instances: Vec<PredictInstance<'a>>,
}

#[derive(Serialize)]
struct PredictInstance<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize)]
struct Prediction {
    embeddings: PredictionValues,
}

#[derive(Deserialize)]
struct PredictionValues {
    values: Vec<f32>,
}
