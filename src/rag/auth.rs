//! OAuth bearer tokens for the Google APIs (Vertex AI, Cloud Storage).
//!
//! A configured `access_token` is sent as-is. Otherwise, when a metadata
//! token URL is configured (GCE, Cloud Run), tokens come from the metadata
//! server and are cached until shortly before they expire. With neither,
//! requests go out without an `Authorization` header.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::Instant;

use super::error::RagError;
use crate::core::config::Settings;

/// Tokens this close to expiry are refreshed before use.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

struct CachedToken {
    token: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

pub struct GoogleTokenSource {
    static_token: Option<String>,
    metadata_url: Option<String>,
    client: OnceCell<Client>,
    cached: Mutex<Option<CachedToken>>,
}

impl GoogleTokenSource {
    pub fn new(static_token: Option<String>, metadata_url: Option<String>) -> Self {
        let non_blank = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        Self {
            static_token: non_blank(static_token),
            metadata_url: non_blank(metadata_url),
            client: OnceCell::new(),
            cached: Mutex::new(None),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.google.access_token.clone(),
            settings.google.metadata_token_url.clone(),
        )
    }

    /// Current bearer token, or `None` when no credentials are configured.
    pub async fn token(&self) -> Result<Option<String>, RagError> {
        if let Some(token) = &self.static_token {
            return Ok(Some(token.clone()));
        }
        let Some(url) = self.metadata_url.as_deref() else {
            return Ok(None);
        };

        let mut cached = self.cached.lock().await;
        if let Some(current) = cached.as_ref() {
            if current.expires_at > Instant::now() + REFRESH_MARGIN {
                return Ok(Some(current.token.clone()));
            }
        }

        let fresh = self.fetch(url).await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(Some(token))
    }

    /// Adds the bearer header to `request` when a token is available.
    pub async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, RagError> {
        Ok(match self.token().await? {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    async fn fetch(&self, url: &str) -> Result<CachedToken, RagError> {
        let client = self
            .client
            .get_or_try_init(|| async { Client::builder().timeout(METADATA_TIMEOUT).build() })
            .await?;

        let res = client
            .get(url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(RagError::from_status(status.as_u16(), body));
        }

        let payload: MetadataToken = res.json().await?;
        if payload.access_token.trim().is_empty() {
            return Err(RagError::Provider {
                status: status.as_u16(),
                message: "metadata server returned an empty access token".to_string(),
            });
        }
        tracing::debug!(expires_in = payload.expires_in, "Fetched access token from metadata server");
        Ok(CachedToken {
            token: payload.access_token,
            expires_at: Instant::now() + Duration::from_secs(payload.expires_in),
        })
    }
}
