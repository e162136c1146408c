//! Vector index client for Vertex AI Vector Search.
//!
//! The index itself is built outside this service from the ingestion batch
//! file; this module only queries a deployed index for nearest neighbours.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use super::auth::GoogleTokenSource;
use super::error::RagError;
use crate::core::config::Settings;

#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn name(&self) -> &str;

    /// Returns up to `k` datapoint IDs, nearest first.
    async fn find_neighbors(&self, query: &[f32], k: usize) -> Result<Vec<String>, RagError>;
}

/// Best-effort front for a [`VectorIndex`]: failures become an empty ranking.
#[derive(Clone)]
pub struct VectorIndexClient {
    index: Arc<dyn VectorIndex>,
}

impl VectorIndexClient {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }

    pub async fn find_neighbors(&self, query: &[f32], k: usize) -> Vec<String> {
        match self.index.find_neighbors(query, k).await {
            Ok(ids) => ids,
            Err(RagError::NotConfigured(what)) => {
                tracing::warn!("{} not set, vector search is disabled", what);
                Vec::new()
            }
            Err(err) => {
                tracing::error!(index = self.index.name(), "Error searching index: {}", err);
                Vec::new()
            }
        }
    }
}

struct IndexHandle {
    client: Client,
    find_neighbors_url: String,
}

pub struct VertexVectorIndex {
    project_id: Option<String>,
    region: String,
    index_endpoint_id: Option<String>,
    deployed_index_id: Option<String>,
    public_endpoint_domain: Option<String>,
    api_base: Option<String>,
    tokens: GoogleTokenSource,
    timeout: Duration,
    handle: OnceCell<IndexHandle>,
}

impl VertexVectorIndex {
    pub fn new(settings: &Settings) -> Self {
        let vs = &settings.vector_search;
        Self {
            project_id: settings.google.project_id.clone(),
            region: settings.google.region.clone(),
            index_endpoint_id: non_blank(vs.index_endpoint_id.as_deref()),
            deployed_index_id: non_blank(vs.deployed_index_id.as_deref()),
            public_endpoint_domain: non_blank(vs.public_endpoint_domain.as_deref()),
            api_base: vs.api_base.clone(),
            tokens: GoogleTokenSource::from_settings(settings),
            timeout: Duration::from_secs(vs.timeout_secs),
            handle: OnceCell::new(),
        }
    }

    /// `projects/{p}/locations/{r}/indexEndpoints/{id}` for bare numeric IDs.
    fn endpoint_resource(&self) -> Result<String, RagError> {
        let endpoint_id = self
            .index_endpoint_id
            .as_deref()
            .ok_or(RagError::NotConfigured("VERTEX_INDEX_ENDPOINT_ID"))?;
        if endpoint_id.contains('/') {
            return Ok(endpoint_id.trim_matches('/').to_string());
        }
        let project_id = self
            .project_id
            .as_deref()
            .ok_or(RagError::NotConfigured("GOOGLE_CLOUD_PROJECT"))?;
        Ok(format!(
            "projects/{}/locations/{}/indexEndpoints/{}",
            project_id, self.region, endpoint_id
        ))
    }

    fn control_plane_base(&self) -> String {
        self.api_base
            .clone()
            .unwrap_or_else(|| format!("https://{}-aiplatform.googleapis.com", self.region))
            .trim_end_matches('/')
            .to_string()
    }

    async fn handle(&self) -> Result<&IndexHandle, RagError> {
        self.handle
            .get_or_try_init(|| async {
                let resource = self.endpoint_resource()?;

                let client = Client::builder().timeout(self.timeout).build()?;

                let domain = match self.public_endpoint_domain.clone() {
                    Some(domain) => domain,
                    None => self.lookup_public_domain(&client, &resource).await?,
                };
                let base = if domain.starts_with("http://") || domain.starts_with("https://") {
                    domain.trim_end_matches('/').to_string()
                } else {
                    format!("https://{}", domain.trim_end_matches('/'))
                };

                tracing::info!("Vector search endpoint resolved: {}", resource);
                Ok::<_, RagError>(IndexHandle {
                    client,
                    find_neighbors_url: format!("{}/v1/{}:findNeighbors", base, resource),
                })
            })
            .await
    }

    async fn lookup_public_domain(&self, client: &Client, resource: &str) -> Result<String, RagError> {
        let url = format!("{}/v1/{}", self.control_plane_base(), resource);
        let res = self.tokens.authorize(client.get(&url)).await?.send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(RagError::from_status(status.as_u16(), body));
        }

        let endpoint: IndexEndpointInfo = res.json().await?;
        endpoint
            .public_endpoint_domain_name
            .filter(|d| !d.is_empty())
            .ok_or_else(|| RagError::Provider {
                status: status.as_u16(),
                message: format!("{} has no public endpoint domain", resource),
            })
    }
}

#[async_trait]
impl VectorIndex for VertexVectorIndex {
    fn name(&self) -> &str {
        "vertex-vector-search"
    }

    async fn find_neighbors(&self, query: &[f32], k: usize) -> Result<Vec<String>, RagError> {
        if k == 0 || query.is_empty() {
            return Ok(Vec::new());
        }
        let handle = self.handle().await?;
        let deployed_index_id = self
            .deployed_index_id
            .as_deref()
            .ok_or(RagError::NotConfigured("VERTEX_DEPLOYED_INDEX_ID"))?;

        let request = FindNeighborsRequest {
            deployed_index_id,
            queries: vec![NeighborQuery {
                datapoint: QueryDatapoint {
                    datapoint_id: "query",
                    feature_vector: query,
                },
                neighbor_count: k,
            }],
            return_full_datapoint: false,
        };

        let res = self
            .tokens
            .authorize(handle.client.post(&handle.find_neighbors_url))
            .await?
            .json(&request)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(RagError::from_status(status.as_u16(), body));
        }

        let payload: FindNeighborsResponse = res.json().await?;
        let mut ids: Vec<String> = payload
            .nearest_neighbors
            .into_iter()
            .next()
            .map(|result| {
                result
                    .neighbors
                    .into_iter()
                    .map(|n| n.datapoint.datapoint_id)
                    .collect()
            })
            .unwrap_or_default();
        ids.truncate(k);
        Ok(ids)
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexEndpointInfo {
    public_endpoint_domain_name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FindNeighborsRequest<'a> {
    deployed_index_id: &'a str,
    queries: Vec<NeighborQuery<'a>>,
    return_full_datapoint: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NeighborQuery<'a> {
    datapoint: QueryDatapoint<'a>,
    neighbor_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryDatapoint<'a> {
    datapoint_id: &'a str,
    feature_vector: &'a [f32],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindNeighborsResponse {
    #[serde(default)]
    nearest_neighbors: Vec<NearestNeighbors>,
}

#[derive(Deserialize)]
struct NearestNeighbors {
    #[serde(default)]
    neighbors: Vec<Neighbor>,
}

#[derive(Deserialize)]
struct Neighbor {
    datapoint: NeighborDatapoint,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NeighborDatapoint {
    datapoint_id: String,
}
