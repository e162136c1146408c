//! Typed view over the merged YAML configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub google: GoogleSettings,
    pub embedding: EmbeddingSettings,
    pub vector_search: VectorSearchSettings,
    pub storage: StorageSettings,
    pub database: DatabaseSettings,
    pub openai: OpenAiSettings,
    pub ingest: IngestSettings,
    pub retrieval: RetrievalSettings,
    pub content: ContentSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    pub project_id: Option<String>,
    pub region: String,
    /// Fixed OAuth bearer token for Vertex AI and Cloud Storage calls.
    pub access_token: Option<String>,
    /// Metadata server token endpoint, used when no fixed token is set.
    pub metadata_token_url: Option<String>,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            project_id: None,
            region: "us-central1".to_string(),
            access_token: None,
            metadata_token_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model: String,
    /// Overrides `https://{region}-aiplatform.googleapis.com`.
    pub api_base: Option<String>,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-004".to_string(),
            api_base: None,
            max_attempts: 6,
            backoff_base_ms: 5_000,
            timeout_secs: 60,
        }
    }
}

impl EmbeddingSettings {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorSearchSettings {
    /// Full resource name or bare numeric ID of the index endpoint.
    pub index_endpoint_id: Option<String>,
    pub deployed_index_id: Option<String>,
    /// Skips endpoint metadata lookup when set.
    pub public_endpoint_domain: Option<String>,
    pub api_base: Option<String>,
    pub timeout_secs: u64,
}

impl Default for VectorSearchSettings {
    fn default() -> Self {
        Self {
            index_endpoint_id: None,
            deployed_index_id: None,
            public_endpoint_domain: None,
            api_base: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub bucket: Option<String>,
    pub object_name: String,
    pub api_base: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            bucket: None,
            object_name: "index-source/embeddings.json".to_string(),
            api_base: "https://storage.googleapis.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// `sqlite:` or `postgres(ql)://` connection string; falls back to the
    /// SQLite file in the data directory.
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub source_dir: String,
    pub output_dir: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub batch_size: usize,
    pub pacing_ms: u64,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            source_dir: "data/raw_pdfs".to_string(),
            output_dir: "data/index-source".to_string(),
            chunk_size: 1000,
            chunk_overlap: 100,
            batch_size: 5,
            pacing_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub timeout_secs: u64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentSettings {
    pub organization: String,
    /// Exact reply the prompt templates ask for when context is unrelated.
    pub fallback_reply: String,
}

impl Default for ContentSettings {
    fn default() -> Self {
        Self {
            organization: "SDC-36".to_string(),
            fallback_reply: "I don't know, please send an inquiry to the SDC-36 team.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}
