use thiserror::Error;

/// Failures raised by the RAG components.
///
/// Pipelines never propagate these past their public entry points; they are
/// logged and flattened into empty or degraded results.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("text extraction failed: {0}")]
    Extraction(String),
}

impl RagError {
    /// Builds an error from a non-success HTTP response, recognising quota signals.
    pub fn from_status(status: u16, body: String) -> Self {
        if status == 429 || mentions_quota(&body) {
            RagError::QuotaExhausted(format!("{}: {}", status, body))
        } else {
            RagError::Provider {
                status,
                message: body,
            }
        }
    }

    /// Only resource-exhaustion failures are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, RagError::QuotaExhausted(_))
    }
}

fn mentions_quota(message: &str) -> bool {
    message.contains("Quota")
        || message.contains("quota")
        || message.contains("RESOURCE_EXHAUSTED")
        || message.contains("ResourceExhausted")
}
