use async_trait::async_trait;

use super::types::ChatRequest;
use crate::core::errors::ApiError;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// provider name used in logs (e.g. "openai")
    fn name(&self) -> &str;

    /// chat completion (non-streaming), returns the first choice's text
    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError>;
}
