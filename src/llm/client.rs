use std::sync::Arc;

use super::provider::LlmProvider;
use super::types::ChatRequest;
use crate::core::errors::ApiError;

pub const CLASSIFY_TEMPERATURE: f64 = 0.0;
pub const GENERATE_TEMPERATURE: f64 = 0.7;

/// Thin retrying front for an [`LlmProvider`].
#[derive(Clone)]
pub struct LlmClient {
    provider: Arc<dyn LlmProvider>,
    max_retries: u32,
}

impl LlmClient {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            max_retries: 1,
        }
    }

    pub async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f64,
    ) -> Result<String, ApiError> {
        let request = ChatRequest::prompt(system_prompt, user_prompt).with_temperature(temperature);

        let mut attempt = 0;
        loop {
            match self.provider.chat(request.clone()).await {
                Ok(reply) => return Ok(reply),
                Err(err) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        provider = self.provider.name(),
                        "LLM call failed (attempt {}/{}): {}",
                        attempt,
                        self.max_retries + 1,
                        err
                    );
                }
                Err(err) => {
                    tracing::error!(provider = self.provider.name(), "LLM call failed: {}", err);
                    return Err(err);
                }
            }
        }
    }
}
