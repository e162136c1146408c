use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::OnceCell;

use super::provider::LlmProvider;
use super::types::ChatRequest;
use crate::core::config::Settings;
use crate::core::errors::ApiError;

/// OpenAI-compatible `/chat/completions` provider.
pub struct OpenAiProvider {
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
    client: OnceCell<Client>,
}

impl OpenAiProvider {
    pub fn new(settings: &Settings) -> Self {
        let openai = &settings.openai;
        Self {
            base_url: openai.base_url.trim_end_matches('/').to_string(),
            api_key: openai.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: openai.model.clone(),
            timeout: Duration::from_secs(openai.timeout_secs.max(1)),
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> Result<&Client, ApiError> {
        self.client
            .get_or_try_init(|| async {
                Client::builder()
                    .timeout(self.timeout)
                    .build()
                    .map_err(ApiError::internal)
            })
            .await
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ApiError::ServiceUnavailable("OpenAI client not initialized. Check OPENAI_API_KEY.".into())
        })?;
        let client = self.client().await?;
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = json!({
            "model": self.model,
            "messages": request.messages,
        });
        if let (Some(obj), Some(t)) = (body.as_object_mut(), request.temperature) {
            obj.insert("temperature".to_string(), json!(t));
        }

        let res = client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!("OpenAI chat error {}: {}", status, text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ApiError::Upstream("OpenAI response has no message content".into()))
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn settings_for(server: &MockServer) -> Settings {
        let mut settings = Settings::default();
        settings.openai.api_key = Some("sk-test".to_string());
        settings.openai.base_url = format!("{}/v1", server.uri());
        settings.openai.model = "gpt-4o".to_string();
        settings
    }

    #[tokio::test]
    async fn posts_messages_and_reads_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "temperature": 0.0,
                "messages": [
                    {"role": "system", "content": "classify"},
                    {"role": "user", "content": "pitch deck"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "INVESTOR"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new(&settings_for(&server));
        let reply = provider
            .chat(ChatRequest::prompt("classify", "pitch deck").with_temperature(0.0))
            .await
            .unwrap();
        assert_eq!(reply, "INVESTOR");
    }

    #[tokio::test]
    async fn body_carries_only_model_messages_and_temperature() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "ok"}}]
            })))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new(&settings_for(&server));
        provider.chat(ChatRequest::prompt("s", "u")).await.unwrap();
        provider
            .chat(ChatRequest::prompt("s", "u").with_temperature(0.7))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let keys = |i: usize| {
            let body: Value = serde_json::from_slice(&requests[i].body).unwrap();
            let mut keys: Vec<String> = body.as_object().unwrap().keys().cloned().collect();
            keys.sort();
            keys
        };
        assert_eq!(keys(0), vec!["messages", "model"]);
        assert_eq!(keys(1), vec!["messages", "model", "temperature"]);
    }

    #[tokio::test]
    async fn error_status_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new(&settings_for(&server));
        let err = provider.chat(ChatRequest::prompt("s", "u")).await.unwrap_err();
        assert!(matches!(err, ApiError::Upstream(msg) if msg.contains("overloaded")));
    }

    #[tokio::test]
    async fn missing_key_is_unavailable() {
        let provider = OpenAiProvider::new(&Settings::default());
        let err = provider.chat(ChatRequest::prompt("s", "u")).await.unwrap_err();
        assert!(matches!(err, ApiError::ServiceUnavailable(_)));
    }
}
