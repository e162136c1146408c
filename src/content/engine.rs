use std::time::Duration;

use serde::Serialize;

use super::audience::Audience;
use super::prompts::{narrative_prompt, topic_prompt, Prompts};
use crate::core::config::Settings;
use crate::core::errors::ApiError;
use crate::llm::{LlmClient, CLASSIFY_TEMPERATURE, GENERATE_TEMPERATURE};
use crate::rag::Retriever;

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedContent {
    pub audience: Audience,
    pub content: String,
}

/// Classifies a request, retrieves context for its audience and runs the
/// matching prompt chain.
#[derive(Clone)]
pub struct ContentEngine {
    llm: LlmClient,
    retriever: Retriever,
    prompts: Prompts,
    retrieval_timeout: Duration,
}

impl ContentEngine {
    pub fn new(llm: LlmClient, retriever: Retriever, settings: &Settings) -> Self {
        Self {
            llm,
            retriever,
            prompts: Prompts::new(&settings.content),
            retrieval_timeout: Duration::from_secs(settings.retrieval.timeout_secs.max(1)),
        }
    }

    pub async fn generate(&self, query: &str) -> Result<GeneratedContent, ApiError> {
        let audience = self.classify(query).await;
        tracing::info!(audience = %audience, "Detected audience");

        let context = self.context(audience, query).await;
        let content = match audience {
            Audience::Linkedin | Audience::General => {
                self.write(&self.prompts.linkedin_writer, query, &context).await?
            }
            Audience::PolicyUs => {
                let draft = self.write(&self.prompts.policy_brief, query, &context).await?;
                self.llm
                    .generate(&self.prompts.diplomacy_filter, &draft, GENERATE_TEMPERATURE)
                    .await?
            }
            Audience::Investor => {
                let pitch = self.write(&self.prompts.investor_pitch, query, &context).await?;
                let tech = self.write(&self.prompts.tech_explainer, query, &context).await?;
                format!("{}\n\nTechnical Context:\n{}", pitch, tech)
            }
            Audience::EgyptGov => {
                let brief = self.write(&self.prompts.egypt_briefing, query, &context).await?;
                self.llm
                    .generate(
                        &self.prompts.narrative_builder,
                        &narrative_prompt(&brief, &context),
                        GENERATE_TEMPERATURE,
                    )
                    .await?
            }
            Audience::Technical => {
                self.write(&self.prompts.tech_explainer, query, &context).await?
            }
        };

        Ok(GeneratedContent { audience, content })
    }

    /// Classifier failures fall back to the general route.
    pub async fn classify(&self, query: &str) -> Audience {
        match self
            .llm
            .generate(&self.prompts.classifier, query, CLASSIFY_TEMPERATURE)
            .await
        {
            Ok(reply) => Audience::parse(&reply),
            Err(err) => {
                tracing::warn!("Audience classification failed, using GENERAL: {}", err);
                Audience::General
            }
        }
    }

    async fn context(&self, audience: Audience, query: &str) -> String {
        let k = audience.neighbor_count();
        let passages = match tokio::time::timeout(
            self.retrieval_timeout,
            self.retriever.search(query, k),
        )
        .await
        {
            Ok(passages) => passages,
            Err(_) => {
                tracing::warn!(
                    "Retrieval timed out after {:?}, continuing without context",
                    self.retrieval_timeout
                );
                Vec::new()
            }
        };

        tracing::info!("[{}] Retrieved {} chunks", audience, passages.len());
        for (i, passage) in passages.iter().enumerate() {
            let preview: String = passage.chars().take(100).collect();
            tracing::debug!("[{}] Chunk {} preview: {}...", audience, i + 1, preview);
        }
        passages.join("\n")
    }

    async fn write(&self, system: &str, query: &str, context: &str) -> Result<String, ApiError> {
        self.llm
            .generate(system, &topic_prompt(query, context), GENERATE_TEMPERATURE)
            .await
    }
}
