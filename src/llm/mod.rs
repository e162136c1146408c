pub mod client;
pub mod openai;
pub mod provider;
pub mod types;

pub use client::{LlmClient, CLASSIFY_TEMPERATURE, GENERATE_TEMPERATURE};
pub use openai::OpenAiProvider;
pub use provider::LlmProvider;
pub use types::{ChatMessage, ChatRequest};
