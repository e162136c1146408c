//! Audience routing and prompt chains on top of retrieval.

pub mod audience;
pub mod engine;
pub mod prompts;

pub use audience::Audience;
pub use engine::{ContentEngine, GeneratedContent};
pub use prompts::Prompts;
