//! Language model provider
//!
//! Story text comes from a hosted chat-completion model. The pipeline only
//! sees the [`LanguageModel`] trait, so tests swap in a scripted fake.

use async_trait::async_trait;
use thiserror::Error;

pub mod openai;

pub use openai::OpenAiClient;

/// Errors raised while talking to the model provider.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model provider is not configured: {0}")]
    NotConfigured(String),
    #[error("model provider returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("No response from OpenAI")]
    EmptyResponse,
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// One chat completion: a system prompt, a user prompt and sampling settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the provider to constrain output to a JSON object.
    pub json_output: bool,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the text of the first choice.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}
