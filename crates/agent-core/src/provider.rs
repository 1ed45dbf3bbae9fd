//! LLM Provider Strategy Pattern
//!
//! The reasoning loop and the retrieval chain only ever talk to a model
//! through [`LlmProvider`], so a local Ollama server and a hosted Azure
//! deployment are interchangeable.
//!
//! ```rust,ignore
//! let options = GenerationOptions::for_model("gpt-4o").with_stop("\nObservation:");
//! let completion = provider.complete(&[Message::user(prompt)], &options).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;

/// Sampling and length settings for one completion
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model or deployment name; providers may substitute their own default when empty
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on generated tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Generation halts before emitting any of these
    #[serde(default)]
    pub stop_sequences: Vec<String>,
}

const fn default_temperature() -> f32 {
    0.7
}

const fn default_max_tokens() -> u32 {
    2048
}

const fn default_top_p() -> f32 {
    0.9
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self::for_model("llama3.2")
    }
}

impl GenerationOptions {
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            stop_sequences: Vec::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_stop(mut self, stop: impl Into<String>) -> Self {
        self.stop_sequences.push(stop.into());
        self
    }
}

/// Text produced by a model
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Completion {
    pub content: String,

    /// Model that actually answered
    pub model: String,

    #[serde(default)]
    pub usage: Option<TokenUsage>,

    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

impl Completion {
    /// Completion that ended normally, without usage figures
    pub fn text(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            usage: None,
            finish_reason: Some(FinishReason::Stop),
        }
    }

    /// Whether the model ran out of tokens mid-output
    pub fn is_truncated(&self) -> bool {
        self.finish_reason == Some(FinishReason::Length)
    }
}

/// Token accounting reported by the provider
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Why generation stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Error,
}

/// A model the provider can serve
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub context_length: Option<u32>,
}

/// Strategy trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Whether the backend is reachable and ready to serve
    async fn health_check(&self) -> Result<bool>;

    /// Generate a completion from messages
    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion>;

    async fn list_models(&self) -> Result<Vec<ModelInfo>>;
}
