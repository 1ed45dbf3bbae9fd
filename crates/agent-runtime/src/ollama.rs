//! Ollama LLM Provider
//!
//! Local inference through an Ollama server. Used when no hosted model is
//! configured.

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{Completion, GenerationOptions, LlmProvider, ModelInfo},
};
use async_trait::async_trait;
use ollama_rs::{
    generation::chat::{request::ChatMessageRequest, ChatMessage, MessageRole},
    models::ModelOptions,
    Ollama,
};

/// Ollama server location and fallback model
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Host URL including scheme
    pub host: String,

    pub port: u16,

    /// Model used when the request does not name one
    pub default_model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
            default_model: "llama3.2".into(),
        }
    }
}

/// Ollama LLM provider
pub struct OllamaProvider {
    client: Ollama,
    config: OllamaConfig,
}

impl OllamaProvider {
    pub fn from_config(config: OllamaConfig) -> Self {
        Self {
            client: Ollama::new(config.host.clone(), config.port),
            config,
        }
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    fn model_for<'a>(&'a self, options: &'a GenerationOptions) -> &'a str {
        if options.model.trim().is_empty() {
            &self.config.default_model
        } else {
            &options.model
        }
    }

    fn to_chat_messages(messages: &[Message]) -> Vec<ChatMessage> {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::System => MessageRole::System,
                    Role::User => MessageRole::User,
                    Role::Assistant => MessageRole::Assistant,
                };
                ChatMessage::new(role, m.content.clone())
            })
            .collect()
    }

    fn to_model_options(options: &GenerationOptions) -> ModelOptions {
        let mut model_options = ModelOptions::default()
            .temperature(options.temperature)
            .top_p(options.top_p)
            .num_predict(i32::try_from(options.max_tokens).unwrap_or(i32::MAX));

        if !options.stop_sequences.is_empty() {
            model_options = model_options.stop(options.stop_sequences.clone());
        }

        model_options
    }
}

/// Connection failures are retryable, everything else is a plain provider fault
fn classify(err: &ollama_rs::error::OllamaError) -> AgentError {
    let text = err.to_string();
    let lowered = text.to_lowercase();

    if lowered.contains("connect") || lowered.contains("timed out") {
        AgentError::ProviderUnavailable(text)
    } else {
        AgentError::Provider(text)
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "Ollama"
    }

    async fn health_check(&self) -> Result<bool> {
        match self.list_models().await {
            Ok(models) => {
                let found = models.iter().any(|m| m.id.starts_with(&self.config.default_model));
                if !found {
                    tracing::warn!(model = %self.config.default_model, "Model not pulled on Ollama server");
                }
                Ok(found)
            }
            Err(e) => {
                tracing::warn!("Ollama health check failed: {e}");
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let model = self.model_for(options).to_string();
        let request = ChatMessageRequest::new(model.clone(), Self::to_chat_messages(messages))
            .options(Self::to_model_options(options));

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| classify(&e))?;

        Ok(Completion::text(response.message.content, model))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let local = self
            .client
            .list_local_models()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        Ok(local
            .into_iter()
            .map(|m| ModelInfo {
                id: m.name,
                context_length: None,
            })
            .collect())
    }
}
