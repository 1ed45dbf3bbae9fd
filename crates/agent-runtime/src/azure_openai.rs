//! Azure OpenAI LLM Provider
//!
//! Chat completions against an Azure OpenAI deployment over its REST API.
//! The deployment selects the model; `GenerationOptions::model` is only
//! echoed back in the completion.

use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{Completion, FinishReason, GenerationOptions, LlmProvider, ModelInfo, TokenUsage},
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Azure OpenAI provider configuration
#[derive(Clone, Debug)]
pub struct AzureOpenAiConfig {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`
    pub endpoint: String,

    pub api_key: String,

    /// Deployment name
    pub deployment: String,

    /// REST API version
    pub api_version: String,

    /// HTTP request timeout
    pub request_timeout: Duration,
}

impl AzureOpenAiConfig {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        deployment: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            deployment: deployment.into(),
            api_version: "2024-02-01".into(),
            request_timeout: Duration::from_secs(120),
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }
}

/// Azure OpenAI LLM provider
pub struct AzureOpenAiProvider {
    client: reqwest::Client,
    config: AzureOpenAiConfig,
}

impl AzureOpenAiProvider {
    pub fn new(config: AzureOpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &AzureOpenAiConfig {
        &self.config
    }

    fn completions_url(&self) -> String {
        format!(
            "{endpoint}/openai/deployments/{deployment}/chat/completions?api-version={version}",
            endpoint = self.config.endpoint,
            deployment = self.config.deployment,
            version = self.config.api_version
        )
    }

    fn models_url(&self) -> String {
        format!(
            "{endpoint}/openai/models?api-version={version}",
            endpoint = self.config.endpoint,
            version = self.config.api_version
        )
    }

    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage<'_>> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: &m.content,
            })
            .collect()
    }

    fn build_request<'a>(messages: &'a [Message], options: &'a GenerationOptions) -> ChatRequest<'a> {
        ChatRequest {
            messages: Self::to_api_messages(messages),
            temperature: options.temperature,
            top_p: options.top_p,
            max_tokens: options.max_tokens,
            // Azure accepts at most four stop sequences.
            stop: (!options.stop_sequences.is_empty())
                .then(|| options.stop_sequences.iter().take(4).map(String::as_str).collect()),
        }
    }

    fn convert_response(response: ChatResponse, model: &str) -> Result<Completion> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("No choices in response".into()))?;

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            model: model.to_string(),
            usage: response
                .usage
                .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
            finish_reason: choice.finish_reason.as_deref().map(map_finish_reason),
        })
    }
}

/// Map an HTTP failure status to the agent error taxonomy
fn classify_status(status: StatusCode, body: String) -> AgentError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Auth(body),
        StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited(body),
        StatusCode::NOT_FOUND => AgentError::Config(format!("deployment not found: {body}")),
        s if s.is_client_error() => AgentError::InvalidRequest(format!("{s}: {body}")),
        s if s.is_server_error() => AgentError::ProviderUnavailable(format!("{s}: {body}")),
        s => AgentError::Provider(format!("{s}: {body}")),
    }
}

fn map_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "length" => FinishReason::Length,
        "content_filter" => FinishReason::ContentFilter,
        "stop" => FinishReason::Stop,
        _ => FinishReason::Error,
    }
}

fn transport_error(e: &reqwest::Error, timeout: Duration) -> AgentError {
    if e.is_timeout() {
        AgentError::Timeout {
            operation: "Azure OpenAI request".into(),
            seconds: timeout.as_secs(),
        }
    } else {
        AgentError::ProviderUnavailable(e.to_string())
    }
}

#[async_trait]
impl LlmProvider for AzureOpenAiProvider {
    fn name(&self) -> &str {
        "Azure OpenAI"
    }

    async fn health_check(&self) -> Result<bool> {
        match self.list_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Azure OpenAI health check failed: {e}");
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let request = Self::build_request(messages, options);

        tracing::debug!(
            deployment = %self.config.deployment,
            messages = messages.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(self.completions_url())
            .header("api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(&e, self.config.request_timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "Azure OpenAI returned error");
            return Err(classify_status(status, body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("Failed to parse response: {e}")))?;

        Self::convert_response(parsed, &options.model)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self
            .client
            .get(self.models_url())
            .header("api-key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| transport_error(&e, self.config.request_timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let list: ModelList = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("Failed to parse model list: {e}")))?;

        Ok(list
            .data
            .into_iter()
            .map(|m| ModelInfo {
                id: m.id,
                context_length: None,
            })
            .collect())
    }
}

// Wire types

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ApiMessage<'a>>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<&'a str>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct ModelList {
    data: Vec<ApiModel>,
}

#[derive(Deserialize)]
struct ApiModel {
    id: String,
}
