//! Agent Errors
//!
//! One error enum shared by the reasoning loop, the tool registry and the
//! model providers. Tool failures never leave the loop as errors: they are
//! turned into observations. Provider failures decide whether the loop keeps
//! going ([`AgentError::is_retryable`]) or ends the turn.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {
    /// The model backend answered with an error
    #[error("LLM request failed: {0}")]
    Provider(String),

    /// The model backend refused the request itself; resending it fails the same way
    #[error("LLM request rejected: {0}")]
    InvalidRequest(String),

    /// The model backend could not be reached
    #[error("LLM backend unreachable: {0}")]
    ProviderUnavailable(String),

    #[error("{operation} exceeded {seconds}s deadline")]
    Timeout { operation: String, seconds: u64 },

    #[error("Unknown tool '{0}'")]
    ToolNotFound(String),

    #[error("Tool '{0}' is registered twice")]
    DuplicateTool(String),

    /// Action input rejected before execution
    #[error("Invalid tool input: {0}")]
    ToolValidation(String),

    #[error("Tool failed: {0}")]
    ToolExecution(String),

    /// Reply followed neither the action nor the final-answer format
    #[error("Unparseable model output: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Rate limit hit: {0}")]
    RateLimited(String),

    #[error("Credentials rejected: {0}")]
    Auth(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Transient failures; the loop records them and spends another iteration
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Provider(_)
                | Self::ProviderUnavailable(_)
                | Self::Timeout { .. }
                | Self::RateLimited(_)
                | Self::Io(_)
        )
    }

    /// Text safe to show the person asking about invoices
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider(detail) => format!("the language model returned an error ({detail})"),
            Self::ProviderUnavailable(_) => "the language model is not reachable right now".into(),
            Self::Timeout { operation, seconds } => {
                format!("{operation} did not finish within {seconds} seconds")
            }
            Self::InvalidRequest(detail) => {
                format!("the language model rejected the request ({detail})")
            }
            Self::RateLimited(_) => "too many requests to the language model, retry shortly".into(),
            Self::Auth(_) => "the language model rejected the configured credentials".into(),
            Self::ToolNotFound(name) => format!("no tool named '{name}' is available"),
            Self::ToolValidation(detail) | Self::ToolExecution(detail) => {
                format!("an invoice tool failed ({detail})")
            }
            Self::Config(detail) => format!("the agent is misconfigured ({detail})"),
            Self::Parse(_) => "the model reply could not be understood".into(),
            Self::DuplicateTool(_) | Self::Io(_) | Self::Json(_) | Self::Other(_) => {
                "something went wrong while answering".into()
            }
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(format!("{err:#}"))
    }
}
