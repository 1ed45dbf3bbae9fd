//! Error Types for Invoice Retrieval

use agent_core::AgentError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RetrievalError>;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Search service error: {0}")]
    Backend(String),

    #[error("Search service unavailable: {0}")]
    Unavailable(String),

    #[error("Search service rejected credentials: {0}")]
    Auth(String),

    #[error("Unexpected search response: {0}")]
    InvalidResponse(String),

    #[error("Answer synthesis failed: {0}")]
    Synthesis(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RetrievalError {
    /// Whether the failure is on the search side rather than the model side
    pub fn is_backend(&self) -> bool {
        !matches!(self, Self::Synthesis(_) | Self::Config(_))
    }
}

/// Retrieval failures reach the reasoning loop as tool errors
impl From<RetrievalError> for AgentError {
    fn from(err: RetrievalError) -> Self {
        AgentError::ToolExecution(err.to_string())
    }
}
