//! Concrete [`LlmProvider`] backends for the invoice agent.
//!
//! | feature  | provider               | transport          |
//! |----------|------------------------|--------------------|
//! | `ollama` | [`OllamaProvider`]     | `ollama-rs` client |
//! | `azure`  | [`AzureOpenAiProvider`]| REST via `reqwest` |
//!
//! Both are enabled by default; the server picks one from `LLM_PROVIDER`.
//!
//! ```rust,ignore
//! let provider = AzureOpenAiProvider::new(AzureOpenAiConfig::new(endpoint, key, "gpt-4o"))?;
//! let agent = AgentBuilder::new().provider(Arc::new(provider)).build()?;
//! ```

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "azure")]
pub mod azure_openai;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};

#[cfg(feature = "azure")]
pub use azure_openai::{AzureOpenAiConfig, AzureOpenAiProvider};

pub use agent_core::{AgentError, LlmProvider, Result};
