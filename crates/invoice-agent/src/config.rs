//! Application Configuration
//!
//! Everything is read from the environment once at startup (after `.env` is
//! loaded) and handed to the library crates as plain structs.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};

use agent_core::{AgentConfig, ConversationMemory, DEFAULT_MAX_SESSIONS};
use agent_runtime::azure_openai::AzureOpenAiConfig;
use agent_runtime::ollama::OllamaConfig;
use invoice_retrieval::{AzureSearchConfig, DEFAULT_TOP_K};

/// Which language model backs the agent
#[derive(Clone, Debug)]
pub enum LlmBackend {
    Ollama(OllamaConfig),
    Azure(AzureOpenAiConfig),
}

#[derive(Clone, Debug)]
pub struct LlmSettings {
    pub backend: LlmBackend,
    pub temperature: f32,
}

impl LlmSettings {
    /// Model name passed in generation options
    pub fn model(&self) -> &str {
        match &self.backend {
            LlmBackend::Ollama(config) => &config.default_model,
            LlmBackend::Azure(config) => &config.deployment,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SearchSettings {
    /// `None` selects the in-memory sample index
    pub azure: Option<AzureSearchConfig>,
    pub top_k: usize,
}

#[derive(Clone, Debug)]
pub struct AgentSettings {
    pub max_iterations: usize,
    pub llm_timeout: Duration,
    pub tool_timeout: Duration,
    /// JSON-lines execution log; `None` disables it
    pub execution_log: Option<PathBuf>,
    /// Sliding window over remembered turns; `None` keeps everything
    pub memory_max_turns: Option<usize>,
    /// Live conversations kept before the least recently used is dropped
    pub max_conversations: usize,
}

/// Complete server configuration
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmSettings,
    pub search: SearchSettings,
    pub agent: AgentSettings,
    pub bind_addr: String,
}

impl AppConfig {
    /// Read configuration from process environment
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let llm = LlmSettings {
            backend: match get("LLM_PROVIDER").as_deref().unwrap_or("ollama") {
                "ollama" => {
                    let defaults = OllamaConfig::default();
                    LlmBackend::Ollama(OllamaConfig {
                        host: get("OLLAMA_HOST").unwrap_or(defaults.host),
                        port: parse_or(&get, "OLLAMA_PORT", defaults.port)?,
                        default_model: get("OLLAMA_MODEL").unwrap_or(defaults.default_model),
                    })
                }
                "azure" => {
                    let endpoint = require(&get, "AZURE_OPENAI_ENDPOINT")?;
                    let api_key = require(&get, "AZURE_OPENAI_API_KEY")?;
                    let deployment = require(&get, "AZURE_OPENAI_DEPLOYMENT_NAME")?;
                    let mut config = AzureOpenAiConfig::new(endpoint, api_key, deployment);
                    if let Some(version) = get("AZURE_OPENAI_API_VERSION") {
                        config = config.with_api_version(version);
                    }
                    LlmBackend::Azure(config)
                }
                other => bail!("LLM_PROVIDER must be 'ollama' or 'azure', got '{other}'"),
            },
            temperature: parse_or(&get, "LLM_TEMPERATURE", 0.0)?,
        };

        let search = SearchSettings {
            azure: match get("AZURE_SEARCH_ENDPOINT") {
                Some(endpoint) => Some(AzureSearchConfig::new(
                    endpoint,
                    require(&get, "AZURE_SEARCH_KEY")?,
                    require(&get, "AZURE_SEARCH_INDEX_NAME")?,
                )),
                None => None,
            },
            top_k: parse_or(&get, "SEARCH_TOP_K", DEFAULT_TOP_K)?,
        };

        let defaults = AgentConfig::default();
        let agent = AgentSettings {
            max_iterations: parse_or(&get, "AGENT_MAX_ITERATIONS", defaults.max_iterations)?,
            llm_timeout: Duration::from_secs(parse_or(
                &get,
                "AGENT_LLM_TIMEOUT_SECS",
                defaults.llm_timeout.as_secs(),
            )?),
            tool_timeout: Duration::from_secs(parse_or(
                &get,
                "AGENT_TOOL_TIMEOUT_SECS",
                defaults.tool_timeout.as_secs(),
            )?),
            // Present but blank disables the file.
            execution_log: match lookup("AGENT_EXECUTION_LOG") {
                None => Some(PathBuf::from("agent_execution.log")),
                Some(v) if v.trim().is_empty() => None,
                Some(v) => Some(PathBuf::from(v.trim())),
            },
            memory_max_turns: get("AGENT_MEMORY_MAX_TURNS")
                .map(|v| parse_value::<usize>("AGENT_MEMORY_MAX_TURNS", &v))
                .transpose()?,
            max_conversations: parse_or(&get, "AGENT_MAX_CONVERSATIONS", DEFAULT_MAX_SESSIONS)?,
        };

        if agent.max_iterations == 0 {
            bail!("AGENT_MAX_ITERATIONS must be at least 1");
        }
        if agent.max_conversations == 0 {
            bail!("AGENT_MAX_CONVERSATIONS must be at least 1");
        }
        if search.top_k == 0 {
            bail!("SEARCH_TOP_K must be at least 1");
        }
        if let Some(cap) = agent.memory_max_turns {
            // The window holds whole exchanges of one user and one agent turn.
            if cap < ConversationMemory::MIN_TURNS || cap % 2 != 0 {
                bail!("AGENT_MEMORY_MAX_TURNS must be an even number of at least 2, got {cap}");
            }
        }

        Ok(Self {
            llm,
            search,
            agent,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
        })
    }

    /// Agent configuration derived from these settings
    pub fn agent_config(&self, system_prompt: &str) -> AgentConfig {
        let mut config = AgentConfig {
            system_prompt: system_prompt.into(),
            max_iterations: self.agent.max_iterations,
            llm_timeout: self.agent.llm_timeout,
            tool_timeout: self.agent.tool_timeout,
            ..Default::default()
        };
        config.generation.model = self.llm.model().to_string();
        config.generation.temperature = self.llm.temperature;
        config
    }
}

fn require<G>(get: &G, key: &str) -> anyhow::Result<String>
where
    G: Fn(&str) -> Option<String>,
{
    get(key).with_context(|| format!("{key} must be set"))
}

fn parse_or<G, T>(get: &G, key: &str, default: T) -> anyhow::Result<T>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse()
        .with_context(|| format!("{key} has invalid value '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();

        assert!(matches!(config.llm.backend, LlmBackend::Ollama(_)));
        assert_eq!(config.llm.model(), "llama3.2");
        assert_eq!(config.llm.temperature, 0.0);
        assert!(config.search.azure.is_none());
        assert_eq!(config.search.top_k, 5);
        assert_eq!(config.agent.max_iterations, 10);
        assert_eq!(config.agent.llm_timeout, Duration::from_secs(120));
        assert_eq!(config.agent.tool_timeout, Duration::from_secs(60));
        assert_eq!(config.agent.execution_log, Some(PathBuf::from("agent_execution.log")));
        assert_eq!(config.agent.memory_max_turns, None);
        assert_eq!(config.agent.max_conversations, 1000);
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
    }

    #[test]
    fn test_azure_settings() {
        let config = config(&[
            ("LLM_PROVIDER", "azure"),
            ("AZURE_OPENAI_ENDPOINT", "https://invoices.openai.azure.com"),
            ("AZURE_OPENAI_API_KEY", "secret"),
            ("AZURE_OPENAI_DEPLOYMENT_NAME", "gpt-4o"),
            ("AZURE_OPENAI_API_VERSION", "2024-06-01"),
            ("AZURE_SEARCH_ENDPOINT", "https://invoices.search.windows.net"),
            ("AZURE_SEARCH_KEY", "search-secret"),
            ("AZURE_SEARCH_INDEX_NAME", "invoices"),
        ])
        .unwrap();

        match &config.llm.backend {
            LlmBackend::Azure(azure) => assert_eq!(azure.api_version, "2024-06-01"),
            other => panic!("unexpected backend: {other:?}"),
        }
        assert_eq!(config.llm.model(), "gpt-4o");
        assert_eq!(config.search.azure.unwrap().index_name, "invoices");
    }

    #[test]
    fn test_partial_search_settings_rejected() {
        let err = config(&[("AZURE_SEARCH_ENDPOINT", "https://invoices.search.windows.net")])
            .unwrap_err();
        assert!(err.to_string().contains("AZURE_SEARCH_KEY"));
    }

    #[test]
    fn test_azure_llm_requires_credentials() {
        assert!(config(&[("LLM_PROVIDER", "azure")]).is_err());
        assert!(config(&[("LLM_PROVIDER", "openai")]).is_err());
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        assert!(config(&[("AGENT_MAX_ITERATIONS", "ten")]).is_err());
        assert!(config(&[("AGENT_MAX_ITERATIONS", "0")]).is_err());
        assert!(config(&[("SEARCH_TOP_K", "0")]).is_err());
        assert!(config(&[("AGENT_MAX_CONVERSATIONS", "0")]).is_err());
    }

    #[test]
    fn test_blank_execution_log_disables_file() {
        let config = config(&[("AGENT_EXECUTION_LOG", ""), ("AGENT_MEMORY_MAX_TURNS", "20")]).unwrap();
        assert_eq!(config.agent.execution_log, None);
        assert_eq!(config.agent.memory_max_turns, Some(20));
    }

    #[test]
    fn test_memory_cap_must_hold_whole_exchanges() {
        for bad in ["0", "1", "3", "21"] {
            let err = config(&[("AGENT_MEMORY_MAX_TURNS", bad)]).unwrap_err();
            assert!(err.to_string().contains("AGENT_MEMORY_MAX_TURNS"), "{bad}");
        }
        let config = config(&[("AGENT_MEMORY_MAX_TURNS", "2")]).unwrap();
        assert_eq!(config.agent.memory_max_turns, Some(2));
    }

    #[test]
    fn test_agent_config() {
        let config = config(&[("OLLAMA_MODEL", "qwen2.5"), ("LLM_TEMPERATURE", "0.2")]).unwrap();
        let agent = config.agent_config("prompt");

        assert_eq!(agent.system_prompt, "prompt");
        assert_eq!(agent.generation.model, "qwen2.5");
        assert_eq!(agent.generation.temperature, 0.2);
        assert_eq!(agent.generation.stop_sequences, vec!["\nObservation:".to_string()]);
    }
}
