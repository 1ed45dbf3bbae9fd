//! Application State

use std::sync::Arc;

use agent_core::{
    AgentBuilder, AgentConfig, ChatSession, ConversationMemory, EventSink, LlmProvider,
    Result as CoreResult, SessionId, SessionStore, ToolRegistry, TracingSink,
};
use invoice_retrieval::SearchBackend;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// LLM provider (Ollama or Azure OpenAI)
    pub provider: Arc<dyn LlmProvider>,

    /// Search service behind the invoice tools
    pub search: Arc<dyn SearchBackend>,

    /// Tool registry shared by every conversation
    pub tools: Arc<ToolRegistry>,

    /// Live conversations
    pub sessions: Arc<SessionStore>,

    /// Agent settings applied to new conversations
    pub agent_config: AgentConfig,

    /// Sinks attached to every conversation (tracing, JSON-lines file)
    pub sinks: Vec<Arc<dyn EventSink>>,

    /// Per-conversation memory cap
    pub memory_max_turns: Option<usize>,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        search: Arc<dyn SearchBackend>,
        tools: Arc<ToolRegistry>,
        agent_config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            search,
            tools,
            sessions: Arc::new(SessionStore::new()),
            agent_config,
            sinks: vec![Arc::new(TracingSink)],
            memory_max_turns: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Replace the session store with one bounded to `max_conversations`
    pub fn with_conversation_limit(mut self, max_conversations: usize) -> Self {
        self.sessions = Arc::new(SessionStore::with_capacity(max_conversations));
        self
    }

    pub fn with_memory_cap(mut self, max_turns: Option<usize>) -> Self {
        self.memory_max_turns = max_turns;
        self
    }

    /// Start a fresh conversation with the shared provider, tools and sinks
    pub fn new_session(&self, id: SessionId) -> CoreResult<ChatSession> {
        let builder = self.sinks.iter().cloned().fold(
            AgentBuilder::new()
                .provider(self.provider.clone())
                .tools(self.tools.clone())
                .config(self.agent_config.clone()),
            AgentBuilder::sink,
        );

        let memory = match self.memory_max_turns {
            Some(max) => ConversationMemory::with_max_turns(max),
            None => ConversationMemory::new(),
        };

        tracing::info!(conversation = %id, "Starting conversation");
        ChatSession::with_parts(id, builder, memory)
    }
}
