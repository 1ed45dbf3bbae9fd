//! # agent-core
//!
//! Core agent logic: a bounded ReAct reasoning loop over a provider-agnostic
//! LLM abstraction and an extensible tool registry.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         ChatSession                          │
//! │  ┌──────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │ Conversation │  │  Reasoning  │  │     LlmProvider     │  │
//! │  │    Memory    │──│    Loop     │──│     (Strategy)      │  │
//! │  └──────────────┘  └──────┬──────┘  └─────────────────────┘  │
//! │                    ┌──────┴──────┐  ┌─────────────────────┐  │
//! │                    │    Tool     │  │   Observability     │  │
//! │                    │  Registry   │  │   Hooks / Sinks     │  │
//! │                    └─────────────┘  └─────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait enables swapping between Ollama, Azure OpenAI,
//! or any other provider without changing agent logic.

pub mod decision;
pub mod error;
pub mod memory;
pub mod message;
pub mod observability;
pub mod provider;
pub mod reasoning;
pub mod scratchpad;
pub mod session;
pub mod tool;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use decision::AgentDecision;
pub use error::{AgentError, Result};
pub use memory::{ConversationMemory, Turn, TurnRole};
pub use message::{Message, Role};
pub use observability::{
    EventKind, EventSink, ExecutionEvent, ExecutionLog, JsonLinesSink, ObservabilityHooks, TracingSink,
};
pub use provider::LlmProvider;
pub use reasoning::{Agent, AgentBuilder, AgentConfig, TurnReport, TurnStatus};
pub use scratchpad::{ScratchpadEntry, StepOutcome};
pub use session::{ChatSession, SessionId, SessionStore, DEFAULT_MAX_SESSIONS};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
