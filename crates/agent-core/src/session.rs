//! Session Management
//!
//! A [`ChatSession`] is one conversation: its own memory and execution log
//! in front of a shared agent configuration. Sessions are isolated from
//! each other and can run turns in parallel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::Result;
use crate::memory::{ConversationMemory, Turn};
use crate::observability::{ExecutionEvent, ExecutionLog};
use crate::reasoning::{AgentBuilder, Agent};

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single conversation with the agent
pub struct ChatSession {
    id: SessionId,
    agent: Agent,
    memory: ConversationMemory,
    log: Arc<ExecutionLog>,
}

impl ChatSession {
    /// Build a session; its execution log is attached as an extra sink
    pub fn new(builder: AgentBuilder) -> Result<Self> {
        Self::with_parts(SessionId::new(), builder, ConversationMemory::new())
    }

    /// Build a session with a given id and memory (e.g. a capped one)
    pub fn with_parts(
        id: SessionId,
        builder: AgentBuilder,
        memory: ConversationMemory,
    ) -> Result<Self> {
        let log = Arc::new(ExecutionLog::new());
        let agent = builder.sink(log.clone()).build()?;

        Ok(Self {
            id,
            agent,
            memory,
            log,
        })
    }

    /// Send a message and get the agent's reply
    pub async fn chat(&mut self, message: &str) -> String {
        self.agent.run_turn(&mut self.memory, message).await
    }

    /// Every remembered turn, oldest first
    pub fn memory_summary(&self) -> &[Turn] {
        self.memory.snapshot()
    }

    /// Forget the conversation so far
    pub fn clear_memory(&mut self) {
        self.memory.clear();
        tracing::info!(session = %self.id, "Memory cleared");
    }

    /// Every event recorded for this session
    pub fn execution_log(&self) -> Vec<ExecutionEvent> {
        self.log.events()
    }
}

/// Shared handle to a session
pub type SharedSession = Arc<Mutex<ChatSession>>;

/// Default bound on live sessions held by a [`SessionStore`]
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

struct StoredSession {
    session: SharedSession,
    /// Store clock value at last access
    touched: AtomicU64,
}

/// In-memory registry of live sessions.
///
/// Holds at most `max_sessions`; creating one more evicts the session that
/// was accessed least recently.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, StoredSession>>,
    clock: AtomicU64,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store bounded to `max_sessions` (at least one)
    pub fn with_capacity(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            clock: AtomicU64::new(0),
            max_sessions: max_sessions.max(1),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Look up a session and mark it as recently used
    pub fn get(&self, id: &SessionId) -> Option<SharedSession> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        let stored = sessions.get(id)?;
        stored.touched.store(self.tick(), Ordering::Relaxed);
        Some(Arc::clone(&stored.session))
    }

    /// Look up a session, creating it with `create` if absent
    pub fn get_or_create<F>(&self, id: &SessionId, create: F) -> Result<SharedSession>
    where
        F: FnOnce(SessionId) -> Result<ChatSession>,
    {
        if let Some(existing) = self.get(id) {
            return Ok(existing);
        }

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have created it between the two locks.
        if let Some(existing) = sessions.get(id) {
            return Ok(Arc::clone(&existing.session));
        }

        let session = Arc::new(Mutex::new(create(id.clone())?));

        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, stored)| stored.touched.load(Ordering::Relaxed))
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            sessions.remove(&oldest);
            tracing::info!(session = %oldest, "Evicted least recently used session");
        }

        sessions.insert(
            id.clone(),
            StoredSession {
                session: Arc::clone(&session),
                touched: AtomicU64::new(self.tick()),
            },
        );
        Ok(session)
    }

    /// Drop a session; returns whether it existed
    pub fn remove(&self, id: &SessionId) -> bool {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
