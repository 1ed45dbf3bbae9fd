//! Conversation Memory
//!
//! Ordered transcript of completed turns. The reasoning loop reads it as
//! context and appends to it once per finished turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a turn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Agent,
}

impl TurnRole {
    /// Label used when the transcript is rendered into a prompt
    pub fn label(&self) -> &'static str {
        match self {
            TurnRole::User => "Human",
            TurnRole::Agent => "AI",
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Agent => write!(f, "agent"),
        }
    }
}

/// One side of a completed exchange
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Agent, content)
    }
}

/// Insertion-ordered transcript of turns.
///
/// Unbounded unless a cap is set with [`ConversationMemory::with_max_turns`].
/// With a cap, the oldest exchange (a user turn and the agent reply to it) is
/// evicted as a unit, so the window always starts on a user turn.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConversationMemory {
    turns: Vec<Turn>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_turns: Option<usize>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Smallest cap that still holds one full exchange
    pub const MIN_TURNS: usize = 2;

    /// Keep at most `max_turns` turns; caps below [`Self::MIN_TURNS`] are raised to it
    pub fn with_max_turns(max_turns: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_turns: Some(max_turns.max(Self::MIN_TURNS)),
        }
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);

        let Some(max) = self.max_turns else {
            return;
        };
        while self.turns.len() > max {
            let paired = self.turns.len() > 1
                && self.turns[0].role == TurnRole::User
                && self.turns[1].role == TurnRole::Agent;
            let evicted = if paired { 2 } else { 1 };
            self.turns.drain(..evicted);
        }
    }

    /// Read-only view in insertion order
    pub fn snapshot(&self) -> &[Turn] {
        &self.turns
    }

    /// Remove every turn
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Render as `Human: ... / AI: ...` lines for the prompt
    pub fn render_transcript(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("{role}: {content}", role = t.role.label(), content = t.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut memory = ConversationMemory::new();
        memory.append(Turn::user("Find invoices for Alice Johnson"));
        memory.append(Turn::agent("Alice has one invoice."));
        memory.append(Turn::user("What was the total?"));

        let roles: Vec<_> = memory.snapshot().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![TurnRole::User, TurnRole::Agent, TurnRole::User]);
        assert_eq!(memory.snapshot()[2].content, "What was the total?");
    }

    #[test]
    fn test_clear_resets() {
        let mut memory = ConversationMemory::new();
        memory.append(Turn::user("hi"));
        memory.append(Turn::agent("hello"));
        memory.clear();

        assert!(memory.is_empty());
        assert_eq!(memory.render_transcript(), "");
    }

    #[test]
    fn test_render_transcript() {
        let mut memory = ConversationMemory::new();
        memory.append(Turn::user("hi"));
        memory.append(Turn::agent("hello"));

        assert_eq!(memory.render_transcript(), "Human: hi\nAI: hello");
    }

    fn exchange(memory: &mut ConversationMemory, question: &str, answer: &str) {
        memory.append(Turn::user(question));
        memory.append(Turn::agent(answer));
    }

    #[test]
    fn test_cap_evicts_whole_exchanges() {
        let mut memory = ConversationMemory::with_max_turns(2);
        exchange(&mut memory, "one?", "one.");
        exchange(&mut memory, "two?", "two.");

        assert_eq!(memory.render_transcript(), "Human: two?\nAI: two.");
    }

    #[test]
    fn test_odd_cap_never_starts_on_agent_turn() {
        let mut memory = ConversationMemory::with_max_turns(3);
        exchange(&mut memory, "Find invoices for Alice Johnson", "INV-1001 and INV-1003.");
        exchange(&mut memory, "What was the total?", "$1,200.");

        assert_eq!(memory.len(), 2);
        assert_eq!(memory.snapshot()[0].role, TurnRole::User);
        assert_eq!(memory.snapshot()[0].content, "What was the total?");
    }

    #[test]
    fn test_zero_cap_still_keeps_last_exchange() {
        let mut memory = ConversationMemory::with_max_turns(0);
        exchange(&mut memory, "hi", "hello");

        assert_eq!(memory.len(), ConversationMemory::MIN_TURNS);
        assert_eq!(memory.render_transcript(), "Human: hi\nAI: hello");
    }
}
