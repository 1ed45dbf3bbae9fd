//! Per-turn working memory of action/observation pairs.

use serde::{Deserialize, Serialize};

/// How a step ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Success,
    ToolError,
    ToolNotFound,
    InvalidFormat,
    ModelError,
}

/// One completed reasoning step
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScratchpadEntry {
    pub sequence_index: usize,
    pub thought: String,
    pub action: String,
    pub action_input: String,
    pub observation: String,
    pub outcome: StepOutcome,
}

impl ScratchpadEntry {
    /// Whether the step named a tool (found or not)
    pub fn is_tool_step(&self) -> bool {
        matches!(
            self.outcome,
            StepOutcome::Success | StepOutcome::ToolError | StepOutcome::ToolNotFound
        )
    }
}

/// Append-only list of steps for the current turn
#[derive(Clone, Debug, Default)]
pub struct Scratchpad {
    entries: Vec<ScratchpadEntry>,
}

impl Scratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ScratchpadEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ScratchpadEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent observation from a tool that succeeded
    pub fn last_success(&self) -> Option<&ScratchpadEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.outcome == StepOutcome::Success)
    }

    /// Render as the ReAct continuation that follows the question
    pub fn render(&self) -> String {
        let mut out = String::new();

        for entry in &self.entries {
            if !entry.thought.is_empty() {
                out.push_str(&entry.thought);
                out.push('\n');
            }
            // Steps that never reached a tool only carry the raw output.
            if entry.is_tool_step() {
                out.push_str(&format!("Action: {action}\n", action = entry.action));
                out.push_str(&format!("Action Input: {input}\n", input = entry.action_input));
            }
            out.push_str(&format!("Observation: {obs}\n", obs = entry.observation));
            out.push_str("Thought:");
        }

        out
    }
}
