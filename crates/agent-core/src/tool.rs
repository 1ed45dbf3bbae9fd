//! Agent tools and the registry the reasoning loop dispatches through.
//!
//! A tool receives the raw `Action Input` text and answers with a text
//! observation. Tools are listed in the prompt in registration order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{AgentError, Result};

/// An `Action` / `Action Input` pair chosen by the model
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub input: String,

    /// Correlates tool_start and tool_end events
    #[serde(default)]
    pub id: Option<String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input: input.into(),
            id: None,
        }
    }
}

/// What a tool hands back to the loop.
///
/// `success == false` is a soft failure: the text still becomes the
/// observation, prefixed as a tool error.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool: String,
    pub success: bool,
    pub output: String,

    /// Machine-readable extras, never shown to the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolResult {
    pub fn success(tool: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            success: true,
            output: output.into(),
            data: None,
        }
    }

    pub fn failure(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::success(tool, reason)
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// How a tool is presented to the model and to API clients
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,

    /// Shown to the model verbatim
    pub description: String,

    pub input_description: String,

    /// Blank input is rejected before `execute` runs
    pub input_required: bool,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_description: "free text".into(),
            input_required: true,
        }
    }

    pub fn input(mut self, description: impl Into<String>) -> Self {
        self.input_description = description.into();
        self
    }

    pub fn optional_input(mut self) -> Self {
        self.input_required = false;
        self
    }

    /// One line of the tool listing in the agent prompt
    pub fn prompt_line(&self) -> String {
        format!(
            "{name}: {description} Input: {input}",
            name = self.name,
            description = self.description,
            input = self.input_description
        )
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn schema(&self) -> ToolSchema;

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult>;

    fn validate(&self, call: &ToolCall) -> Result<()> {
        if self.schema().input_required && call.input.trim().is_empty() {
            return Err(AgentError::ToolValidation(format!(
                "'{name}' needs an Action Input",
                name = call.name
            )));
        }
        Ok(())
    }
}

#[derive(Default)]
struct Entries {
    ordered: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, usize>,
}

/// Name-indexed tool set.
///
/// Registration order is listing order. Reads and registrations may run
/// concurrently; a registration becomes visible all at once.
#[derive(Default)]
pub struct ToolRegistry {
    entries: RwLock<Entries>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Tool + 'static>(&self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    /// Fails with `DuplicateTool` and keeps the first registration
    pub fn register_arc(&self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.schema().name;
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if entries.by_name.contains_key(&name) {
            return Err(AgentError::DuplicateTool(name));
        }

        let slot = entries.ordered.len();
        entries.ordered.push(tool);
        entries.by_name.insert(name, slot);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.by_name.get(name).map(|&slot| Arc::clone(&entries.ordered[slot]))
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))
    }

    /// All tools in registration order
    pub fn list_all(&self) -> Vec<Arc<dyn Tool>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ordered
            .clone()
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.list_all().iter().map(|t| t.schema()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.schemas().into_iter().map(|s| s.name).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tool listing for the agent prompt, one tool per line
    pub fn generate_prompt_section(&self) -> String {
        self.schemas()
            .iter()
            .map(ToolSchema::prompt_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
