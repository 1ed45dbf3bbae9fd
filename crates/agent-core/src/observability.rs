//! Observability Hooks
//!
//! Lifecycle events of the reasoning loop are pushed to any number of
//! [`EventSink`]s. Emitting never fails from the caller's point of view:
//! sink faults are reported through `tracing` and dropped.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum characters of tool output carried in a `tool_end` event
pub const DISPLAY_TRUNCATE_CHARS: usize = 200;

/// Kind of lifecycle event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Action,
    ToolStart,
    ToolEnd,
    ToolError,
    Finish,
    LlmStart,
    LlmEnd,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Action => "action",
            EventKind::ToolStart => "tool_start",
            EventKind::ToolEnd => "tool_end",
            EventKind::ToolError => "tool_error",
            EventKind::Finish => "finish",
            EventKind::LlmStart => "llm_start",
            EventKind::LlmEnd => "llm_end",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single write-once log entry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub kind: EventKind,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionEvent {
    pub fn new(kind: EventKind, payload: serde_json::Value) -> Self {
        Self {
            kind,
            payload,
            timestamp: Utc::now(),
        }
    }
}

/// Receiver of execution events.
///
/// Implementations must not panic and have no way to report failure to the
/// caller; anything that goes wrong stays inside the sink.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &ExecutionEvent);
}

/// Fan-out to every attached sink
#[derive(Clone, Default)]
pub struct ObservabilityHooks {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl ObservabilityHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn add_sink(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Stamp and deliver an event to all sinks
    pub fn emit(&self, kind: EventKind, payload: serde_json::Value) {
        let event = ExecutionEvent::new(kind, payload);
        for sink in &self.sinks {
            sink.emit(&event);
        }
    }
}

/// Cut text to `max` characters, marking the cut with `...`
pub fn truncate_for_display(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{head}...", head = &text[..idx]),
        None => text.to_string(),
    }
}

/// Appends each event as one JSON line to a file
#[derive(Clone, Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_line(&self, event: &ExecutionEvent) -> std::io::Result<()> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');
        // One write per event keeps concurrent appenders from interleaving.
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}

impl EventSink for JsonLinesSink {
    fn emit(&self, event: &ExecutionEvent) {
        if let Err(e) = self.append_line(event) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to write execution log entry");
        }
    }
}

/// In-memory event log with an optional JSON-lines file
pub struct ExecutionLog {
    events: Mutex<Vec<ExecutionEvent>>,
    file: Option<JsonLinesSink>,
}

impl Default for ExecutionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionLog {
    /// Memory-only log
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            file: None,
        }
    }

    /// Also append each event as one JSON line to `path`
    pub fn with_file(path: impl AsRef<Path>) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            file: Some(JsonLinesSink::new(path)),
        }
    }

    /// Copy of every recorded event in order
    pub fn events(&self) -> Vec<ExecutionEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for ExecutionLog {
    fn emit(&self, event: &ExecutionEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());

        if let Some(file) = &self.file {
            file.emit(event);
        }
    }
}

fn payload_str<'a>(payload: &'a serde_json::Value, key: &str) -> &'a str {
    payload.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

/// Mirrors events into `tracing`
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &ExecutionEvent) {
        let field = |key: &str| payload_str(&event.payload, key);

        match event.kind {
            EventKind::Action => {
                tracing::info!(tool = field("tool"), input = field("tool_input"), "Agent action")
            }
            EventKind::ToolStart => tracing::debug!(tool = field("tool"), "Tool starting"),
            EventKind::ToolEnd => {
                tracing::debug!(tool = field("tool"), output = field("output"), "Tool output")
            }
            EventKind::ToolError => {
                tracing::warn!(tool = field("tool"), error = field("error"), "Tool error")
            }
            EventKind::Finish => tracing::info!(output = field("output"), "Agent finished"),
            EventKind::LlmStart => tracing::debug!("LLM processing"),
            EventKind::LlmEnd => tracing::debug!("LLM response received"),
        }
    }
}
