//! Reasoning Loop
//!
//! Implements the ReAct (Reason + Act) pattern for agent behavior.
//! Each turn the agent thinks, acts (via tools) and observes, until it
//! produces a final answer or runs out of iterations.
//!
//! Every failure inside a turn (malformed output, unknown tool, tool error,
//! model timeout) becomes an observation the model sees on the next step.
//! `run_turn` always returns text.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::timeout;

use crate::decision::{parse_decision, AgentDecision};
use crate::error::{AgentError, Result};
use crate::memory::{ConversationMemory, Turn};
use crate::message::Message;
use crate::observability::{
    truncate_for_display, EventKind, EventSink, ObservabilityHooks, DISPLAY_TRUNCATE_CHARS,
};
use crate::provider::{GenerationOptions, LlmProvider};
use crate::scratchpad::{Scratchpad, ScratchpadEntry, StepOutcome};
use crate::tool::{Tool, ToolCall, ToolRegistry};

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Instructions placed before the tool listing
    pub system_prompt: String,

    /// Maximum model calls per turn
    pub max_iterations: usize,

    /// Generation options
    pub generation: GenerationOptions,

    /// Deadline for a single model call
    pub llm_timeout: Duration,

    /// Deadline for a single tool call
    pub tool_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_iterations: 10,
            generation: GenerationOptions::default()
                .with_temperature(0.0)
                .with_stop(OBSERVATION_STOP),
            llm_timeout: Duration::from_secs(120),
            tool_timeout: Duration::from_secs(60),
        }
    }
}

const OBSERVATION_STOP: &str = "\nObservation:";

const DEFAULT_SYSTEM_PROMPT: &str =
    "Answer the following questions as best you can. You have access to the following tools:";

const FORMAT_INSTRUCTIONS: &str = r#"Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question"#;

const RETRY_HINT: &str = "Could not parse a valid action; retry with correct formatting.";

/// How a turn ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// The model produced a final answer
    Finished,
    /// The iteration budget ran out
    BudgetExhausted,
    /// A non-recoverable provider fault ended the turn
    Failed,
}

/// Everything that happened during one turn
#[derive(Clone, Debug)]
pub struct TurnReport {
    pub answer: String,
    pub status: TurnStatus,
    pub model_calls: usize,
    pub steps: Vec<ScratchpadEntry>,
}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
    hooks: ObservabilityHooks,
}

impl Agent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
        hooks: ObservabilityHooks,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
            hooks,
        }
    }

    /// Create with default configuration and no hooks
    pub fn with_defaults(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self::new(provider, tools, AgentConfig::default(), ObservabilityHooks::new())
    }

    /// Run one user turn and return the answer.
    ///
    /// `memory` is read as context and, when the turn completes (final answer
    /// or exhausted budget), receives the user message and the answer.
    pub async fn run_turn(&self, memory: &mut ConversationMemory, user_message: &str) -> String {
        self.run_turn_with_report(memory, user_message).await.answer
    }

    /// Like [`Agent::run_turn`] but also returns the step trace
    pub async fn run_turn_with_report(
        &self,
        memory: &mut ConversationMemory,
        user_message: &str,
    ) -> TurnReport {
        let report = self.reason(memory, user_message).await;

        match report.status {
            TurnStatus::Finished | TurnStatus::BudgetExhausted => {
                memory.append(Turn::user(user_message));
                memory.append(Turn::agent(&report.answer));
            }
            TurnStatus::Failed => {}
        }

        tracing::info!(
            status = ?report.status,
            model_calls = report.model_calls,
            steps = report.steps.len(),
            "Turn complete"
        );

        report
    }

    /// Answer a single question with no prior history
    pub async fn ask(&self, question: &str) -> String {
        let mut memory = ConversationMemory::new();
        self.run_turn(&mut memory, question).await
    }

    async fn reason(&self, memory: &ConversationMemory, user_message: &str) -> TurnReport {
        let mut scratchpad = Scratchpad::new();
        let mut model_calls = 0;

        for sequence_index in 0..self.config.max_iterations {
            let prompt = self.render_prompt(memory, user_message, &scratchpad);

            model_calls += 1;
            let raw = match self.call_model(prompt).await {
                Ok(raw) => raw,
                Err(e) if e.is_retryable() => {
                    tracing::debug!(step = sequence_index, error = %e, "Model call failed, continuing");
                    scratchpad.push(ScratchpadEntry {
                        sequence_index,
                        thought: String::new(),
                        action: String::new(),
                        action_input: String::new(),
                        observation: format!("Model call failed: {e}"),
                        outcome: StepOutcome::ModelError,
                    });
                    continue;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Model call failed, ending turn");
                    return TurnReport {
                        answer: format!("Error: {message}", message = e.user_message()),
                        status: TurnStatus::Failed,
                        model_calls,
                        steps: scratchpad.entries().to_vec(),
                    };
                }
            };

            let decision = match parse_decision(&raw) {
                Ok(decision) => decision,
                Err(e) => {
                    let reason = match e {
                        AgentError::Parse(detail) => detail,
                        other => other.to_string(),
                    };
                    tracing::debug!(step = sequence_index, %reason, "Unparseable model output");
                    scratchpad.push(ScratchpadEntry {
                        sequence_index,
                        thought: raw.trim().to_string(),
                        action: String::new(),
                        action_input: String::new(),
                        observation: format!("Invalid Format: {reason}. {RETRY_HINT}"),
                        outcome: StepOutcome::InvalidFormat,
                    });
                    continue;
                }
            };

            match decision {
                AgentDecision::Finish { final_answer, rationale } => {
                    self.hooks.emit(
                        EventKind::Finish,
                        json!({ "output": final_answer, "log": rationale }),
                    );
                    return TurnReport {
                        answer: final_answer,
                        status: TurnStatus::Finished,
                        model_calls,
                        steps: scratchpad.entries().to_vec(),
                    };
                }
                AgentDecision::Invoke { tool_name, tool_input, rationale } => {
                    self.hooks.emit(
                        EventKind::Action,
                        json!({ "tool": tool_name, "tool_input": tool_input, "log": rationale }),
                    );
                    let entry = self
                        .invoke_tool(sequence_index, rationale, tool_name, tool_input)
                        .await;
                    scratchpad.push(entry);
                }
            }
        }

        let answer = self.budget_exhausted_answer(&scratchpad);
        self.hooks.emit(
            EventKind::Finish,
            json!({ "output": answer, "reason": "budget_exhausted" }),
        );

        TurnReport {
            answer,
            status: TurnStatus::BudgetExhausted,
            model_calls,
            steps: scratchpad.entries().to_vec(),
        }
    }

    async fn call_model(&self, prompt: String) -> Result<String> {
        let generation = &self.config.generation;
        self.hooks.emit(
            EventKind::LlmStart,
            json!({ "model": generation.model, "prompt_chars": prompt.len() }),
        );

        let messages = [Message::user(prompt)];
        let result = match timeout(
            self.config.llm_timeout,
            self.provider.complete(&messages, generation),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(AgentError::Timeout {
                operation: "model call".into(),
                seconds: self.config.llm_timeout.as_secs(),
            }),
        };

        match &result {
            Ok(completion) => {
                if completion.is_truncated() {
                    tracing::warn!(model = %completion.model, "Model output hit the token limit");
                }
                self.hooks.emit(
                    EventKind::LlmEnd,
                    json!({
                        "model": completion.model,
                        "output_chars": completion.content.len(),
                        "usage": completion.usage,
                    }),
                );
            }
            Err(e) => self.hooks.emit(EventKind::LlmEnd, json!({ "error": e.to_string() })),
        }

        result.map(|c| c.content)
    }

    async fn invoke_tool(
        &self,
        sequence_index: usize,
        thought: String,
        tool_name: String,
        tool_input: String,
    ) -> ScratchpadEntry {
        let mut entry = ScratchpadEntry {
            sequence_index,
            thought,
            action: tool_name,
            action_input: tool_input,
            observation: String::new(),
            outcome: StepOutcome::Success,
        };

        let tool = match self.tools.resolve(&entry.action) {
            Ok(tool) => tool,
            Err(_) => {
                entry.observation = format!(
                    "{action} is not a valid tool, try one of [{names}].",
                    action = entry.action,
                    names = self.tools.names().join(", ")
                );
                entry.outcome = StepOutcome::ToolNotFound;
                self.hooks.emit(
                    EventKind::ToolError,
                    json!({ "tool": entry.action, "error": entry.observation }),
                );
                return entry;
            }
        };

        let call = ToolCall {
            name: entry.action.clone(),
            input: entry.action_input.clone(),
            id: Some(uuid::Uuid::new_v4().to_string()),
        };

        self.hooks.emit(
            EventKind::ToolStart,
            json!({ "tool": call.name, "input": call.input, "call_id": call.id }),
        );
        tracing::debug!(step = sequence_index, tool = %call.name, "Executing tool");

        match self.execute_with_deadline(tool.as_ref(), &call).await {
            Ok(result) if result.success => {
                self.hooks.emit(
                    EventKind::ToolEnd,
                    json!({
                        "tool": call.name,
                        "output": truncate_for_display(&result.output, DISPLAY_TRUNCATE_CHARS),
                    }),
                );
                entry.observation = result.output;
            }
            Ok(result) => {
                self.hooks.emit(
                    EventKind::ToolError,
                    json!({ "tool": call.name, "error": result.output }),
                );
                entry.observation = format!("Tool error: {output}", output = result.output);
                entry.outcome = StepOutcome::ToolError;
            }
            Err(e) => {
                self.hooks.emit(
                    EventKind::ToolError,
                    json!({ "tool": call.name, "error": e.to_string() }),
                );
                entry.observation = format!("Tool error: {e}");
                entry.outcome = StepOutcome::ToolError;
            }
        }

        entry
    }

    async fn execute_with_deadline(
        &self,
        tool: &dyn Tool,
        call: &ToolCall,
    ) -> Result<crate::tool::ToolResult> {
        tool.validate(call)?;

        match timeout(self.config.tool_timeout, tool.execute(call)).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::Timeout {
                operation: format!("tool '{name}'", name = call.name),
                seconds: self.config.tool_timeout.as_secs(),
            }),
        }
    }

    fn budget_exhausted_answer(&self, scratchpad: &Scratchpad) -> String {
        let mut answer = format!(
            "Agent stopped: could not complete the request within the step budget of {max} iterations.",
            max = self.config.max_iterations
        );

        if let Some(last) = scratchpad.last_success() {
            answer.push_str(&format!(
                " Last result from {action}: {shown}",
                action = last.action,
                shown = truncate_for_display(&last.observation, 500)
            ));
        }

        answer
    }

    /// Build the full prompt for the next model call
    fn render_prompt(
        &self,
        memory: &ConversationMemory,
        user_message: &str,
        scratchpad: &Scratchpad,
    ) -> String {
        let tool_names = self.tools.names().join(", ");
        let mut prompt = self.config.system_prompt.clone();

        prompt.push_str("\n\n");
        prompt.push_str(&self.tools.generate_prompt_section());
        prompt.push_str("\n\n");
        prompt.push_str(&FORMAT_INSTRUCTIONS.replace("{tool_names}", &tool_names));
        prompt.push_str("\n\nBegin!\n\n");

        if !memory.is_empty() {
            prompt.push_str("Previous conversation:\n");
            prompt.push_str(&memory.render_transcript());
            prompt.push_str("\n\n");
        }

        prompt.push_str(&format!("Question: {user_message}\nThought:"));
        prompt.push_str(&scratchpad.render());
        prompt
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
    hooks: ObservabilityHooks,
    registration_error: Option<AgentError>,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: Arc::new(ToolRegistry::new()),
            config: AgentConfig::default(),
            hooks: ObservabilityHooks::new(),
            registration_error: None,
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Register a tool; a duplicate name fails `build`
    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        if let Err(e) = self.tools.register(tool) {
            self.registration_error.get_or_insert(e);
        }
        self
    }

    /// Use a shared registry
    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn llm_timeout(mut self, deadline: Duration) -> Self {
        self.config.llm_timeout = deadline;
        self
    }

    pub fn tool_timeout(mut self, deadline: Duration) -> Self {
        self.config.tool_timeout = deadline;
        self
    }

    /// Attach an event sink
    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.hooks.add_sink(sink);
        self
    }

    pub fn build(self) -> Result<Agent> {
        if let Some(e) = self.registration_error {
            return Err(e);
        }

        let provider = self.provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        if self.config.max_iterations == 0 {
            return Err(AgentError::Config("max_iterations must be at least 1".into()));
        }

        Ok(Agent::new(provider, self.tools, self.config, self.hooks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::TurnRole;
    use crate::observability::ExecutionLog;
    use crate::testing::{ScriptStep, ScriptedProvider};
    use crate::tool::{ToolResult, ToolSchema};
    use async_trait::async_trait;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema::new("echo", "Repeats its input.")
        }

        async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
            Ok(ToolResult::success("echo", format!("echo: {input}", input = call.input)))
        }
    }

    struct BrokenTool;

    #[async_trait]
    impl Tool for BrokenTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema::new("broken", "Always fails.").optional_input()
        }

        async fn execute(&self, _call: &ToolCall) -> Result<ToolResult> {
            Err(AgentError::ToolExecution("backend connection refused".into()))
        }
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema::new("slow", "Never returns.").optional_input()
        }

        async fn execute(&self, _call: &ToolCall) -> Result<ToolResult> {
            std::future::pending::<()>().await;
            Ok(ToolResult::success("slow", "late"))
        }
    }

    fn agent_with(
        provider: Arc<ScriptedProvider>,
        log: Arc<ExecutionLog>,
    ) -> Agent {
        AgentBuilder::new()
            .provider(provider)
            .tool(EchoTool)
            .tool(BrokenTool)
            .tool(SlowTool)
            .tool_timeout(Duration::from_millis(50))
            .llm_timeout(Duration::from_millis(50))
            .sink(log)
            .build()
            .unwrap()
    }

    fn kinds(log: &ExecutionLog) -> Vec<EventKind> {
        log.events().iter().map(|e| e.kind).collect()
    }

    #[tokio::test]
    async fn test_direct_answer() {
        let provider = Arc::new(ScriptedProvider::replies(["Thought: easy\nFinal Answer: 42"]));
        let log = Arc::new(ExecutionLog::new());
        let agent = agent_with(provider.clone(), log.clone());
        let mut memory = ConversationMemory::new();

        let answer = agent.run_turn(&mut memory, "What is six times seven?").await;

        assert_eq!(answer, "42");
        assert_eq!(provider.call_count(), 1);
        assert_eq!(memory.len(), 2);
        assert_eq!(memory.snapshot()[0].role, TurnRole::User);
        assert_eq!(memory.snapshot()[1].content, "42");
        assert_eq!(kinds(&log), vec![EventKind::LlmStart, EventKind::LlmEnd, EventKind::Finish]);
    }

    #[tokio::test]
    async fn test_tool_then_answer_feeds_observation_back() {
        let provider = Arc::new(ScriptedProvider::replies([
            "Thought: use echo\nAction: echo\nAction Input: ping",
            "Thought: I now know the final answer\nFinal Answer: pong",
        ]));
        let log = Arc::new(ExecutionLog::new());
        let agent = agent_with(provider.clone(), log.clone());
        let mut memory = ConversationMemory::new();

        let report = agent.run_turn_with_report(&mut memory, "say ping").await;

        assert_eq!(report.status, TurnStatus::Finished);
        assert_eq!(report.steps.len(), 1);
        assert_eq!(report.steps[0].observation, "echo: ping");
        assert!(provider.prompts()[1].contains("Observation: echo: ping"));
        assert_eq!(
            kinds(&log),
            vec![
                EventKind::LlmStart,
                EventKind::LlmEnd,
                EventKind::Action,
                EventKind::ToolStart,
                EventKind::ToolEnd,
                EventKind::LlmStart,
                EventKind::LlmEnd,
                EventKind::Finish,
            ]
        );
    }

    #[tokio::test]
    async fn test_tool_end_truncates_for_display_only() {
        let long_input = "INV-1001 Alice Johnson ".repeat(20);
        let provider = Arc::new(ScriptedProvider::replies([
            format!("Action: echo\nAction Input: {long_input}"),
            "Final Answer: done".to_string(),
        ]));
        let log = Arc::new(ExecutionLog::new());
        let agent = agent_with(provider, log.clone());
        let mut memory = ConversationMemory::new();

        let report = agent.run_turn_with_report(&mut memory, "echo a long record").await;

        let full = format!("echo: {trimmed}", trimmed = long_input.trim());
        assert!(full.chars().count() > DISPLAY_TRUNCATE_CHARS);
        assert_eq!(report.steps[0].observation, full);

        let events = log.events();
        let tool_end = events.iter().find(|e| e.kind == EventKind::ToolEnd).unwrap();
        let shown = tool_end.payload["output"].as_str().unwrap();
        assert_eq!(shown.chars().count(), DISPLAY_TRUNCATE_CHARS + 3);
        assert!(shown.ends_with("..."));
        assert!(full.starts_with(shown.trim_end_matches("...")));
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_single_observation() {
        let provider = Arc::new(ScriptedProvider::replies([
            "Action: fax_invoice\nAction Input: 1001",
            "Final Answer: I cannot fax invoices.",
        ]));
        let agent = agent_with(provider, Arc::new(ExecutionLog::new()));
        let mut memory = ConversationMemory::new();

        let report = agent.run_turn_with_report(&mut memory, "fax invoice 1001").await;

        let not_found: Vec<_> = report
            .steps
            .iter()
            .filter(|s| s.outcome == StepOutcome::ToolNotFound)
            .collect();
        assert_eq!(not_found.len(), 1);
        assert!(not_found[0].observation.contains("fax_invoice is not a valid tool"));
        assert!(not_found[0].observation.contains("echo, broken, slow"));
        assert_eq!(report.answer, "I cannot fax invoices.");
    }

    #[tokio::test]
    async fn test_tool_failure_is_observation() {
        let provider = Arc::new(ScriptedProvider::replies([
            "Action: broken\nAction Input: x",
            "Final Answer: The search service is down, please retry later.",
        ]));
        let log = Arc::new(ExecutionLog::new());
        let agent = agent_with(provider.clone(), log.clone());
        let mut memory = ConversationMemory::new();

        let report = agent.run_turn_with_report(&mut memory, "find invoices").await;

        assert_eq!(report.steps[0].outcome, StepOutcome::ToolError);
        assert!(report.steps[0].observation.contains("backend connection refused"));
        assert!(kinds(&log).contains(&EventKind::ToolError));
        assert!(report.answer.contains("retry"));
    }

    #[tokio::test]
    async fn test_tool_timeout_is_observation() {
        let provider = Arc::new(ScriptedProvider::replies([
            "Action: slow\nAction Input: x",
            "Final Answer: gave up on slow",
        ]));
        let agent = agent_with(provider, Arc::new(ExecutionLog::new()));
        let mut memory = ConversationMemory::new();

        let report = agent.run_turn_with_report(&mut memory, "be slow").await;

        assert_eq!(report.steps[0].outcome, StepOutcome::ToolError);
        assert!(report.steps[0].observation.contains("exceeded"));
        assert_eq!(report.status, TurnStatus::Finished);
    }

    #[tokio::test]
    async fn test_unparseable_output_exhausts_budget() {
        let provider = Arc::new(ScriptedProvider::repeating("I refuse to follow the format"));
        let agent = agent_with(provider.clone(), Arc::new(ExecutionLog::new()));
        let mut memory = ConversationMemory::new();

        let report = agent.run_turn_with_report(&mut memory, "hello").await;

        assert_eq!(report.status, TurnStatus::BudgetExhausted);
        assert_eq!(provider.call_count(), 10);
        assert_eq!(report.model_calls, 10);
        assert_eq!(report.steps.len(), 10);
        assert!(report.steps.iter().all(|s| s.outcome == StepOutcome::InvalidFormat));
        assert!(report.answer.contains("step budget of 10 iterations"));
        assert_eq!(memory.len(), 2);
    }

    #[tokio::test]
    async fn test_parse_error_then_recovery() {
        let provider = Arc::new(ScriptedProvider::replies([
            "no idea",
            "Final Answer: recovered",
        ]));
        let agent = agent_with(provider.clone(), Arc::new(ExecutionLog::new()));

        let answer = agent.ask("hi").await;

        assert_eq!(answer, "recovered");
        assert!(provider.prompts()[1].contains("Invalid Format"));
    }

    #[tokio::test]
    async fn test_budget_answer_includes_last_result() {
        let provider = Arc::new(ScriptedProvider::repeating("Action: echo\nAction Input: again"));
        let agent = AgentBuilder::new()
            .provider(provider.clone())
            .tool(EchoTool)
            .max_iterations(3)
            .build()
            .unwrap();
        let mut memory = ConversationMemory::new();

        let answer = agent.run_turn(&mut memory, "loop forever").await;

        assert_eq!(provider.call_count(), 3);
        assert!(answer.contains("step budget of 3 iterations"));
        assert!(answer.contains("echo: again"));
    }

    #[tokio::test]
    async fn test_model_timeout_and_unavailable_continue() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ScriptStep::Hang,
            ScriptStep::Unavailable("503".into()),
            ScriptStep::Reply("Final Answer: back online".into()),
        ]));
        let agent = agent_with(provider.clone(), Arc::new(ExecutionLog::new()));
        let mut memory = ConversationMemory::new();

        let report = agent.run_turn_with_report(&mut memory, "status?").await;

        assert_eq!(report.answer, "back online");
        assert_eq!(report.model_calls, 3);
        assert!(report.steps.iter().all(|s| s.outcome == StepOutcome::ModelError));
    }

    #[tokio::test]
    async fn test_auth_failure_ends_turn_without_memory() {
        let provider = Arc::new(ScriptedProvider::new(vec![ScriptStep::AuthFailure("bad key".into())]));
        let agent = agent_with(provider, Arc::new(ExecutionLog::new()));
        let mut memory = ConversationMemory::new();

        let report = agent.run_turn_with_report(&mut memory, "hi").await;

        assert_eq!(report.status, TurnStatus::Failed);
        assert!(report.answer.starts_with("Error: "));
        assert!(memory.is_empty());
    }

    #[tokio::test]
    async fn test_prompt_carries_memory_and_tools() {
        let provider = Arc::new(ScriptedProvider::replies([
            "Final Answer: first",
            "Final Answer: second",
        ]));
        let agent = agent_with(provider.clone(), Arc::new(ExecutionLog::new()));
        let mut memory = ConversationMemory::new();

        agent.run_turn(&mut memory, "Find invoices for Alice Johnson").await;
        agent.run_turn(&mut memory, "What was her total?").await;

        let second = &provider.prompts()[1];
        assert!(second.contains("Human: Find invoices for Alice Johnson"));
        assert!(second.contains("AI: first"));
        assert!(second.contains("should be one of [echo, broken, slow]"));
        assert!(second.ends_with("Question: What was her total?\nThought:"));
        assert_eq!(memory.len(), 4);
    }

    #[tokio::test]
    async fn test_concurrent_turns_are_isolated() {
        let provider = Arc::new(ScriptedProvider::repeating("Final Answer: ok"));
        let agent = Arc::new(agent_with(provider, Arc::new(ExecutionLog::new())));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let agent = agent.clone();
                tokio::spawn(async move {
                    let mut memory = ConversationMemory::new();
                    agent.run_turn(&mut memory, &format!("question {i}")).await;
                    memory
                })
            })
            .collect();

        for (i, memory) in futures::future::join_all(handles).await.into_iter().enumerate() {
            let memory = memory.unwrap();
            assert_eq!(memory.len(), 2);
            assert_eq!(memory.snapshot()[0].content, format!("question {i}"));
        }
    }

    #[test]
    fn test_builder_rejects_duplicate_tool() {
        let result = AgentBuilder::new()
            .provider(Arc::new(ScriptedProvider::repeating("Final Answer: x")))
            .tool(EchoTool)
            .tool(EchoTool)
            .build();

        assert!(matches!(result, Err(AgentError::DuplicateTool(_))));
    }

    #[test]
    fn test_builder_requires_provider() {
        assert!(matches!(AgentBuilder::new().build(), Err(AgentError::Config(_))));
    }
}
