//! End-to-end agent turns over the invoice tools with a scripted model.

use std::sync::Arc;

use agent_core::testing::ScriptedProvider;
use agent_core::{
    AgentBuilder, ChatSession, ConversationMemory, EventKind, ExecutionLog, StepOutcome, TurnRole,
    TurnStatus,
};
use invoice_retrieval::tools::{OcrExtractTool, SearchInvoicesTool};
use invoice_retrieval::{DocumentStore, MockSearchBackend, RetrievalQa, INVOICE_AGENT_PROMPT};

const SEARCH_STEP: &str =
    "Thought: I should look up this customer's invoices.\nAction: search_invoices\nAction Input: Alice Johnson";

fn builder(provider: Arc<ScriptedProvider>, backend: MockSearchBackend) -> AgentBuilder {
    let store = DocumentStore::new(Arc::new(backend));
    let qa = Arc::new(RetrievalQa::new(store, provider.clone()));

    AgentBuilder::new()
        .provider(provider)
        .system_prompt(INVOICE_AGENT_PROMPT)
        .tool(SearchInvoicesTool::new(qa))
        .tool(OcrExtractTool::new())
}

#[tokio::test]
async fn alice_johnson_invoices_are_found_and_summarized() {
    // Agent step, retrieval synthesis, then the final answer, all from one model.
    let provider = Arc::new(ScriptedProvider::replies([
        SEARCH_STEP,
        "Alice Johnson has two paid invoices: INV-1001 (Laptop) and INV-1003 (Monitors).",
        "Thought: I now know the final answer\nFinal Answer: Alice Johnson has two invoices, INV-1001 and INV-1003, both paid.",
    ]));
    let log = Arc::new(ExecutionLog::new());
    let agent = builder(provider.clone(), MockSearchBackend::new())
        .sink(log.clone())
        .build()
        .unwrap();

    let mut memory = ConversationMemory::new();
    let report = agent
        .run_turn_with_report(&mut memory, "Find invoices for Alice Johnson")
        .await;

    assert_eq!(report.status, TurnStatus::Finished);
    assert!(report.answer.contains("Alice Johnson"));
    assert_eq!(report.model_calls, 2);

    assert_eq!(report.steps.len(), 1);
    let step = &report.steps[0];
    assert_eq!(step.action, "search_invoices");
    assert_eq!(step.action_input, "Alice Johnson");
    assert_eq!(step.outcome, StepOutcome::Success);
    assert!(step.observation.ends_with("Sources: INV-1001, INV-1003"));

    assert_eq!(memory.len(), 2);
    assert_eq!(memory.snapshot()[0].role, TurnRole::User);
    assert_eq!(memory.snapshot()[1].content, report.answer);

    let kinds: Vec<EventKind> = log
        .events()
        .iter()
        .map(|e| e.kind)
        .filter(|k| !matches!(k, EventKind::LlmStart | EventKind::LlmEnd))
        .collect();
    assert_eq!(
        kinds,
        vec![EventKind::Action, EventKind::ToolStart, EventKind::ToolEnd, EventKind::Finish]
    );

    // The final model call sees the observation in its scratchpad.
    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[0].contains("search_invoices:"));
    assert!(prompts[2].contains("Observation: Alice Johnson has two paid invoices"));
}

#[tokio::test]
async fn search_outage_becomes_observation_and_turn_completes() {
    let provider = Arc::new(ScriptedProvider::replies([
        SEARCH_STEP,
        "Thought: The search service is down.\nFinal Answer: I could not reach the invoice database right now.",
    ]));
    let log = Arc::new(ExecutionLog::new());
    let agent = builder(provider, MockSearchBackend::unavailable("connection refused"))
        .sink(log.clone())
        .build()
        .unwrap();

    let mut memory = ConversationMemory::new();
    let report = agent
        .run_turn_with_report(&mut memory, "Find invoices for Alice Johnson")
        .await;

    assert_eq!(report.status, TurnStatus::Finished);
    assert_eq!(report.answer, "I could not reach the invoice database right now.");
    assert_eq!(report.steps[0].outcome, StepOutcome::ToolError);
    assert!(report.steps[0].observation.contains("connection refused"));

    let errors: Vec<_> = log
        .events()
        .into_iter()
        .filter(|e| e.kind == EventKind::ToolError)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].payload["tool"], "search_invoices");
    assert_eq!(memory.len(), 2);
}

#[tokio::test]
async fn unparseable_model_exhausts_budget() {
    let provider = Arc::new(ScriptedProvider::repeating("I am not sure what to do here."));
    let agent = builder(provider.clone(), MockSearchBackend::new()).build().unwrap();

    let mut memory = ConversationMemory::new();
    let report = agent.run_turn_with_report(&mut memory, "Find invoices for Alice Johnson").await;

    assert_eq!(report.status, TurnStatus::BudgetExhausted);
    assert_eq!(provider.call_count(), 10);
    assert!(report.steps.iter().all(|s| s.outcome == StepOutcome::InvalidFormat));
    assert_eq!(
        report.answer,
        "Agent stopped: could not complete the request within the step budget of 10 iterations."
    );
}

#[tokio::test]
async fn zero_hits_yield_defined_answer() {
    let provider = Arc::new(ScriptedProvider::replies([
        SEARCH_STEP,
        "Thought: Nothing matched.\nFinal Answer: I found no invoices for Alice Johnson.",
    ]));
    let agent = builder(provider.clone(), MockSearchBackend::empty()).build().unwrap();

    let report = agent
        .run_turn_with_report(&mut ConversationMemory::new(), "Find invoices for Alice Johnson")
        .await;

    assert_eq!(report.steps[0].observation, "no relevant information found");
    assert_eq!(report.answer, "I found no invoices for Alice Johnson.");
    // No synthesis call when nothing was retrieved.
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn session_keeps_history_across_turns() {
    let provider = Arc::new(ScriptedProvider::replies([
        SEARCH_STEP,
        "Alice Johnson has invoices INV-1001 and INV-1003.",
        "Final Answer: Alice Johnson has invoices INV-1001 and INV-1003.",
        "Final Answer: The first one was paid by credit card.",
    ]));
    let mut session = ChatSession::new(builder(provider.clone(), MockSearchBackend::new())).unwrap();

    session.chat("Find invoices for Alice Johnson").await;
    let reply = session.chat("How was the first one paid?").await;

    assert_eq!(reply, "The first one was paid by credit card.");
    assert_eq!(session.memory_summary().len(), 4);

    let last_prompt = provider.prompts().pop().unwrap();
    assert!(last_prompt.contains("Previous conversation:\nHuman: Find invoices for Alice Johnson"));
}
