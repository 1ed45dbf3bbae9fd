//! Invoice Agent HTTP Server
//!
//! Axum-based server exposing the invoice agent as a multi-conversation
//! chat API. Each conversation keeps its own memory and execution log.

mod config;
mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::provider::GenerationOptions;
use agent_core::{JsonLinesSink, LlmProvider, ToolRegistry};
use agent_runtime::{AzureOpenAiProvider, OllamaProvider};
use invoice_retrieval::{
    tools::{InvoiceLookupTool, OcrExtractTool, SearchInvoicesTool},
    AzureSearchBackend, DocumentStore, MockSearchBackend, RetrievalQa, SearchBackend,
    INVOICE_AGENT_PROMPT,
};

use crate::config::{AppConfig, LlmBackend};
use crate::handlers::{
    chat_handler, clear_memory, delete_conversation, get_log, get_memory, health_check, list_tools,
};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    // Initialize LLM provider
    let provider: Arc<dyn LlmProvider> = match &config.llm.backend {
        LlmBackend::Ollama(ollama) => Arc::new(OllamaProvider::from_config(ollama.clone())),
        LlmBackend::Azure(azure) => Arc::new(AzureOpenAiProvider::new(azure.clone())?),
    };

    match provider.health_check().await {
        Ok(true) => tracing::info!(model = config.llm.model(), "✓ Language model reachable"),
        Ok(false) | Err(_) => {
            tracing::warn!(model = config.llm.model(), "⚠ Language model not reachable - turns will fail");
        }
    }

    // Initialize search backend
    let search: Arc<dyn SearchBackend> = match &config.search.azure {
        Some(azure) => {
            tracing::info!(index = %azure.index_name, "Using Azure AI Search");
            Arc::new(AzureSearchBackend::new(azure.clone())?)
        }
        None => {
            tracing::warn!("⚠ AZURE_SEARCH_ENDPOINT not set - using the built-in sample invoices");
            Arc::new(MockSearchBackend::new())
        }
    };

    // Initialize tools
    let store = DocumentStore::new(search.clone()).with_top_k(config.search.top_k);
    let qa = RetrievalQa::new(store.clone(), provider.clone()).with_options(GenerationOptions {
        model: config.llm.model().to_string(),
        temperature: config.llm.temperature,
        ..Default::default()
    });

    let tools = ToolRegistry::new();
    tools.register(SearchInvoicesTool::new(Arc::new(qa)))?;
    tools.register(InvoiceLookupTool::new(store))?;
    tools.register(OcrExtractTool::new())?;

    tracing::info!("Registered {count} tools:", count = tools.len());
    for name in tools.names() {
        tracing::info!("  • {name}");
    }

    // Build application state
    let mut state = AppState::new(
        provider,
        search,
        Arc::new(tools),
        config.agent_config(INVOICE_AGENT_PROMPT),
    )
    .with_memory_cap(config.agent.memory_max_turns)
    .with_conversation_limit(config.agent.max_conversations);

    if let Some(path) = &config.agent.execution_log {
        tracing::info!(path = %path.display(), "Writing execution log");
        state = state.with_sink(Arc::new(JsonLinesSink::new(path)));
    }

    let app = router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 invoice-agent running on http://{addr}", addr = config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET    /health                          - Health check");
    tracing::info!("  GET    /api/tools                       - Registered tools");
    tracing::info!("  POST   /api/chat                        - Send message");
    tracing::info!("  DELETE /api/conversations/{{id}}        - End conversation");
    tracing::info!("  GET    /api/conversations/{{id}}/memory - Conversation history");
    tracing::info!("  DELETE /api/conversations/{{id}}/memory - Clear history");
    tracing::info!("  GET    /api/conversations/{{id}}/log    - Execution events");

    axum::serve(listener, app).await?;

    Ok(())
}

/// HTTP routes over the shared state
fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & info
        .route("/health", get(health_check))
        .route("/api/tools", get(list_tools))

        // Agent API
        .route("/api/chat", post(chat_handler))
        .route("/api/conversations/{id}", delete(delete_conversation))
        .route(
            "/api/conversations/{id}/memory",
            get(get_memory).delete(clear_memory),
        )
        .route("/api/conversations/{id}/log", get(get_log))

        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
