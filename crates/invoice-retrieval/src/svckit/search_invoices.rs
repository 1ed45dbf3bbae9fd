//! Invoice Search Tool
//!
//! Answers questions about invoices from retrieved evidence and reports
//! which invoices the answer came from.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use agent_core::{Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema};

use crate::qa::RetrievalQa;

pub const TOOL_NAME: &str = "search_invoices";

/// Retrieval-augmented invoice question answering
pub struct SearchInvoicesTool {
    qa: Arc<RetrievalQa>,
}

impl SearchInvoicesTool {
    pub fn new(qa: Arc<RetrievalQa>) -> Self {
        Self { qa }
    }
}

#[async_trait]
impl Tool for SearchInvoicesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            TOOL_NAME,
            "Search the invoice database and answer questions about invoices, \
                customers, products, amounts, dates, and payment status.",
        )
        .input("a question or search terms, e.g. a customer name")
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let result = self.qa.answer(call.input.trim()).await?;

        let output = match result.sources_line() {
            Some(sources) => format!("{answer}\n\n{sources}", answer = result.answer),
            None => result.answer.clone(),
        };

        Ok(ToolResult::success(TOOL_NAME, output).with_data(json!({
            "sources": result.sources,
        })))
    }
}
