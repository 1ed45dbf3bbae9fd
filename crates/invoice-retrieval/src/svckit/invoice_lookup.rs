//! Invoice Lookup Tool
//!
//! Raw invoice search: returns the matching records without summarizing.

use async_trait::async_trait;
use serde_json::json;

use agent_core::{Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema};

use crate::store::DocumentStore;

pub const TOOL_NAME: &str = "invoice_lookup";

/// Tool listing invoices that match a query
pub struct InvoiceLookupTool {
    store: DocumentStore,
}

impl InvoiceLookupTool {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for InvoiceLookupTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            TOOL_NAME,
            "Look up raw invoice records matching a customer, product, or invoice id. \
                Returns the records themselves, not a summary.",
        )
        .input("search terms such as a customer name or invoice id")
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let query = call.input.trim();
        let documents = self.store.retrieve(query).await?;

        if documents.is_empty() {
            return Ok(ToolResult::success(
                TOOL_NAME,
                format!("No invoices found for '{query}'."),
            ));
        }

        let output = documents
            .iter()
            .map(|d| format!("{rank}. {content}", rank = d.rank, content = d.content))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(ToolResult::success(TOOL_NAME, output).with_data(json!({
            "documents": documents,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::backend::MockSearchBackend;

    #[tokio::test]
    async fn test_numbered_list() {
        let tool = InvoiceLookupTool::new(DocumentStore::new(Arc::new(MockSearchBackend::new())));
        let result = tool.execute(&ToolCall::new(TOOL_NAME, "Alice Johnson")).await.unwrap();

        let lines: Vec<&str> = result.output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("1. Invoice ID: INV-1001 | "));
        assert!(lines[1].starts_with("2. Invoice ID: INV-1003 | "));
    }

    #[tokio::test]
    async fn test_no_invoices() {
        let tool = InvoiceLookupTool::new(DocumentStore::new(Arc::new(MockSearchBackend::empty())));
        let result = tool.execute(&ToolCall::new(TOOL_NAME, " Zed ")).await.unwrap();

        assert!(result.success);
        assert_eq!(result.output, "No invoices found for 'Zed'.");
    }
}
