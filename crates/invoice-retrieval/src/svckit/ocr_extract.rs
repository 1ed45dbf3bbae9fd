//! OCR Extraction Tool
//!
//! Placeholder OCR: reports canned text for the given document path.

use async_trait::async_trait;
use serde_json::json;

use agent_core::{Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema};

pub const TOOL_NAME: &str = "ocr_extract";

/// Mock OCR tool
#[derive(Default)]
pub struct OcrExtractTool;

impl OcrExtractTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for OcrExtractTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            TOOL_NAME,
            "Extract text from images or documents using OCR. Use this when you \
                need to read text from uploaded images or scanned documents.",
        )
        .input("path of the image or document")
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let path = call.input.trim();
        tracing::debug!(path, "Mock OCR extraction");

        Ok(ToolResult::success(
            TOOL_NAME,
            format!("Mock OCR result for {path}: This is extracted text from the document."),
        )
        .with_data(json!({ "path": path, "mock": true })))
    }
}
