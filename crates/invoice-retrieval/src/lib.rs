//! # invoice-retrieval
//!
//! Invoice search and retrieval-augmented answering, exposed to the agent
//! as tools.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐   query    ┌───────────────┐   records   ┌──────────────────┐
//! │ RetrievalQa  │──────────▶ │ DocumentStore │───────────▶ │  SearchBackend   │
//! │ (stuff + LLM)│ ◀──────────│  (extraction) │ ◀───────────│ Azure AI / Mock  │
//! └──────┬───────┘  ranked    └───────────────┘             └──────────────────┘
//!        │          documents
//!        ▼
//!  answer + sources  ──▶  search_invoices tool
//! ```

pub mod backend;
pub mod error;
pub mod model;
pub mod qa;
pub mod store;
pub mod svckit;

pub use backend::{AzureSearchBackend, AzureSearchConfig, MockSearchBackend, SearchBackend};
pub use error::{Result, RetrievalError};
pub use model::{QaAnswer, RetrievedDocument, SearchRecord, SearchResponse};
pub use qa::{RetrievalQa, NO_RESULTS_ANSWER};
pub use store::{extract_content, DocumentStore, DEFAULT_TOP_K};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{InvoiceLookupTool, OcrExtractTool, SearchInvoicesTool};
}

/// System prompt for the invoice agent
pub const INVOICE_AGENT_PROMPT: &str = "You are an assistant for an invoice database. \
Use `search_invoices` for questions about customers, products, amounts, dates and payment status, \
`invoice_lookup` when the user wants the raw records, and `ocr_extract` to read scanned documents. \
Only state facts that a tool returned.

Answer the following questions as best you can. You have access to the following tools:";
