//! Service Kit - Agent Tools
//!
//! Domain-specific tools that implement `agent_core::Tool` for the invoice agent.

mod invoice_lookup;
mod ocr_extract;
mod search_invoices;

pub use invoice_lookup::InvoiceLookupTool;
pub use ocr_extract::OcrExtractTool;
pub use search_invoices::SearchInvoicesTool;
