//! Document Store
//!
//! Turns a query into ranked [`RetrievedDocument`]s by querying a
//! [`SearchBackend`] and extracting readable text from each raw hit.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::backend::SearchBackend;
use crate::error::Result;
use crate::model::{field_text, RetrievedDocument, SearchRecord};

/// Default number of documents fetched per query
pub const DEFAULT_TOP_K: usize = 5;

/// Field holding pre-rendered document text
const CONTENT_FIELD: &str = "content";

/// Labelled fields used when a record has no `content`, in output order
const LABELLED_FIELDS: [(&str, &str); 10] = [
    ("invoice_id", "Invoice ID"),
    ("date", "Date"),
    ("customer_name", "Customer"),
    ("address", "Address"),
    ("product", "Product"),
    ("quantity", "Quantity"),
    ("unit_price", "Unit Price"),
    ("total_amount", "Total Amount"),
    ("payment_method", "Payment Method"),
    ("status", "Status"),
];

/// Read-only view over the invoice index
#[derive(Clone)]
pub struct DocumentStore {
    backend: Arc<dyn SearchBackend>,
    top_k: usize,
}

impl DocumentStore {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            backend,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Override how many documents a query returns (at least one)
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn backend(&self) -> &dyn SearchBackend {
        self.backend.as_ref()
    }

    /// Ranked documents for `query`; zero hits is an empty list
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedDocument>> {
        let response = self.backend.search(query, self.top_k).await?;

        tracing::debug!(
            backend = self.backend.name(),
            query,
            hits = response.records.len(),
            total = ?response.total_count,
            "Retrieved documents"
        );

        Ok(response
            .records
            .into_iter()
            .take(self.top_k)
            .enumerate()
            .map(|(i, record)| to_document(record, i + 1))
            .collect())
    }
}

fn to_document(record: SearchRecord, rank: usize) -> RetrievedDocument {
    let content = extract_content(&record.fields);

    let mut metadata = record.fields;
    metadata.remove(CONTENT_FIELD);
    if let Some(score) = record.score {
        metadata.insert("score".into(), Value::from(score));
    }

    RetrievedDocument {
        content,
        metadata,
        rank,
    }
}

/// Readable text for a raw search record. Never empty.
///
/// A non-empty `content` field wins. Otherwise known invoice fields are
/// rendered as `Label: value` pairs joined by `" | "`. A record with none
/// of those falls back to its JSON text.
pub fn extract_content(fields: &Map<String, Value>) -> String {
    if let Some(content) = fields.get(CONTENT_FIELD).and_then(field_text) {
        return content;
    }

    let parts: Vec<String> = LABELLED_FIELDS
        .iter()
        .filter_map(|(key, label)| {
            let value = fields.get(*key).and_then(field_text)?;
            Some(format!("{label}: {value}"))
        })
        .collect();

    if !parts.is_empty() {
        return parts.join(" | ");
    }

    if fields.is_empty() {
        return "{}".into();
    }

    Value::Object(fields.clone()).to_string()
}
