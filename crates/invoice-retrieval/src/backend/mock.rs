//! Mock Search Backend
//!
//! For testing and demo purposes. Serves a small static invoice set with
//! naive keyword ranking.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::SearchBackend;
use crate::error::{Result, RetrievalError};
use crate::model::{field_text, SearchRecord, SearchResponse};

/// In-memory search backend
pub struct MockSearchBackend {
    records: Vec<Map<String, Value>>,
    /// When set, every search fails with this message
    outage: Option<String>,
}

impl Default for MockSearchBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSearchBackend {
    /// Backend preloaded with the sample invoices
    pub fn new() -> Self {
        Self::with_records(sample_invoices())
    }

    /// Backend over the given records
    pub fn with_records(records: Vec<Map<String, Value>>) -> Self {
        Self { records, outage: None }
    }

    /// Backend with no documents
    pub fn empty() -> Self {
        Self::with_records(Vec::new())
    }

    /// Backend whose every query fails as if the service were down
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            records: Vec::new(),
            outage: Some(message.into()),
        }
    }

    /// Number of query terms found anywhere in the record
    fn score(record: &Map<String, Value>, terms: &[String]) -> usize {
        let haystack: String = record
            .values()
            .filter_map(field_text)
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        terms.iter().filter(|t| haystack.contains(t.as_str())).count()
    }
}

fn query_terms(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|t| t.len() >= 2)
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl SearchBackend for MockSearchBackend {
    async fn search(&self, query: &str, top: usize) -> Result<SearchResponse> {
        if let Some(message) = &self.outage {
            return Err(RetrievalError::Unavailable(message.clone()));
        }

        let terms = query_terms(query);
        let match_all = terms.is_empty() || query.trim() == "*";

        let mut scored: Vec<(usize, &Map<String, Value>)> = self
            .records
            .iter()
            .map(|r| (if match_all { 1 } else { Self::score(r, &terms) }, r))
            .filter(|(score, _)| *score > 0)
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        let total = scored.len() as u64;

        let records = scored
            .into_iter()
            .take(top)
            .map(|(score, fields)| SearchRecord::new(fields.clone()).with_score(score as f64))
            .collect();

        Ok(SearchResponse {
            records,
            total_count: Some(total),
        })
    }

    async fn health_check(&self) -> bool {
        self.outage.is_none()
    }

    fn name(&self) -> &str {
        "MockSearch"
    }
}

fn invoice(
    id: &str,
    date: &str,
    customer: &str,
    address: &str,
    product: &str,
    quantity: u32,
    unit_price: f64,
    payment_method: &str,
    status: &str,
) -> Map<String, Value> {
    let record = json!({
        "invoice_id": id,
        "date": date,
        "customer_name": customer,
        "address": address,
        "product": product,
        "quantity": quantity,
        "unit_price": unit_price,
        "total_amount": f64::from(quantity) * unit_price,
        "payment_method": payment_method,
        "status": status,
    });

    match record {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Sample invoice set used by the demo server and tests
pub fn sample_invoices() -> Vec<Map<String, Value>> {
    vec![
        invoice("INV-1001", "2024-01-15", "Alice Johnson", "12 Oak Street, Springfield", "Laptop", 1, 1200.0, "Credit Card", "Paid"),
        invoice("INV-1002", "2024-02-03", "Bob Smith", "48 Pine Avenue, Riverton", "Office Chair", 4, 150.0, "Bank Transfer", "Pending"),
        invoice("INV-1003", "2024-02-20", "Alice Johnson", "12 Oak Street, Springfield", "Monitor", 2, 300.0, "PayPal", "Paid"),
        invoice("INV-1004", "2024-03-08", "Carol Martinez", "7 Elm Road, Lakeside", "Printer", 1, 450.0, "Credit Card", "Overdue"),
        invoice("INV-1005", "2024-03-22", "David Lee", "301 Maple Drive, Hillcrest", "Keyboard", 10, 45.0, "Bank Transfer", "Paid"),
    ]
}
