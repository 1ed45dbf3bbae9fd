//! Domain Models
//!
//! Raw search hits, ranked documents and synthesized answers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A raw record returned by the search service
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchRecord {
    /// Document fields as stored in the index
    pub fields: Map<String, Value>,

    /// Relevance score, when the service reports one
    #[serde(default)]
    pub score: Option<f64>,
}

impl SearchRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields, score: None }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// String value of a field, if present and non-empty
    pub fn text(&self, key: &str) -> Option<String> {
        field_text(self.fields.get(key)?)
    }
}

/// Result of a ranked search
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Hits in rank order
    pub records: Vec<SearchRecord>,

    /// Total matches in the index, when requested
    #[serde(default)]
    pub total_count: Option<u64>,
}

/// A ranked unit of evidence
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    /// Extracted text handed to the model
    pub content: String,

    /// Remaining record fields
    pub metadata: Map<String, Value>,

    /// 1-based position in the result list
    pub rank: usize,
}

impl RetrievedDocument {
    /// Invoice id if the record carries one, otherwise `#rank`
    pub fn source_label(&self) -> String {
        self.metadata
            .get("invoice_id")
            .and_then(field_text)
            .unwrap_or_else(|| format!("#{rank}", rank = self.rank))
    }
}

/// An answer with its provenance
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QaAnswer {
    pub answer: String,
    pub sources: Vec<RetrievedDocument>,
}

impl QaAnswer {
    /// `Sources:` line listing each document's label, or `None` without sources
    pub fn sources_line(&self) -> Option<String> {
        if self.sources.is_empty() {
            return None;
        }

        let labels: Vec<String> = self.sources.iter().map(RetrievedDocument::source_label).collect();
        Some(format!("Sources: {joined}", joined = labels.join(", ")))
    }
}

/// Render a scalar JSON value as text; empty strings and nulls yield `None`
pub(crate) fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(metadata: Value, rank: usize) -> RetrievedDocument {
        RetrievedDocument {
            content: "text".into(),
            metadata: metadata.as_object().cloned().unwrap_or_default(),
            rank,
        }
    }

    #[test]
    fn test_source_label() {
        assert_eq!(doc(json!({"invoice_id": "INV-1001"}), 1).source_label(), "INV-1001");
        assert_eq!(doc(json!({"invoice_id": 42}), 1).source_label(), "42");
        assert_eq!(doc(json!({"invoice_id": ""}), 3).source_label(), "#3");
        assert_eq!(doc(json!({}), 2).source_label(), "#2");
    }

    #[test]
    fn test_sources_line() {
        let answer = QaAnswer {
            answer: "two invoices".into(),
            sources: vec![doc(json!({"invoice_id": "INV-1"}), 1), doc(json!({}), 2)],
        };
        assert_eq!(answer.sources_line().unwrap(), "Sources: INV-1, #2");

        let empty = QaAnswer { answer: "none".into(), sources: Vec::new() };
        assert!(empty.sources_line().is_none());
    }

    #[test]
    fn test_field_text() {
        assert_eq!(field_text(&json!(" Paid ")), Some("Paid".into()));
        assert_eq!(field_text(&json!(3)), Some("3".into()));
        assert_eq!(field_text(&json!(null)), None);
        assert_eq!(field_text(&json!("  ")), None);
    }
}
