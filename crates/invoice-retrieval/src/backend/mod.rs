//! Search Backends
//!
//! Abstraction over the external ranked-search service holding invoices.

mod azure;
mod mock;

pub use azure::{AzureSearchBackend, AzureSearchConfig};
pub use mock::{sample_invoices, MockSearchBackend};

use async_trait::async_trait;

use crate::error::Result;
use crate::model::SearchResponse;

/// Ranked search service (Strategy pattern)
///
/// Implement this for each index provider.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run a full-text query, returning at most `top` hits in rank order
    async fn search(&self, query: &str, top: usize) -> Result<SearchResponse>;

    /// Check if the service is reachable
    async fn health_check(&self) -> bool;

    /// Backend name
    fn name(&self) -> &str;
}
