//! Azure AI Search Backend
//!
//! Queries an Azure AI Search index through its REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::SearchBackend;
use crate::error::{Result, RetrievalError};
use crate::model::{SearchRecord, SearchResponse};

const SCORE_FIELD: &str = "@search.score";

/// Connection settings for an Azure AI Search index
#[derive(Clone, Debug)]
pub struct AzureSearchConfig {
    /// Service endpoint, e.g. `https://invoices.search.windows.net`
    pub endpoint: String,

    /// Query or admin key
    pub api_key: String,

    pub index_name: String,

    /// REST API version
    pub api_version: String,

    pub request_timeout: Duration,
}

impl AzureSearchConfig {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        index_name: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            index_name: index_name.into(),
            api_version: "2023-11-01".into(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Azure AI Search client
pub struct AzureSearchBackend {
    client: reqwest::Client,
    config: AzureSearchConfig,
}

impl AzureSearchBackend {
    pub fn new(config: AzureSearchConfig) -> Result<Self> {
        if config.endpoint.is_empty() || config.api_key.is_empty() || config.index_name.is_empty() {
            return Err(RetrievalError::Config(
                "endpoint, key and index name are all required".into(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &AzureSearchConfig {
        &self.config
    }

    fn search_url(&self) -> String {
        format!(
            "{endpoint}/indexes/{index}/docs/search?api-version={version}",
            endpoint = self.config.endpoint,
            index = self.config.index_name,
            version = self.config.api_version
        )
    }

    fn index_url(&self) -> String {
        format!(
            "{endpoint}/indexes/{index}?api-version={version}",
            endpoint = self.config.endpoint,
            index = self.config.index_name,
            version = self.config.api_version
        )
    }

    fn convert_response(body: ApiSearchResponse) -> SearchResponse {
        let records = body
            .value
            .into_iter()
            .map(|mut fields| {
                let score = fields.remove(SCORE_FIELD).and_then(|s| s.as_f64());
                // Drop the remaining service annotations (@search.highlights etc.)
                fields.retain(|k, _| !k.starts_with("@search."));
                SearchRecord { fields, score }
            })
            .collect();

        SearchResponse {
            records,
            total_count: body.count,
        }
    }
}

fn classify_status(status: StatusCode, body: String) -> RetrievalError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RetrievalError::Auth(body),
        StatusCode::NOT_FOUND => RetrievalError::Config(format!("index not found: {body}")),
        StatusCode::TOO_MANY_REQUESTS => RetrievalError::Unavailable(format!("throttled: {body}")),
        s if s.is_server_error() => RetrievalError::Unavailable(format!("{s}: {body}")),
        s => RetrievalError::Backend(format!("{s}: {body}")),
    }
}

#[async_trait]
impl SearchBackend for AzureSearchBackend {
    async fn search(&self, query: &str, top: usize) -> Result<SearchResponse> {
        let request = ApiSearchRequest {
            search: if query.trim().is_empty() { "*" } else { query },
            top,
            count: true,
        };

        tracing::debug!(index = %self.config.index_name, query, top, "Searching index");

        let response = self
            .client
            .post(self.search_url())
            .header("api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RetrievalError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "Search service returned error");
            return Err(classify_status(status, body));
        }

        let body: ApiSearchResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::InvalidResponse(e.to_string()))?;

        Ok(Self::convert_response(body))
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.index_url())
            .header("api-key", &self.config.api_key)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!("Search health check failed: {e}");
                false
            }
        }
    }

    fn name(&self) -> &str {
        "AzureSearch"
    }
}

#[derive(Serialize)]
struct ApiSearchRequest<'a> {
    search: &'a str,
    top: usize,
    count: bool,
}

#[derive(Deserialize)]
struct ApiSearchResponse {
    #[serde(rename = "@odata.count", default)]
    count: Option<u64>,
    value: Vec<Map<String, Value>>,
}
