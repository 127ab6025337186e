//! Tavily search API client.

use async_trait::async_trait;
use edupolicy_core::backend::{WebResult, WebSearchBackend};
use edupolicy_core::error::ToolError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

#[derive(Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<WebResult>,
}

pub struct TavilyClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl TavilyClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ToolError::BackendUnavailable(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }
}

#[async_trait]
impl WebSearchBackend for TavilyClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>, ToolError> {
        let url = format!("{}/search", self.base_url);
        debug!(url = %url, query, max_results, "Tavily search");

        let response = self
            .client
            .post(&url)
            .json(&SearchRequest { api_key: &self.api_key, query, max_results })
            .send()
            .await
            .map_err(|e| ToolError::BackendUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Tavily returned error");
            return Err(ToolError::BackendUnavailable(format!("HTTP {status}: {body}")));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::BackendUnavailable(format!("invalid Tavily response: {e}")))?;
        Ok(parsed.results)
    }
}
