//! Tavily web search client.

use crate::error::{ResearchError, Result};
use crate::models::Snippet;
use crate::search::{truncate_chars, ContextService};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const TAVILY_URL: &str = "https://api.tavily.com/search";
const MAX_CONTENT_CHARS: usize = 4000;

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'static str,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

impl From<TavilyResult> for Snippet {
    fn from(result: TavilyResult) -> Self {
        Snippet {
            source: "tavily".to_string(),
            title: result.title,
            url: result.url,
            content: truncate_chars(&result.content, MAX_CONTENT_CHARS),
        }
    }
}

/// Web search through the Tavily API.
pub struct TavilySearch {
    api_key: String,
    max_results: usize,
    endpoint: String,
    http_client: reqwest::Client,
}

impl TavilySearch {
    pub fn new(api_key: String, max_results: usize, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ResearchError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            max_results,
            endpoint: TAVILY_URL.to_string(),
            http_client,
        })
    }

    /// Point the client at a different endpoint.
    #[cfg(test)]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl ContextService for TavilySearch {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn search(&self, query: &str) -> Result<Vec<Snippet>> {
        debug!(query, "Tavily search");

        let request = TavilyRequest {
            query,
            max_results: self.max_results,
            search_depth: "basic",
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ResearchError::retrieval(self.name(), e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ResearchError::retrieval(
                self.name(),
                format!("HTTP {}: {}", status, body),
            ));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::retrieval(self.name(), format!("bad response: {}", e)))?;

        Ok(parsed
            .results
            .into_iter()
            .filter(|r| !r.content.trim().is_empty())
            .map(Snippet::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response() {
        let body = r#"{
            "query": "qubits",
            "results": [
                {"title": "Qubit", "url": "https://example.com/qubit", "content": "A qubit is a unit.", "score": 0.9},
                {"title": "Empty", "url": "https://example.com/empty", "content": "  "}
            ]
        }"#;
        let parsed: TavilyResponse = serde_json::from_str(body).unwrap();
        let snippets: Vec<Snippet> = parsed
            .results
            .into_iter()
            .filter(|r| !r.content.trim().is_empty())
            .map(Snippet::from)
            .collect();

        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].source, "tavily");
        assert_eq!(snippets[0].url, "https://example.com/qubit");
    }

    #[test]
    fn test_missing_results_field() {
        let parsed: TavilyResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.results.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_retrieval_error() {
        let search = TavilySearch::new("key".to_string(), 3, Duration::from_secs(2))
            .unwrap()
            .with_endpoint("http://127.0.0.1:9/search");
        let result = search.search("qubits").await;
        assert!(matches!(result, Err(ResearchError::Retrieval { .. })));
    }
}
