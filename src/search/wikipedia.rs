//! Wikipedia search client.
//!
//! Uses the MediaWiki `generator=search` query so that titles and plain
//! text intro extracts come back in one request.

use crate::error::{ResearchError, Result};
use crate::models::Snippet;
use crate::search::{truncate_chars, ContextService};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const WIKIPEDIA_API: &str = "https://en.wikipedia.org/w/api.php";
const MAX_EXTRACT_CHARS: usize = 4000;

/// Encyclopedic context from the Wikipedia API.
pub struct WikipediaSearch {
    max_results: usize,
    endpoint: String,
    http_client: reqwest::Client,
}

impl WikipediaSearch {
    pub fn new(max_results: usize, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("research-analyst/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ResearchError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            max_results,
            endpoint: WIKIPEDIA_API.to_string(),
            http_client,
        })
    }
}

/// Turn a MediaWiki query response into snippets, ordered by search rank.
fn parse_pages(body: &Value) -> Vec<Snippet> {
    let Some(pages) = body["query"]["pages"].as_object() else {
        return Vec::new();
    };

    let mut ranked: Vec<(u64, Snippet)> = pages
        .values()
        .filter_map(|page| {
            let title = page["title"].as_str()?.to_string();
            let extract = page["extract"].as_str().unwrap_or("").trim();
            if extract.is_empty() {
                return None;
            }
            let rank = page["index"].as_u64().unwrap_or(u64::MAX);
            let url = format!(
                "https://en.wikipedia.org/wiki/{}",
                title.replace(' ', "_")
            );
            Some((
                rank,
                Snippet {
                    source: "wikipedia".to_string(),
                    title,
                    url,
                    content: truncate_chars(extract, MAX_EXTRACT_CHARS),
                },
            ))
        })
        .collect();

    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().map(|(_, snippet)| snippet).collect()
}

#[async_trait]
impl ContextService for WikipediaSearch {
    fn name(&self) -> &str {
        "wikipedia"
    }

    async fn search(&self, query: &str) -> Result<Vec<Snippet>> {
        debug!(query, "Wikipedia search");

        let limit = self.max_results.to_string();
        let params = [
            ("action", "query"),
            ("format", "json"),
            ("generator", "search"),
            ("gsrsearch", query),
            ("gsrlimit", limit.as_str()),
            ("prop", "extracts"),
            ("exintro", "1"),
            ("explaintext", "1"),
        ];

        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(|e| ResearchError::retrieval(self.name(), e.to_string()))?;

        if !response.status().is_success() {
            return Err(ResearchError::retrieval(
                self.name(),
                format!("HTTP {}", response.status()),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ResearchError::retrieval(self.name(), format!("bad response: {}", e)))?;

        Ok(parse_pages(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_pages_orders_by_index() {
        let body = json!({
            "query": {
                "pages": {
                    "200": {"pageid": 200, "title": "Quantum supremacy", "index": 2, "extract": "Second."},
                    "100": {"pageid": 100, "title": "Quantum computing", "index": 1, "extract": "First."},
                    "300": {"pageid": 300, "title": "Stub", "index": 3, "extract": ""}
                }
            }
        });

        let snippets = parse_pages(&body);
        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].title, "Quantum computing");
        assert_eq!(
            snippets[0].url,
            "https://en.wikipedia.org/wiki/Quantum_computing"
        );
        assert_eq!(snippets[1].content, "Second.");
    }

    #[test]
    fn test_parse_pages_without_results() {
        assert!(parse_pages(&json!({"batchcomplete": ""})).is_empty());
    }
}
