//! Context retrieval services.
//!
//! Every interview question is turned into one search query that is sent
//! to each configured [`ContextService`]. Web search goes through Tavily,
//! encyclopedic context through the Wikipedia API.

pub mod tavily;
pub mod wikipedia;

#[cfg(test)]
pub mod mock;

pub use tavily::TavilySearch;
pub use wikipedia::WikipediaSearch;

use crate::config::SearchConfig;
use crate::error::Result;
use crate::models::Snippet;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Opaque search capability.
#[async_trait]
pub trait ContextService: Send + Sync {
    /// Name used in logs, degraded-context notes and snippets.
    fn name(&self) -> &str;

    /// Search for documents relevant to `query`. May return an empty list.
    async fn search(&self, query: &str) -> Result<Vec<Snippet>>;
}

/// Build the context services enabled by configuration.
pub fn build_sources(config: &SearchConfig) -> Result<Vec<Arc<dyn ContextService>>> {
    let timeout = Duration::from_secs(config.timeout_seconds);
    let mut sources: Vec<Arc<dyn ContextService>> = Vec::new();

    match config.tavily_api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        Some(key) => {
            info!("Web search enabled (Tavily, {} results)", config.max_results);
            sources.push(Arc::new(TavilySearch::new(
                key.to_string(),
                config.max_results,
                timeout,
            )?));
        }
        None => warn!("No Tavily API key configured; web search disabled"),
    }

    if config.wikipedia {
        info!(
            "Wikipedia search enabled ({} results)",
            config.wikipedia_results
        );
        sources.push(Arc::new(WikipediaSearch::new(
            config.wikipedia_results,
            timeout,
        )?));
    }

    Ok(sources)
}

/// Shorten text to at most `max_chars` characters on a char boundary.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
