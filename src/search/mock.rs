//! Mock context service for testing.

use crate::error::{ResearchError, Result};
use crate::models::Snippet;
use crate::search::ContextService;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Context service with scripted behaviour.
pub struct MockSearch {
    name: String,
    fail: bool,
    results_per_query: usize,
    calls: AtomicUsize,
}

impl MockSearch {
    /// Returns `results_per_query` snippets for every query.
    pub fn returning(name: &str, results_per_query: usize) -> Self {
        Self {
            name: name.to_string(),
            fail: false,
            results_per_query,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fails every call as if the service were unreachable.
    pub fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail: true,
            results_per_query: 0,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContextService for MockSearch {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, query: &str) -> Result<Vec<Snippet>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ResearchError::retrieval(&self.name, "service unreachable"));
        }

        Ok((1..=self.results_per_query)
            .map(|i| Snippet {
                source: self.name.clone(),
                title: format!("{} result {}", query, i),
                url: format!("https://{}.example.com/{}", self.name, i),
                content: format!("Context about {}", query),
            })
            .collect())
    }
}
