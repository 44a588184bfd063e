//! Mock generation service for testing.
//!
//! Produces deterministic replies per [`GenerationTask`] and records every
//! call so tests can assert on what the pipeline asked for.

use crate::error::{ResearchError, Result};
use crate::llm::{GenerationRequest, GenerationService, GenerationTask};
use crate::models::Analyst;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

/// Build a test analyst with a distinct name and role.
pub fn sample_analyst(index: usize) -> Analyst {
    Analyst {
        affiliation: format!("Lab {}", index),
        name: format!("Analyst {}", index),
        role: format!("Role {}", index),
        description: format!("Focus area {}", index),
    }
}

/// Persona-service JSON for `count` analysts.
pub fn personas_json(count: usize) -> String {
    let analysts: Vec<Analyst> = (1..=count).map(sample_analyst).collect();
    serde_json::json!({ "analysts": analysts }).to_string()
}

/// Configuration for mock behaviour.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Raw reply for persona requests.
    pub personas_reply: String,
    /// Reply for persona requests whose prompt carries feedback.
    pub feedback_personas_reply: Option<String>,
    /// Ask the termination question once this many questions were asked
    /// in the same conversation.
    pub thank_after: Option<usize>,
    /// Tasks that always fail.
    pub failing: HashSet<GenerationTask>,
    /// Artificial latency per call.
    pub latency: Duration,
    /// Extra latency for calls whose prompt mentions the given text.
    pub slow_marker: Option<(String, Duration)>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            personas_reply: personas_json(3),
            feedback_personas_reply: None,
            thank_after: None,
            failing: HashSet::new(),
            latency: Duration::ZERO,
            slow_marker: None,
        }
    }
}

/// Deterministic generation service.
pub struct MockGenerator {
    config: MockConfig,
    log: CallLog,
}

impl MockGenerator {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            log: CallLog::default(),
        }
    }

    pub fn with_analysts(count: usize) -> Self {
        Self::new(MockConfig {
            personas_reply: personas_json(count),
            ..Default::default()
        })
    }

    /// Number of calls made for a task, failed ones included.
    pub fn calls(&self, task: GenerationTask) -> usize {
        self.log.count(task)
    }

    fn extra_latency(&self, request: &GenerationRequest) -> Duration {
        match &self.config.slow_marker {
            Some((marker, delay))
                if request.system.contains(marker.as_str())
                    || request.messages.iter().any(|m| m.content.contains(marker.as_str())) =>
            {
                *delay
            }
            _ => Duration::ZERO,
        }
    }

    fn reply(&self, request: &GenerationRequest, call_index: usize) -> Result<String> {
        if self.config.failing.contains(&request.task) {
            return Err(ResearchError::generation(format!(
                "mock {} failure",
                request.task
            )));
        }

        let reply = match request.task {
            GenerationTask::Personas => {
                let has_feedback = request
                    .messages
                    .iter()
                    .any(|m| m.content.contains("Editorial feedback:"));
                match (&self.config.feedback_personas_reply, has_feedback) {
                    (Some(reply), true) => reply.clone(),
                    _ => self.config.personas_reply.clone(),
                }
            }
            GenerationTask::Question => {
                let asked = request
                    .messages
                    .iter()
                    .filter(|m| m.role == "assistant")
                    .count();
                match self.config.thank_after {
                    Some(limit) if asked >= limit => {
                        "Thank you so much for your help!".to_string()
                    }
                    _ => format!("Question {}: what matters most here?", asked + 1),
                }
            }
            GenerationTask::SearchQuery => {
                r#"{"search_query": "mock search terms"}"#.to_string()
            }
            GenerationTask::Answer => format!("Expert answer {}", call_index),
            GenerationTask::Section => format!(
                "## Section {}\n\n### Summary\n\nFindings {}.\n\n### Sources\n[1] https://example.com/{}",
                call_index, call_index, call_index
            ),
            GenerationTask::Introduction => "# Report\n\n## Introduction\n\nIntro.".to_string(),
            GenerationTask::Conclusion => "## Conclusion\n\nDone.".to_string(),
        };

        Ok(reply)
    }
}

#[async_trait]
impl GenerationService for MockGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let call_index = self.log.record(request.task);
        let delay = self.config.latency + self.extra_latency(request);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.reply(request, call_index)
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Thread-safe record of generation calls.
#[derive(Default)]
struct CallLog {
    calls: Mutex<Vec<GenerationTask>>,
}

impl CallLog {
    /// Record a call and return its 1-based index among calls of that task.
    fn record(&self, task: GenerationTask) -> usize {
        let mut calls = self.calls.lock().unwrap();
        calls.push(task);
        calls.iter().filter(|t| **t == task).count()
    }

    fn count(&self, task: GenerationTask) -> usize {
        self.calls.lock().unwrap().iter().filter(|t| **t == task).count()
    }
}
