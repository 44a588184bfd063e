//! Text generation services.
//!
//! The pipeline talks to the model through [`GenerationService`]; the
//! Ollama chat client is the production implementation.

pub mod ollama;

#[cfg(test)]
pub mod mock;

pub use ollama::{OllamaClient, OllamaConfig};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a generation call is for. Used for logging and by test doubles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationTask {
    Personas,
    Question,
    SearchQuery,
    Answer,
    Section,
    Introduction,
    Conclusion,
}

impl fmt::Display for GenerationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GenerationTask::Personas => "personas",
            GenerationTask::Question => "question",
            GenerationTask::SearchQuery => "search query",
            GenerationTask::Answer => "answer",
            GenerationTask::Section => "section",
            GenerationTask::Introduction => "introduction",
            GenerationTask::Conclusion => "conclusion",
        };
        write!(f, "{}", name)
    }
}

/// Message in the chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A single request to the generation service.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub task: GenerationTask,
    /// System instructions.
    pub system: String,
    /// Conversation that follows the system instructions.
    pub messages: Vec<ChatMessage>,
}

impl GenerationRequest {
    pub fn new(task: GenerationTask, system: impl Into<String>) -> Self {
        Self {
            task,
            system: system.into(),
            messages: Vec::new(),
        }
    }

    pub fn with_user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::user(content));
        self
    }

    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages.extend(messages);
        self
    }
}

/// Opaque text generation capability.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Generate a completion for the request.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Model identifier, for report metadata.
    fn model_name(&self) -> &str;
}

/// Extract the first JSON object from a model reply.
///
/// Models often wrap structured output in prose or a fenced code block;
/// this returns the outermost balanced `{...}` span.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}
