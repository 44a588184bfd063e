//! Ollama chat API client.

use crate::error::{ResearchError, Result};
use crate::llm::{ChatMessage, GenerationRequest, GenerationService};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Configuration for the Ollama client.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub ollama_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2:latest".to_string(),
            temperature: 0.0,
            timeout_seconds: 300,
        }
    }
}

impl From<&crate::config::ModelConfig> for OllamaConfig {
    fn from(config: &crate::config::ModelConfig) -> Self {
        Self {
            ollama_url: config.ollama_url.clone(),
            model_name: config.name.clone(),
            temperature: config.temperature,
            timeout_seconds: config.timeout_seconds,
        }
    }
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Generation service backed by a local or remote Ollama server.
pub struct OllamaClient {
    config: OllamaConfig,
    http_client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ResearchError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.config.ollama_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl GenerationService for OllamaClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(ChatMessage::system(request.system.clone()));
        messages.extend(request.messages.iter().cloned());

        let body = OllamaChatRequest {
            model: &self.config.model_name,
            messages,
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        };

        debug!(
            task = %request.task,
            messages = body.messages.len(),
            "Sending chat request"
        );

        let response = self
            .http_client
            .post(self.chat_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ResearchError::generation(format!(
                        "Request timed out after {}s",
                        self.config.timeout_seconds
                    ))
                } else if e.is_connect() {
                    ResearchError::generation(format!(
                        "Cannot connect to Ollama at {}. Is Ollama running?",
                        self.config.ollama_url
                    ))
                } else {
                    ResearchError::generation(format!("Failed to send request: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ResearchError::generation(format!(
                "Ollama API error {}: {}",
                status, body
            )));
        }

        let chat_response: OllamaChatResponse = response.json().await.map_err(|e| {
            ResearchError::generation(format!("Failed to parse Ollama response: {}", e))
        })?;

        let content = chat_response.message.content.trim().to_string();
        if content.is_empty() {
            return Err(ResearchError::generation(format!(
                "Empty {} response from model",
                request.task
            )));
        }

        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}
