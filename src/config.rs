//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.research-analyst.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".research-analyst.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Research run settings.
    #[serde(default)]
    pub research: ResearchConfig,

    /// Context retrieval settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Retry policy for external calls.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Number of interviews run at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
            concurrency: default_concurrency(),
        }
    }
}

fn default_output() -> String {
    "research_report.md".to_string()
}

fn default_concurrency() -> usize {
    4
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Default model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            ollama_url: default_ollama_url(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.0
}

fn default_timeout() -> u64 {
    300
}

/// Research run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Number of analyst personas to create.
    #[serde(default = "default_max_analysts")]
    pub max_analysts: usize,

    /// Question/answer turns per interview.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_analysts: default_max_analysts(),
            max_turns: default_max_turns(),
        }
    }
}

fn default_max_analysts() -> usize {
    3
}

fn default_max_turns() -> usize {
    2
}

/// Context retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Tavily API key; web search is disabled without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tavily_api_key: Option<String>,

    /// Web results per query.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Query Wikipedia as well.
    #[serde(default = "default_true")]
    pub wikipedia: bool,

    /// Wikipedia pages per query.
    #[serde(default = "default_wikipedia_results")]
    pub wikipedia_results: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_search_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            tavily_api_key: None,
            max_results: default_max_results(),
            wikipedia: true,
            wikipedia_results: default_wikipedia_results(),
            timeout_seconds: default_search_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_results() -> usize {
    3
}

fn default_wikipedia_results() -> usize {
    2
}

fn default_search_timeout() -> u64 {
    20
}

/// Retry settings for generation and retrieval calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first failed attempt.
    #[serde(default = "default_retries")]
    pub max_retries: u32,

    /// Delay before the first retry, doubled for each further retry.
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_retries(),
            base_delay_ms: default_base_delay(),
        }
    }
}

fn default_retries() -> u32 {
    2
}

fn default_base_delay() -> u64 {
    500
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values the user actually supplied override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref url) = args.ollama_url {
            self.model.ollama_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }

        if let Some(max_analysts) = args.max_analysts {
            self.research.max_analysts = max_analysts;
        }
        if let Some(max_turns) = args.max_turns {
            self.research.max_turns = max_turns;
        }

        if let Some(ref key) = args.tavily_api_key {
            self.search.tavily_api_key = Some(key.clone());
        }
        if args.no_wikipedia {
            self.search.wikipedia = false;
        }

        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Log level after merging: `quiet` wins, then `general.verbose`.
    pub fn log_level(&self, quiet: bool) -> tracing::Level {
        if quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Check values that would make a run impossible.
    pub fn validate(&self) -> Result<()> {
        if self.general.concurrency == 0 {
            anyhow::bail!("general.concurrency must be at least 1");
        }
        if !self.model.ollama_url.starts_with("http://")
            && !self.model.ollama_url.starts_with("https://")
        {
            anyhow::bail!("model.ollama_url must start with 'http://' or 'https://'");
        }
        if self.model.timeout_seconds == 0 || self.search.timeout_seconds == 0 {
            anyhow::bail!("timeouts must be at least 1 second");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
