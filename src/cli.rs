//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// Research Analyst - LLM-powered research report generator
///
/// Creates a panel of synthetic analysts for a topic, lets each of them
/// interview an expert grounded in web and Wikipedia search, and compiles
/// the interviews into one report.
///
/// Examples:
///   research-analyst --topic "Quantum Computing"
///   research-analyst --topic "Quantum Computing" --max-analysts 4 --interactive
///   research-analyst --topic "Quantum Computing" --pause run.json
///   research-analyst --resume run.json --feedback "Add a venture capitalist"
///   research-analyst --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Research topic
    #[arg(
        short,
        long,
        value_name = "TOPIC",
        required_unless_present_any = ["resume", "init_config"]
    )]
    pub topic: Option<String>,

    /// Number of analyst personas to create
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub max_analysts: Option<usize>,

    /// Question/answer turns per interview
    #[arg(long, value_name = "TURNS")]
    pub max_turns: Option<usize>,

    /// Feedback on the generated analysts
    ///
    /// Non-empty feedback regenerates the analyst panel exactly once before
    /// the interviews start.
    #[arg(short, long, value_name = "TEXT")]
    pub feedback: Option<String>,

    /// Ask for analyst feedback on stdin after the panel is generated
    #[arg(short, long, conflicts_with_all = ["feedback", "pause", "resume"])]
    pub interactive: bool,

    /// Save the run after analyst generation and exit
    ///
    /// Resume later with --resume, optionally passing --feedback.
    #[arg(long, value_name = "FILE", conflicts_with_all = ["resume", "feedback"])]
    pub pause: Option<PathBuf>,

    /// Resume a run saved with --pause
    #[arg(long, value_name = "FILE")]
    pub resume: Option<PathBuf>,

    /// Ollama model to use
    ///
    /// Can also be set via RESEARCH_MODEL env var or the config file.
    #[arg(short, long, env = "RESEARCH_MODEL")]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Tavily API key for web search
    #[arg(long, env = "TAVILY_API_KEY", hide_env_values = true)]
    pub tavily_api_key: Option<String>,

    /// Do not search Wikipedia
    #[arg(long)]
    pub no_wikipedia: bool,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .research-analyst.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of interviews run at the same time
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Model request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .research-analyst.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref topic) = self.topic {
            if topic.trim().is_empty() {
                return Err("Topic must not be empty".to_string());
            }
        }

        if self.topic.is_some() && self.resume.is_some() {
            return Err("--topic cannot be combined with --resume; the topic comes from the saved run".to_string());
        }

        if let Some(ref url) = self.ollama_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref path) = self.resume {
            if !path.exists() {
                return Err(format!("Saved run does not exist: {}", path.display()));
            }
        }

        Ok(())
    }
}
