//! Research Analyst - LLM-powered research report generator
//!
//! A CLI tool that builds a panel of synthetic analysts for a topic,
//! runs one grounded expert interview per analyst, and compiles the
//! interviews into a single report.
//!
//! Exit codes:
//!   0 - Success (report written, or run paused for feedback)
//!   1 - Runtime error (generation failure, config, I/O, etc.)
//!   130 - Interrupted with Ctrl-C

mod checkpoint;
mod cli;
mod config;
mod error;
mod llm;
mod models;
mod report;
mod research;
mod retry;
mod search;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use error::ResearchError;
use llm::{GenerationService, OllamaClient, OllamaConfig};
use models::{Analyst, ReportMetadata, ResearchGraphState, ResearchReport};
use research::{PipelineSettings, ResearchPipeline, RunContext};
use retry::RetryPolicy;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so the file can set verbosity
    let (mut config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(config.log_level(args.quiet));

    info!("Research Analyst v{}", env!("CARGO_PKG_VERSION"));
    config_source.log();
    debug!("Arguments: {:?}", args);

    match run_research(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) if is_cancelled(&e) => {
            warn!("Run cancelled");
            eprintln!("\n⛔ Interrupted. No report was written.");
            std::process::exit(EXIT_INTERRUPTED);
        }
        Err(e) => {
            error!("Research run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .research-analyst.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the model, search services, and retries.");
    Ok(())
}

/// Initialize logging at `level`.
///
/// `RUST_LOG` takes precedence over the configured level when set.
fn init_logging(level: tracing::Level) {
    let level = LevelFilter::from_level(level);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

fn is_cancelled(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<ResearchError>(),
        Some(ResearchError::Cancelled)
    )
}

/// Run the complete research workflow. Returns the exit code.
async fn run_research(args: Args, config: Config) -> Result<i32> {
    config.validate()?;

    // Services
    let generator: Arc<dyn GenerationService> =
        Arc::new(OllamaClient::new(OllamaConfig::from(&config.model))?);
    let sources = search::build_sources(&config.search)?;

    println!("🤖 Initializing research pipeline...");
    println!("   Model: {}", config.model.name);
    println!("   Ollama: {}", config.model.ollama_url);
    if sources.is_empty() {
        println!("   Search: none (answers will not be grounded)");
    } else {
        let names: Vec<_> = sources.iter().map(|s| s.name()).collect();
        println!("   Search: {}", names.join(", "));
    }
    println!(
        "   Interviews: {} turns, {} at a time",
        config.research.max_turns, config.general.concurrency
    );

    let pipeline = ResearchPipeline::new(
        generator,
        sources,
        RetryPolicy::from(&config.retry),
        Duration::from_secs(config.search.timeout_seconds),
        PipelineSettings {
            max_turns: config.research.max_turns,
            concurrency: config.general.concurrency,
        },
    );

    let ctx = if args.quiet {
        RunContext::new()
    } else {
        RunContext::new().with_progress()
    };

    // Ctrl-C cancels the whole run
    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; cancelling run");
            cancel.cancel();
        }
    });

    // Step 1: Analysts, fresh or from a saved run
    let (mut state, feedback) = match args.resume {
        Some(ref path) => {
            let state = checkpoint::load(path)?;
            println!("\n📂 Resuming saved run: {}", state.topic);
            print_panel(&state.analysts);
            (state, args.feedback.clone())
        }
        None => {
            let topic = args
                .topic
                .as_deref()
                .context("A research topic is required")?;

            println!("\n🧑‍🔬 Creating analysts for: {}", topic);
            let state = pipeline
                .create_analysts(topic, config.research.max_analysts, &ctx)
                .await?;
            print_panel(&state.analysts);

            if let Some(ref path) = args.pause {
                checkpoint::save(path, &state)?;
                println!("\n⏸️  Run saved to {}", path.display());
                println!(
                    "   Resume with: research-analyst --resume {} [--feedback \"...\"]",
                    path.display()
                );
                return Ok(0);
            }

            let feedback = if args.interactive {
                prompt_feedback().await?
            } else {
                args.feedback.clone()
            };
            (state, feedback)
        }
    };

    // Step 2: Interviews and report
    println!("\n🎙️  Interviewing {} analysts...", state.analysts.len());
    pipeline
        .continue_run(&mut state, feedback.as_deref(), &ctx)
        .await?;

    // Step 3: Save the report
    println!("\n📝 Writing report...");
    let output = output_path(&args, &config);
    let report = build_report(&state, pipeline.model_name(), ctx.elapsed_seconds());
    report::write_report(&report, args.format, &output)?;

    println!("\n📊 Research Summary:");
    println!("   Analysts: {}", report.metadata.analysts);
    println!("   Sections: {}", report.metadata.sections);
    println!("   Duration: {:.1}s", report.metadata.duration_seconds);
    println!("\n✅ Research complete! Report saved to: {}", output.display());

    Ok(0)
}

/// Where the configuration came from, logged once logging is up.
enum ConfigSource {
    Explicit(PathBuf),
    DefaultFile,
    Defaults,
    Unreadable(String),
}

impl ConfigSource {
    fn log(&self) {
        match self {
            ConfigSource::Explicit(path) => info!("Loaded config from: {}", path.display()),
            ConfigSource::DefaultFile => info!("Loaded default config from {}", CONFIG_FILE_NAME),
            ConfigSource::Defaults => debug!("No config file found, using defaults"),
            ConfigSource::Unreadable(e) => warn!("Failed to load config: {}", e),
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::Explicit(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::DefaultFile)),
        Ok(None) => Ok((Config::default(), ConfigSource::Defaults)),
        Err(e) => Ok((Config::default(), ConfigSource::Unreadable(format!("{:#}", e)))),
    }
}

/// Ask for analyst feedback on stdin. An empty line keeps the panel.
async fn prompt_feedback() -> Result<Option<String>> {
    println!("\n💬 Feedback on these analysts? (press Enter to keep them)");
    let line = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| line)
    })
    .await
    .context("Feedback prompt failed")?
    .context("Failed to read feedback from stdin")?;

    let feedback = line.trim();
    Ok((!feedback.is_empty()).then(|| feedback.to_string()))
}

fn print_panel(analysts: &[Analyst]) {
    for analyst in analysts {
        println!(
            "   • {} ({}, {}) - {}",
            analyst.name, analyst.role, analyst.affiliation, analyst.description
        );
    }
}

/// Report path, switching the default extension for JSON output.
fn output_path(args: &Args, config: &Config) -> PathBuf {
    let path = PathBuf::from(&config.general.output);
    if args.output.is_none() && args.format == OutputFormat::Json {
        path.with_extension("json")
    } else {
        path
    }
}

fn build_report(state: &ResearchGraphState, model: &str, duration_seconds: f64) -> ResearchReport {
    ResearchReport {
        metadata: ReportMetadata {
            topic: state.topic.clone(),
            generated_at: Utc::now(),
            model_used: model.to_string(),
            analysts: state.analysts.len(),
            sections: state.sections.len(),
            duration_seconds,
        },
        analysts: state.analysts.clone(),
        sections: state.sections.as_slice().to_vec(),
        report: state.report(),
    }
}
