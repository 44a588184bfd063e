//! Error types for the research pipeline.
//!
//! The pipeline distinguishes failures that are fatal to a run (persona
//! generation, cancellation) from failures that degrade locally (retrieval,
//! introduction/conclusion synthesis). Components return [`ResearchError`];
//! the binary edge converts into `anyhow::Error`.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, ResearchError>;

/// Errors raised by the research pipeline and its external services.
#[derive(Debug, Error)]
pub enum ResearchError {
    /// The generation service failed or returned unusable output.
    #[error("generation failed: {0}")]
    Generation(String),

    /// A context/search service failed or timed out.
    #[error("retrieval failed ({source_name}): {message}")]
    Retrieval {
        source_name: String,
        message: String,
    },

    /// Input or model output did not satisfy a required shape.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The run was cancelled before it finished.
    #[error("research run cancelled")]
    Cancelled,

    /// A service could not be constructed from configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ResearchError {
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }

    pub fn retrieval(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Retrieval {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether retrying the failed call can help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Generation(_) | Self::Retrieval { .. })
    }
}
