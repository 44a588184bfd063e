//! The research workflow.
//!
//! Persona generation, interviews, section aggregation and report
//! compilation, tied together by [`pipeline::ResearchPipeline`].

pub mod aggregator;
pub mod compiler;
pub mod interview;
pub mod persona;
pub mod pipeline;
pub mod prompts;

pub use pipeline::{PipelineSettings, ResearchPipeline, RunContext};
