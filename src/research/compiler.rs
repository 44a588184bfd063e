//! Final report compilation.
//!
//! Synthesizes an introduction and a conclusion over all sections and
//! assembles them around the section body. Compilation never fails:
//! synthesis errors fall back to fixed placeholders.

use crate::llm::{GenerationRequest, GenerationService, GenerationTask};
use crate::models::{CompiledReport, Section};
use crate::research::prompts::{fill, CONCLUSION_SYSTEM_PROMPT, INTRODUCTION_SYSTEM_PROMPT};
use crate::retry::RetryPolicy;
use std::sync::Arc;
use tracing::{info, warn};

pub const INTRODUCTION_UNAVAILABLE: &str = "Introduction unavailable";
pub const CONCLUSION_UNAVAILABLE: &str = "Conclusion unavailable";

const CONTENT_HEADER: &str = "## Insights";
const NO_SECTIONS: &str = "No sections were produced for this report.";
const PART_SEPARATOR: &str = "\n\n---\n\n";

/// Writes the introduction and conclusion and assembles the final report.
pub struct ReportCompiler {
    generator: Arc<dyn GenerationService>,
    retry: RetryPolicy,
}

impl ReportCompiler {
    pub fn new(generator: Arc<dyn GenerationService>, retry: RetryPolicy) -> Self {
        Self { generator, retry }
    }

    pub async fn compile(&self, topic: &str, sections: &[Section]) -> CompiledReport {
        let content = compose_content(sections);

        if sections.is_empty() {
            warn!("No sections to compile; using placeholders");
            return assemble(
                INTRODUCTION_UNAVAILABLE.to_string(),
                content,
                CONCLUSION_UNAVAILABLE.to_string(),
            );
        }

        info!(sections = sections.len(), "Compiling final report");

        let body = sections
            .iter()
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let (introduction, conclusion) = futures::join!(
            self.synthesize(
                GenerationTask::Introduction,
                INTRODUCTION_SYSTEM_PROMPT,
                topic,
                &body,
                INTRODUCTION_UNAVAILABLE,
            ),
            self.synthesize(
                GenerationTask::Conclusion,
                CONCLUSION_SYSTEM_PROMPT,
                topic,
                &body,
                CONCLUSION_UNAVAILABLE,
            ),
        );

        assemble(introduction, content, conclusion)
    }

    async fn synthesize(
        &self,
        task: GenerationTask,
        template: &str,
        topic: &str,
        body: &str,
        placeholder: &str,
    ) -> String {
        let request = GenerationRequest::new(task, fill(template, "topic", topic))
            .with_user(format!("Here are the sections:\n\n{}", body));

        match self
            .retry
            .run(&format!("{} writing", task), || {
                self.generator.generate(&request)
            })
            .await
        {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!("{} came back empty; using placeholder", task);
                placeholder.to_string()
            }
            Err(e) => {
                warn!("{} synthesis failed: {}", task, e);
                placeholder.to_string()
            }
        }
    }
}

/// Report body: a fixed header followed by every section in order.
pub fn compose_content(sections: &[Section]) -> String {
    if sections.is_empty() {
        return format!("{}\n\n{}", CONTENT_HEADER, NO_SECTIONS);
    }

    let body = sections
        .iter()
        .map(|s| s.content.trim())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{}\n\n{}", CONTENT_HEADER, body)
}

/// Join the three report parts.
pub fn assemble(introduction: String, content: String, conclusion: String) -> CompiledReport {
    let final_report = [introduction.as_str(), content.as_str(), conclusion.as_str()]
        .join(PART_SEPARATOR);
    CompiledReport {
        introduction,
        content,
        conclusion,
        final_report,
    }
}
