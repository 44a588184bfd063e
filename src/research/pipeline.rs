//! Research run orchestration.
//!
//! ```text
//! create_analysts -> (human feedback) -> conduct_interviews -> write_report
//! ```
//!
//! Interviews fan out over the analyst panel and join back at a single
//! point where their sections are merged in arrival order.

use crate::error::{ResearchError, Result};
use crate::llm::GenerationService;
use crate::models::{ResearchGraphState, RunStage};
use crate::research::aggregator::merge_into;
use crate::research::compiler::ReportCompiler;
use crate::research::interview::InterviewRunner;
use crate::research::persona::PersonaGenerator;
use crate::retry::RetryPolicy;
use crate::search::ContextService;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Run-scoped cancellation and timing, passed by reference through a run.
#[derive(Clone)]
pub struct RunContext {
    pub cancel: CancellationToken,
    pub started: Instant,
    pub progress: Option<ProgressBar>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            started: Instant::now(),
            progress: None,
        }
    }

    /// Show an interview progress bar on the terminal.
    pub fn with_progress(mut self) -> Self {
        let pb = ProgressBar::new(0);
        match ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} interviews",
        ) {
            Ok(style) => pb.set_style(style.progress_chars("#>-")),
            Err(e) => debug!("Invalid progress template: {}", e),
        }
        self.progress = Some(pb);
        self
    }

    /// Remove the progress bar from the terminal.
    pub fn clear_progress(&self) {
        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Await `fut` unless the run is cancelled first.
    async fn guard<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ResearchError::Cancelled),
            result = fut => result,
        }
    }
}

/// Tunables for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Answered questions per interview.
    pub max_turns: usize,
    /// Interviews running at the same time.
    pub concurrency: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_turns: 2,
            concurrency: 4,
        }
    }
}

/// The research workflow: personas, interviews, report.
pub struct ResearchPipeline {
    personas: PersonaGenerator,
    interviewer: InterviewRunner,
    compiler: ReportCompiler,
    settings: PipelineSettings,
    model: String,
}

impl ResearchPipeline {
    pub fn new(
        generator: Arc<dyn GenerationService>,
        sources: Vec<Arc<dyn ContextService>>,
        retry: RetryPolicy,
        search_timeout: Duration,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            model: generator.model_name().to_string(),
            personas: PersonaGenerator::new(generator.clone(), retry),
            interviewer: InterviewRunner::new(generator.clone(), sources, retry, search_timeout),
            compiler: ReportCompiler::new(generator, retry),
            settings,
        }
    }

    /// Name of the model behind the generation service.
    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Generate the analyst panel. The returned run waits for feedback.
    pub async fn create_analysts(
        &self,
        topic: &str,
        max_analysts: usize,
        ctx: &RunContext,
    ) -> Result<ResearchGraphState> {
        let mut state = ResearchGraphState::new(topic.trim(), max_analysts);
        let mut analysts = state.analysts_state();

        ctx.guard(self.personas.create(&mut analysts)).await?;

        state.absorb_analysts(analysts);
        state.stage = RunStage::AwaitingFeedback;
        info!(
            analysts = state.analysts.len(),
            stage = %state.stage,
            "Analyst panel ready"
        );
        Ok(state)
    }

    /// Continue past the feedback checkpoint.
    ///
    /// Empty or missing feedback keeps the panel. Non-empty feedback
    /// regenerates it once, after which the run proceeds regardless of
    /// further feedback.
    pub async fn resume(
        &self,
        state: &mut ResearchGraphState,
        feedback: Option<&str>,
        ctx: &RunContext,
    ) -> Result<()> {
        if state.stage == RunStage::Compiled {
            return Err(ResearchError::validation(
                "run is already compiled; start a new run instead",
            ));
        }
        check_panel(state)?;

        if state.stage == RunStage::Interviewing {
            debug!("Run already past the feedback checkpoint");
            return Ok(());
        }

        let mut analysts = state.analysts_state();
        if let Some(feedback) = feedback {
            let regenerated = ctx
                .guard(self.personas.apply_feedback(&mut analysts, feedback))
                .await?;
            if regenerated {
                info!(analysts = analysts.analysts.len(), "Analyst panel regenerated from feedback");
            }
        }

        state.absorb_analysts(analysts);
        state.stage = RunStage::Interviewing;
        Ok(())
    }

    /// Interview every analyst and merge the resulting sections.
    ///
    /// Returns the number of completed interviews. A failed interview is
    /// logged and skipped; cancellation aborts the whole fan-out.
    pub async fn conduct_interviews(
        &self,
        state: &mut ResearchGraphState,
        ctx: &RunContext,
    ) -> Result<usize> {
        if state.stage != RunStage::Interviewing {
            return Err(ResearchError::validation(format!(
                "cannot interview while the run is {}",
                state.stage
            )));
        }

        let total = state.analysts.len();
        let concurrency = self.settings.concurrency.max(1);
        info!(interviews = total, concurrency, "Starting interviews");

        if let Some(pb) = &ctx.progress {
            pb.set_length(total as u64);
            pb.set_position(0);
        }

        let topic = state.topic.clone();
        let analysts = state.analysts.clone();
        let interviews = analysts.into_iter().map(|analyst| {
            let topic = topic.as_str();
            async move {
                let name = analyst.name.clone();
                let outcome = self
                    .interviewer
                    .run_interview(analyst, topic, self.settings.max_turns, &ctx.cancel)
                    .await;
                (name, outcome)
            }
        });
        let mut pending = stream::iter(interviews).buffer_unordered(concurrency);

        let mut completed = 0;
        loop {
            let next = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => {
                    warn!("Run cancelled during interviews");
                    ctx.clear_progress();
                    return Err(ResearchError::Cancelled);
                }
                next = pending.next() => next,
            };

            let (name, outcome) = match next {
                Some(done) => done,
                None => break,
            };

            match outcome {
                Ok(section) => {
                    debug!(analyst = %name, title = %section.title, "Section received");
                    merge_into(&mut state.sections, vec![section]);
                    completed += 1;
                }
                Err(ResearchError::Cancelled) => {
                    ctx.clear_progress();
                    return Err(ResearchError::Cancelled);
                }
                Err(e) => warn!(analyst = %name, "Interview failed: {}", e),
            }

            if let Some(pb) = &ctx.progress {
                pb.inc(1);
            }
        }

        ctx.clear_progress();

        info!(completed, total, "Interviews finished");
        Ok(completed)
    }

    /// Compile the final report from the aggregated sections.
    pub async fn write_report(&self, state: &mut ResearchGraphState, ctx: &RunContext) -> Result<()> {
        let compiled = ctx
            .guard(async {
                Ok(self
                    .compiler
                    .compile(&state.topic, state.sections.as_slice())
                    .await)
            })
            .await?;

        state.set_report(compiled);
        info!(
            sections = state.sections.len(),
            elapsed = ctx.elapsed_seconds(),
            "Report compiled"
        );
        Ok(())
    }

    /// Everything after the feedback checkpoint.
    pub async fn continue_run(
        &self,
        state: &mut ResearchGraphState,
        feedback: Option<&str>,
        ctx: &RunContext,
    ) -> Result<()> {
        self.resume(state, feedback, ctx).await?;
        self.conduct_interviews(state, ctx).await?;
        self.write_report(state, ctx).await
    }

    /// A complete run from topic to compiled report.
    pub async fn run(
        &self,
        topic: &str,
        max_analysts: usize,
        feedback: Option<&str>,
        ctx: &RunContext,
    ) -> Result<ResearchGraphState> {
        let mut state = self.create_analysts(topic, max_analysts, ctx).await?;
        self.continue_run(&mut state, feedback, ctx).await?;
        Ok(state)
    }
}

/// A run needs between 1 and `max_analysts` analysts to continue.
fn check_panel(state: &ResearchGraphState) -> Result<()> {
    if state.analysts.is_empty() {
        return Err(ResearchError::validation(
            "run has no analysts; generate a panel first",
        ));
    }
    if state.analysts.len() > state.max_analysts {
        return Err(ResearchError::validation(format!(
            "run has {} analysts but at most {} are allowed",
            state.analysts.len(),
            state.max_analysts
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::{personas_json, sample_analyst, MockConfig, MockGenerator};
    use crate::llm::GenerationTask;
    use crate::search::mock::MockSearch;

    fn pipeline(
        generator: Arc<MockGenerator>,
        sources: Vec<Arc<dyn ContextService>>,
        concurrency: usize,
    ) -> ResearchPipeline {
        ResearchPipeline::new(
            generator,
            sources,
            RetryPolicy {
                max_retries: 2,
                base_delay: Duration::from_millis(1),
            },
            Duration::from_secs(5),
            PipelineSettings {
                max_turns: 2,
                concurrency,
            },
        )
    }

    #[tokio::test]
    async fn test_full_run_compiles_every_section() {
        let generator = Arc::new(MockGenerator::with_analysts(3));
        let search = Arc::new(MockSearch::returning("web", 2));
        let pipeline = pipeline(generator.clone(), vec![search], 3);

        let state = pipeline
            .run("Quantum Computing", 3, None, &RunContext::new())
            .await
            .unwrap();

        assert_eq!(state.stage, RunStage::Compiled);
        assert_eq!(state.analysts.len(), 3);
        assert_eq!(state.sections.len(), 3);

        let report = &state.final_report;
        let intro = report.find("## Introduction").unwrap();
        let conclusion = report.find("## Conclusion").unwrap();
        for section in state.sections.iter() {
            let heading = section.content.lines().next().unwrap();
            let at = report.find(heading).unwrap();
            assert!(intro < at && at < conclusion, "{} out of place", heading);
        }
        assert_eq!(generator.calls(GenerationTask::Introduction), 1);
    }

    #[tokio::test]
    async fn test_failing_context_service_still_completes() {
        let generator = Arc::new(MockGenerator::with_analysts(2));
        let search = Arc::new(MockSearch::failing("web"));
        let pipeline = pipeline(generator, vec![search.clone()], 2);

        let state = pipeline
            .run("Quantum Computing", 2, None, &RunContext::new())
            .await
            .unwrap();

        assert_eq!(state.sections.len(), 2);
        assert!(!state.final_report.is_empty());
        // 2 interviews x 2 turns x 3 attempts
        assert_eq!(search.calls(), 12);
    }

    #[tokio::test]
    async fn test_zero_analysts_fails_without_interviews() {
        let generator = Arc::new(MockGenerator::with_analysts(3));
        let pipeline = pipeline(generator.clone(), Vec::new(), 2);

        let result = pipeline
            .run("Quantum Computing", 0, None, &RunContext::new())
            .await;

        assert!(matches!(result, Err(ResearchError::Generation(_))));
        assert_eq!(generator.calls(GenerationTask::Personas), 0);
        assert_eq!(generator.calls(GenerationTask::Question), 0);
    }

    #[tokio::test]
    async fn test_section_count_matches_completed_interviews() {
        let generator = Arc::new(MockGenerator::with_analysts(4));
        let search = Arc::new(MockSearch::returning("web", 1));
        let pipeline = pipeline(generator.clone(), vec![search], 2);
        let ctx = RunContext::new();

        let mut state = pipeline.create_analysts("Quantum Computing", 4, &ctx).await.unwrap();
        assert_eq!(state.stage, RunStage::AwaitingFeedback);

        pipeline.resume(&mut state, None, &ctx).await.unwrap();
        let completed = pipeline.conduct_interviews(&mut state, &ctx).await.unwrap();

        assert_eq!(completed, 4);
        assert_eq!(state.sections.len(), completed);
        assert_eq!(generator.calls(GenerationTask::Section), completed);
    }

    #[tokio::test]
    async fn test_feedback_regenerates_panel_before_interviews() {
        let generator = Arc::new(MockGenerator::new(MockConfig {
            personas_reply: personas_json(3),
            feedback_personas_reply: Some(personas_json(2)),
            ..Default::default()
        }));
        let pipeline = pipeline(generator.clone(), Vec::new(), 2);

        let state = pipeline
            .run("Quantum Computing", 3, Some("Only two analysts"), &RunContext::new())
            .await
            .unwrap();

        assert!(state.feedback_applied);
        assert_eq!(state.human_analyst_feedback, "Only two analysts");
        assert_eq!(state.analysts.len(), 2);
        assert_eq!(state.sections.len(), 2);
        assert_eq!(generator.calls(GenerationTask::Personas), 2);
    }

    #[tokio::test]
    async fn test_cancellation_aborts_run() {
        let generator = Arc::new(MockGenerator::new(MockConfig {
            latency: Duration::from_millis(20),
            ..Default::default()
        }));
        let search = Arc::new(MockSearch::returning("web", 1));
        let pipeline = pipeline(generator, vec![search], 2);
        let ctx = RunContext::new();

        let cancel = ctx.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        let result = pipeline.run("Quantum Computing", 3, None, &ctx).await;
        assert!(matches!(result, Err(ResearchError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let generator = Arc::new(MockGenerator::with_analysts(3));
        let pipeline = pipeline(generator.clone(), Vec::new(), 2);
        let ctx = RunContext::new();
        ctx.cancel.cancel();

        let result = pipeline.run("Quantum Computing", 3, None, &ctx).await;
        assert!(matches!(result, Err(ResearchError::Cancelled)));
    }

    #[tokio::test]
    async fn test_compiled_run_cannot_resume() {
        let generator = Arc::new(MockGenerator::with_analysts(1));
        let pipeline = pipeline(generator, Vec::new(), 1);
        let ctx = RunContext::new();

        let mut state = pipeline
            .run("Quantum Computing", 1, None, &ctx)
            .await
            .unwrap();
        let result = pipeline.resume(&mut state, Some("more"), &ctx).await;
        assert!(matches!(result, Err(ResearchError::Validation(_))));
    }

    #[tokio::test]
    async fn test_interviews_require_feedback_checkpoint() {
        let generator = Arc::new(MockGenerator::with_analysts(1));
        let pipeline = pipeline(generator, Vec::new(), 1);
        let ctx = RunContext::new();

        let mut state = pipeline.create_analysts("Quantum Computing", 1, &ctx).await.unwrap();
        let result = pipeline.conduct_interviews(&mut state, &ctx).await;
        assert!(matches!(result, Err(ResearchError::Validation(_))));
    }

    #[tokio::test]
    async fn test_resume_rejects_empty_panel() {
        let generator = Arc::new(MockGenerator::with_analysts(2));
        let pipeline = pipeline(generator.clone(), Vec::new(), 2);
        let mut state = ResearchGraphState::new("Fusion", 2);

        let result = pipeline
            .continue_run(&mut state, None, &RunContext::new())
            .await;

        assert!(matches!(result, Err(ResearchError::Validation(_))));
        assert_eq!(state.stage, RunStage::AwaitingFeedback);
        assert!(state.final_report.is_empty());
        assert_eq!(generator.calls(GenerationTask::Question), 0);
    }

    #[tokio::test]
    async fn test_resume_rejects_oversized_panel() {
        let generator = Arc::new(MockGenerator::with_analysts(2));
        let pipeline = pipeline(generator.clone(), Vec::new(), 2);
        let mut state = ResearchGraphState::new("Fusion", 1);
        state.analysts = vec![sample_analyst(1), sample_analyst(2)];

        let result = pipeline
            .continue_run(&mut state, None, &RunContext::new())
            .await;
        assert!(matches!(result, Err(ResearchError::Validation(_))));
        assert!(state.sections.is_empty());

        state.stage = RunStage::Interviewing;
        let result = pipeline.resume(&mut state, None, &RunContext::new()).await;
        assert!(matches!(result, Err(ResearchError::Validation(_))));
        assert_eq!(generator.calls(GenerationTask::Question), 0);
    }

    #[tokio::test]
    async fn test_sections_merge_in_completion_order() {
        let generator = Arc::new(MockGenerator::new(MockConfig {
            slow_marker: Some(("Focus area 1".to_string(), Duration::from_millis(40))),
            ..Default::default()
        }));
        let pipeline = pipeline(generator, Vec::new(), 3);

        let state = pipeline
            .run("Quantum Computing", 3, None, &RunContext::new())
            .await
            .unwrap();

        let titles: Vec<_> = state.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles.len(), 3);
        assert_eq!(titles[2], "Role 1");
        assert!(titles[..2].contains(&"Role 2"));
        assert!(titles[..2].contains(&"Role 3"));
    }

    #[tokio::test]
    async fn test_cancellation_clears_progress_bar() {
        let generator = Arc::new(MockGenerator::with_analysts(2));
        let pipeline = pipeline(generator, Vec::new(), 2);
        let mut ctx = RunContext::new();
        ctx.progress = Some(ProgressBar::hidden());

        let mut state = ResearchGraphState::new("Quantum Computing", 2);
        state.analysts = vec![sample_analyst(1), sample_analyst(2)];
        state.stage = RunStage::Interviewing;
        ctx.cancel.cancel();

        let result = pipeline.conduct_interviews(&mut state, &ctx).await;
        assert!(matches!(result, Err(ResearchError::Cancelled)));
        assert!(ctx.progress.as_ref().unwrap().is_finished());
    }
}
