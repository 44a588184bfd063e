//! Analyst persona generation.
//!
//! Produces at most `max_analysts` distinct personas for a topic and
//! supports exactly one feedback-driven regeneration.

use crate::error::{ResearchError, Result};
use crate::llm::{extract_json_object, GenerationRequest, GenerationService, GenerationTask};
use crate::models::{Analyst, GenerateAnalystsState, Perspectives};
use crate::research::prompts::PERSONAS_SYSTEM_PROMPT;
use crate::retry::RetryPolicy;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Creates analyst personas through the generation service.
pub struct PersonaGenerator {
    generator: Arc<dyn GenerationService>,
    retry: RetryPolicy,
}

impl PersonaGenerator {
    pub fn new(generator: Arc<dyn GenerationService>, retry: RetryPolicy) -> Self {
        Self { generator, retry }
    }

    /// Generate between 1 and `max_analysts` distinct personas.
    pub async fn generate(
        &self,
        topic: &str,
        max_analysts: usize,
        feedback: Option<&str>,
    ) -> Result<Vec<Analyst>> {
        if topic.trim().is_empty() {
            return Err(ResearchError::validation("research topic must not be empty"));
        }
        if max_analysts == 0 {
            return Err(ResearchError::generation(
                "at least one analyst must be requested",
            ));
        }

        let feedback = feedback.map(str::trim).filter(|f| !f.is_empty());
        let request = GenerationRequest::new(GenerationTask::Personas, PERSONAS_SYSTEM_PROMPT)
            .with_user(persona_prompt(topic, max_analysts, feedback));

        info!(
            topic,
            max_analysts,
            with_feedback = feedback.is_some(),
            "Generating analyst personas"
        );

        let reply = self
            .retry
            .run("persona generation", || self.generator.generate(&request))
            .await?;

        let analysts = parse_personas(&reply, max_analysts)?;
        info!("Generated {} analysts", analysts.len());
        Ok(analysts)
    }

    /// Fill `state.analysts` from scratch.
    pub async fn create(&self, state: &mut GenerateAnalystsState) -> Result<()> {
        state.analysts = self
            .generate(&state.topic, state.max_analysts, None)
            .await?;
        Ok(())
    }

    /// Apply human feedback to an already generated panel.
    ///
    /// Empty feedback keeps the panel. Non-empty feedback regenerates it
    /// once; later calls never regenerate again. Returns whether the panel
    /// was regenerated.
    pub async fn apply_feedback(
        &self,
        state: &mut GenerateAnalystsState,
        feedback: &str,
    ) -> Result<bool> {
        let feedback = feedback.trim();
        if feedback.is_empty() {
            debug!("No analyst feedback; keeping generated panel");
            return Ok(false);
        }

        if state.feedback_applied {
            warn!("Analyst feedback was already applied once; ignoring further feedback");
            return Ok(false);
        }

        let analysts = self
            .generate(&state.topic, state.max_analysts, Some(feedback))
            .await?;

        state.human_analyst_feedback = feedback.to_string();
        state.analysts = analysts;
        state.feedback_applied = true;
        Ok(true)
    }
}

fn persona_prompt(topic: &str, max_analysts: usize, feedback: Option<&str>) -> String {
    let mut prompt = format!("Research topic: {}\n\n", topic);
    if let Some(feedback) = feedback {
        prompt.push_str(&format!("Editorial feedback: {}\n\n", feedback));
    }
    prompt.push_str(&format!(
        "Create at most {} analysts.",
        max_analysts
    ));
    prompt
}

/// Parse the persona service reply, dropping invalid and duplicate analysts.
pub fn parse_personas(reply: &str, max_analysts: usize) -> Result<Vec<Analyst>> {
    let json = extract_json_object(reply)
        .ok_or_else(|| ResearchError::generation("persona reply contained no JSON object"))?;

    let perspectives: Perspectives = serde_json::from_str(json)
        .map_err(|e| ResearchError::generation(format!("malformed persona data: {}", e)))?;

    let mut analysts: Vec<Analyst> = Vec::new();
    for candidate in perspectives.analysts {
        let missing = candidate.missing_fields();
        if !missing.is_empty() {
            let err = ResearchError::validation(format!(
                "analyst '{}' is missing {}",
                candidate.name,
                missing.join(", ")
            ));
            warn!("Dropping persona: {}", err);
            continue;
        }
        if analysts.iter().any(|a| a.same_persona(&candidate)) {
            debug!("Dropping duplicate persona {} ({})", candidate.name, candidate.role);
            continue;
        }
        analysts.push(candidate);
    }

    if analysts.is_empty() {
        return Err(ResearchError::generation(
            "persona service returned no valid analysts",
        ));
    }

    if analysts.len() > max_analysts {
        debug!(
            "Truncating {} personas to the requested {}",
            analysts.len(),
            max_analysts
        );
        analysts.truncate(max_analysts);
    }

    Ok(analysts)
}
