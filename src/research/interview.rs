//! Simulated analyst/expert interviews.
//!
//! Each interview is a small state machine:
//!
//! ```text
//! AskQuestion -> RetrieveContext -> AnswerQuestion -> AskQuestion | Conclude
//! ```
//!
//! It stops after `max_num_turns` answered questions or as soon as the
//! analyst thanks the expert, and always ends with exactly one section.
//! Service failures degrade the interview instead of aborting it; only
//! cancellation returns an error.

use crate::error::{ResearchError, Result};
use crate::llm::{
    extract_json_object, ChatMessage, GenerationRequest, GenerationService, GenerationTask,
};
use crate::models::{
    Analyst, InterviewMessage, InterviewState, SearchQuery, Section, Snippet, Speaker,
};
use crate::research::prompts::{
    fill, is_termination, ANSWER_SYSTEM_PROMPT, QUESTION_SYSTEM_PROMPT,
    SEARCH_QUERY_SYSTEM_PROMPT, SECTION_SYSTEM_PROMPT,
};
use crate::retry::RetryPolicy;
use crate::search::ContextService;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Context entry recorded when a service yields nothing after retries.
pub const DEGRADED_CONTEXT: &str = "no context retrieved";

const UNANSWERED: &str = "I'm unable to answer that question right now.";

/// Interview state machine steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InterviewStep {
    AskQuestion,
    RetrieveContext,
    AnswerQuestion,
    Conclude,
}

/// Whose side of the conversation the model is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Perspective {
    Analyst,
    Expert,
}

/// Runs interviews against the generation and context services.
pub struct InterviewRunner {
    generator: Arc<dyn GenerationService>,
    sources: Vec<Arc<dyn ContextService>>,
    retry: RetryPolicy,
    search_timeout: Duration,
}

impl InterviewRunner {
    pub fn new(
        generator: Arc<dyn GenerationService>,
        sources: Vec<Arc<dyn ContextService>>,
        retry: RetryPolicy,
        search_timeout: Duration,
    ) -> Self {
        Self {
            generator,
            sources,
            retry,
            search_timeout,
        }
    }

    /// Interview one analyst and return the derived section.
    pub async fn run_interview(
        &self,
        analyst: Analyst,
        topic: &str,
        max_turns: usize,
        cancel: &CancellationToken,
    ) -> Result<Section> {
        let mut state = self.run(analyst, topic, max_turns, cancel).await?;
        state
            .sections
            .pop()
            .ok_or_else(|| ResearchError::generation("interview produced no section"))
    }

    /// Interview one analyst and return the final interview state.
    pub async fn run(
        &self,
        analyst: Analyst,
        topic: &str,
        max_turns: usize,
        cancel: &CancellationToken,
    ) -> Result<InterviewState> {
        info!(analyst = %analyst.name, max_turns, "Starting interview");

        let mut state = InterviewState::new(analyst, max_turns);
        state.messages.push(InterviewMessage::new(
            Speaker::Host,
            format!("So you said you were writing an article on {}?", topic),
        ));

        let mut step = InterviewStep::AskQuestion;
        loop {
            if cancel.is_cancelled() {
                debug!(analyst = %state.analyst.name, "Interview cancelled");
                return Err(ResearchError::Cancelled);
            }

            step = match step {
                InterviewStep::AskQuestion => self.ask_question(&mut state).await,
                InterviewStep::RetrieveContext => {
                    self.retrieve_context(&mut state).await;
                    InterviewStep::AnswerQuestion
                }
                InterviewStep::AnswerQuestion => self.answer_question(&mut state).await,
                InterviewStep::Conclude => {
                    self.conclude(&mut state).await;
                    break;
                }
            };
        }

        info!(
            analyst = %state.analyst.name,
            turns = state.turns,
            context = state.context.len(),
            degraded = state.degraded_retrievals,
            "Interview complete"
        );
        Ok(state)
    }

    async fn ask_question(&self, state: &mut InterviewState) -> InterviewStep {
        if state.turns >= state.max_num_turns {
            return InterviewStep::Conclude;
        }

        let request = GenerationRequest::new(
            GenerationTask::Question,
            fill(QUESTION_SYSTEM_PROMPT, "persona", &state.analyst.persona()),
        )
        .with_messages(chat_history(&state.messages, Perspective::Analyst));

        match self
            .retry
            .run("question generation", || self.generator.generate(&request))
            .await
        {
            Ok(question) => {
                let done = is_termination(&question);
                state
                    .messages
                    .push(InterviewMessage::new(Speaker::Analyst, question));
                if done {
                    debug!(analyst = %state.analyst.name, "Analyst ended the interview");
                    InterviewStep::Conclude
                } else {
                    InterviewStep::RetrieveContext
                }
            }
            Err(e) => {
                warn!(analyst = %state.analyst.name, "Question generation failed: {}", e);
                state.messages.push(InterviewMessage::new(
                    Speaker::Note,
                    format!("interview ended early: no further question ({})", e),
                ));
                InterviewStep::Conclude
            }
        }
    }

    async fn retrieve_context(&self, state: &mut InterviewState) {
        let query = self.search_query(state).await;
        debug!(analyst = %state.analyst.name, query = %query.search_query, "Retrieving context");

        if self.sources.is_empty() {
            state.context.push(DEGRADED_CONTEXT.to_string());
            state.degraded_retrievals += 1;
            state.messages.push(InterviewMessage::new(
                Speaker::Note,
                format!("{}: no context services configured", DEGRADED_CONTEXT),
            ));
            return;
        }

        let lookups = self
            .sources
            .iter()
            .map(|source| self.search_source(source.as_ref(), &query.search_query));
        let outcomes = join_all(lookups).await;

        for (source, outcome) in self.sources.iter().zip(outcomes) {
            match outcome {
                Ok(snippets) => {
                    debug!(source = source.name(), results = snippets.len(), "Context retrieved");
                    state
                        .context
                        .extend(snippets.iter().map(|s| s.to_document()));
                }
                Err(e) => {
                    warn!(
                        analyst = %state.analyst.name,
                        source = source.name(),
                        "Retrieval degraded: {}", e
                    );
                    state
                        .context
                        .push(format!("[{}] {}", source.name(), DEGRADED_CONTEXT));
                    state.degraded_retrievals += 1;
                    state.messages.push(InterviewMessage::new(
                        Speaker::Note,
                        format!(
                            "{} from {} for \"{}\"",
                            DEGRADED_CONTEXT,
                            source.name(),
                            query.search_query
                        ),
                    ));
                }
            }
        }
    }

    /// Turn the latest question into one search query.
    async fn search_query(&self, state: &InterviewState) -> SearchQuery {
        let last_question = state
            .messages
            .iter()
            .rev()
            .find(|m| m.speaker == Speaker::Analyst)
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let request = GenerationRequest::new(GenerationTask::SearchQuery, SEARCH_QUERY_SYSTEM_PROMPT)
            .with_user(format!("Conversation:\n\n{}", state.transcript()));

        let parsed = match self
            .retry
            .run("search query generation", || self.generator.generate(&request))
            .await
        {
            Ok(reply) => extract_json_object(&reply)
                .and_then(|json| serde_json::from_str::<SearchQuery>(json).ok())
                .filter(|q| !q.search_query.trim().is_empty()),
            Err(e) => {
                warn!("Search query generation failed: {}", e);
                None
            }
        };

        parsed.unwrap_or_else(|| {
            debug!("Falling back to the question text as search query");
            SearchQuery {
                search_query: last_question,
            }
        })
    }

    async fn search_source(
        &self,
        source: &dyn ContextService,
        query: &str,
    ) -> Result<Vec<Snippet>> {
        let what = format!("{} search", source.name());
        self.retry
            .run(&what, || async move {
                match tokio::time::timeout(self.search_timeout, source.search(query)).await {
                    Ok(result) => result,
                    Err(_) => Err(ResearchError::retrieval(
                        source.name(),
                        format!("timed out after {:?}", self.search_timeout),
                    )),
                }
            })
            .await
    }

    async fn answer_question(&self, state: &mut InterviewState) -> InterviewStep {
        let context = state
            .context
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");
        let system = fill(
            &fill(ANSWER_SYSTEM_PROMPT, "goals", &state.analyst.description),
            "context",
            &context,
        );
        let request = GenerationRequest::new(GenerationTask::Answer, system)
            .with_messages(chat_history(&state.messages, Perspective::Expert));

        let answer = match self
            .retry
            .run("answer generation", || self.generator.generate(&request))
            .await
        {
            Ok(answer) => answer,
            Err(e) => {
                warn!(analyst = %state.analyst.name, "Answer generation failed: {}", e);
                state.messages.push(InterviewMessage::new(
                    Speaker::Note,
                    format!("expert answer unavailable ({})", e),
                ));
                UNANSWERED.to_string()
            }
        };

        state
            .messages
            .push(InterviewMessage::new(Speaker::Expert, answer));
        state.turns += 1;
        debug!(analyst = %state.analyst.name, turn = state.turns, "Turn complete");

        if state.turns >= state.max_num_turns {
            InterviewStep::Conclude
        } else {
            InterviewStep::AskQuestion
        }
    }

    async fn conclude(&self, state: &mut InterviewState) {
        state.interview = state.transcript();

        let sources = if state.context.is_empty() {
            DEGRADED_CONTEXT.to_string()
        } else {
            state
                .context
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join("\n\n---\n\n")
        };
        let request = GenerationRequest::new(
            GenerationTask::Section,
            fill(SECTION_SYSTEM_PROMPT, "focus", &state.analyst.description),
        )
        .with_user(format!(
            "Use these sources to write your section:\n\n{}\n\nInterview transcript:\n\n{}",
            sources, state.interview
        ));

        let content = match self
            .retry
            .run("section writing", || self.generator.generate(&request))
            .await
        {
            Ok(content) => content,
            Err(e) => {
                warn!(analyst = %state.analyst.name, "Section synthesis failed: {}", e);
                fallback_section(&state.analyst, &state.interview)
            }
        };

        state
            .sections
            .push(Section::new(state.analyst.role.trim(), content));
    }
}

/// Map interview lines onto chat roles from one participant's point of view.
fn chat_history(messages: &[InterviewMessage], perspective: Perspective) -> Vec<ChatMessage> {
    messages
        .iter()
        .filter_map(|m| match (m.speaker, perspective) {
            (Speaker::Note, _) => None,
            (Speaker::Host, _) => Some(ChatMessage::user(m.content.clone())),
            (Speaker::Analyst, Perspective::Analyst) | (Speaker::Expert, Perspective::Expert) => {
                Some(ChatMessage::assistant(m.content.clone()))
            }
            (Speaker::Analyst, Perspective::Expert) | (Speaker::Expert, Perspective::Analyst) => {
                Some(ChatMessage::user(m.content.clone()))
            }
        })
        .collect()
}

/// Deterministic section used when the section writer is unavailable.
fn fallback_section(analyst: &Analyst, transcript: &str) -> String {
    format!(
        "## {}\n\n### Summary\n\n*Section synthesis unavailable; the interview transcript follows.*\n\n{}\n",
        analyst.role.trim(),
        transcript
    )
}
