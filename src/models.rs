//! Data models for the research pipeline.
//!
//! This module contains the analyst and section types, the additive
//! collection used for concurrent merges, and the explicit state structs
//! for each graph (analyst generation, interview, full research run).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A section of the final research report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Title of the section.
    pub title: String,
    /// Markdown content of the section.
    pub content: String,
}

impl Section {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// A synthetic analyst persona that conducts one interview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analyst {
    /// Primary affiliation of the analyst.
    pub affiliation: String,
    /// Name of the analyst.
    pub name: String,
    /// Role of the analyst in the context of the topic.
    pub role: String,
    /// Description of the analyst's focus, concerns, and motives.
    pub description: String,
}

impl Analyst {
    /// Prompt-context text describing this analyst.
    pub fn persona(&self) -> String {
        format!(
            "Name: {}\nRole: {}\nAffiliation: {}\nDescription: {}",
            self.name, self.role, self.affiliation, self.description
        )
    }

    /// Names of required fields that are empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.affiliation.trim().is_empty() {
            missing.push("affiliation");
        }
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.role.trim().is_empty() {
            missing.push("role");
        }
        if self.description.trim().is_empty() {
            missing.push("description");
        }
        missing
    }

    /// Two analysts are the same persona when both name and role match.
    pub fn same_persona(&self, other: &Analyst) -> bool {
        self.name.trim().eq_ignore_ascii_case(other.name.trim())
            && self.role.trim().eq_ignore_ascii_case(other.role.trim())
    }
}

/// Structured persona-generation output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Perspectives {
    /// Comprehensive list of analysts with their roles and affiliations.
    #[serde(default)]
    pub analysts: Vec<Analyst>,
}

/// One generated retrieval query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Search query string generated for retrieving relevant documents.
    #[serde(default)]
    pub search_query: String,
}

/// A document returned by a context service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    /// Name of the service that produced this snippet.
    pub source: String,
    pub title: String,
    /// Link to the document; empty when the service has none.
    #[serde(default)]
    pub url: String,
    pub content: String,
}

impl Snippet {
    /// Render as a document block for the interview context.
    pub fn to_document(&self) -> String {
        if self.url.is_empty() {
            format!(
                "<Document source=\"{}\" title=\"{}\"/>\n{}\n</Document>",
                self.source, self.title, self.content
            )
        } else {
            format!(
                "<Document href=\"{}\"/>\n{}\n</Document>",
                self.url, self.content
            )
        }
    }
}

/// An append-only collection.
///
/// Items can be pushed or merged in but never removed or replaced, so the
/// length never decreases. Branches each fill their own collection and the
/// owner merges them at the join point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppendOnly<T> {
    items: Vec<T>,
}

impl<T> Default for AppendOnly<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> AppendOnly<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn extend<I: IntoIterator<Item = T>>(&mut self, items: I) {
        self.items.extend(items);
    }

    /// Append every item of another collection after the existing ones.
    pub fn merge(&mut self, other: AppendOnly<T>) {
        self.items.extend(other.items);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T> From<Vec<T>> for AppendOnly<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<'a, T> IntoIterator for &'a AppendOnly<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Who spoke a line of an interview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// Opening line that frames the interview.
    Host,
    /// The analyst asking questions.
    Analyst,
    /// The expert answering from retrieved context.
    Expert,
    /// Transcript annotation, never sent to the model.
    Note,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::Host => write!(f, "Host"),
            Speaker::Analyst => write!(f, "Analyst"),
            Speaker::Expert => write!(f, "Expert"),
            Speaker::Note => write!(f, "Note"),
        }
    }
}

/// A single line of an interview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewMessage {
    pub speaker: Speaker,
    pub content: String,
}

impl InterviewMessage {
    pub fn new(speaker: Speaker, content: impl Into<String>) -> Self {
        Self {
            speaker,
            content: content.into(),
        }
    }
}

/// State of the analyst-generation graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateAnalystsState {
    /// Research topic.
    pub topic: String,
    /// Maximum number of analysts to generate.
    pub max_analysts: usize,
    /// Feedback from the human reviewer.
    #[serde(default)]
    pub human_analyst_feedback: String,
    /// Generated analysts.
    #[serde(default)]
    pub analysts: Vec<Analyst>,
    /// Whether the one allowed feedback regeneration has happened.
    #[serde(default)]
    pub feedback_applied: bool,
}

impl GenerateAnalystsState {
    pub fn new(topic: impl Into<String>, max_analysts: usize) -> Self {
        Self {
            topic: topic.into(),
            max_analysts,
            ..Default::default()
        }
    }
}

/// Per-interview state, owned by exactly one interview task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewState {
    /// Conversation so far.
    pub messages: Vec<InterviewMessage>,
    /// Max interview turns allowed.
    pub max_num_turns: usize,
    /// Retrieved context documents.
    pub context: AppendOnly<String>,
    /// Analyst conducting the interview.
    pub analyst: Analyst,
    /// Full interview transcript, set when the interview concludes.
    pub interview: String,
    /// Section generated from the interview.
    pub sections: Vec<Section>,
    /// Completed question/answer turns.
    pub turns: usize,
    /// Retrievals that fell back to degraded context.
    pub degraded_retrievals: usize,
}

impl InterviewState {
    pub fn new(analyst: Analyst, max_num_turns: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_num_turns,
            context: AppendOnly::new(),
            analyst,
            interview: String::new(),
            sections: Vec::new(),
            turns: 0,
            degraded_retrievals: 0,
        }
    }

    /// Render the messages as a plain-text transcript.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("{}: {}", m.speaker, m.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Where a research run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    /// Analysts are generated and the run waits for human feedback.
    #[default]
    AwaitingFeedback,
    /// Feedback was handled; interviews are next.
    Interviewing,
    /// The final report has been compiled.
    Compiled,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStage::AwaitingFeedback => write!(f, "awaiting feedback"),
            RunStage::Interviewing => write!(f, "interviewing"),
            RunStage::Compiled => write!(f, "compiled"),
        }
    }
}

/// Top-level state of one report-generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchGraphState {
    /// Research topic.
    pub topic: String,
    /// Maximum number of analysts to generate.
    pub max_analysts: usize,
    /// Feedback from the human reviewer.
    #[serde(default)]
    pub human_analyst_feedback: String,
    /// Generated analysts.
    #[serde(default)]
    pub analysts: Vec<Analyst>,
    /// All interview-generated sections, in arrival order.
    #[serde(default)]
    pub sections: AppendOnly<Section>,
    /// Introduction of the final report.
    #[serde(default)]
    pub introduction: String,
    /// Main content of the report.
    #[serde(default)]
    pub content: String,
    /// Conclusion of the final report.
    #[serde(default)]
    pub conclusion: String,
    /// Compiled report string.
    #[serde(default)]
    pub final_report: String,
    #[serde(default)]
    pub stage: RunStage,
    /// Whether the one allowed feedback regeneration has happened.
    #[serde(default)]
    pub feedback_applied: bool,
}

impl ResearchGraphState {
    pub fn new(topic: impl Into<String>, max_analysts: usize) -> Self {
        Self {
            topic: topic.into(),
            max_analysts,
            ..Default::default()
        }
    }

    /// The analyst-generation view of this state.
    pub fn analysts_state(&self) -> GenerateAnalystsState {
        GenerateAnalystsState {
            topic: self.topic.clone(),
            max_analysts: self.max_analysts,
            human_analyst_feedback: self.human_analyst_feedback.clone(),
            analysts: self.analysts.clone(),
            feedback_applied: self.feedback_applied,
        }
    }

    /// Copy the results of analyst generation back into this state.
    pub fn absorb_analysts(&mut self, state: GenerateAnalystsState) {
        self.human_analyst_feedback = state.human_analyst_feedback;
        self.analysts = state.analysts;
        self.feedback_applied = state.feedback_applied;
    }

    /// Store a compiled report.
    pub fn set_report(&mut self, report: CompiledReport) {
        self.introduction = report.introduction;
        self.content = report.content;
        self.conclusion = report.conclusion;
        self.final_report = report.final_report;
        self.stage = RunStage::Compiled;
    }

    pub fn report(&self) -> CompiledReport {
        CompiledReport {
            introduction: self.introduction.clone(),
            content: self.content.clone(),
            conclusion: self.conclusion.clone(),
            final_report: self.final_report.clone(),
        }
    }
}

/// Output of the report compiler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledReport {
    pub introduction: String,
    pub content: String,
    pub conclusion: String,
    pub final_report: String,
}

/// Metadata about a rendered research report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Research topic.
    pub topic: String,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Name of the LLM model used.
    pub model_used: String,
    /// Number of analysts interviewed.
    pub analysts: usize,
    /// Number of sections aggregated.
    pub sections: usize,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// The complete research report as written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchReport {
    pub metadata: ReportMetadata,
    pub analysts: Vec<Analyst>,
    pub sections: Vec<Section>,
    pub report: CompiledReport,
}
