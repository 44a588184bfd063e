//! Markdown and JSON report rendering.
//!
//! This module renders a compiled research run into the document written
//! to disk.

use crate::cli::OutputFormat;
use crate::models::{Analyst, ReportMetadata, ResearchReport, Section};
use crate::research::aggregator::{collect_sources, total_words, word_counts};
use anyhow::{Context, Result};
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &ResearchReport) -> String {
    let mut output = String::new();

    // Title
    output.push_str(&format!("# Research Report: {}\n\n", report.metadata.topic));

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_panel_section(&report.analysts));
    output.push_str(&generate_statistics_section(&report.sections));

    // Compiled body: introduction, insights, conclusion
    output.push_str("---\n\n");
    output.push_str(report.report.final_report.trim());
    output.push_str("\n\n");

    output.push_str(&generate_sources_section(&report.sections));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Topic:** {}\n", metadata.topic));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Model Used:** `{}`\n", metadata.model_used));
    section.push_str(&format!("- **Analysts:** {}\n", metadata.analysts));
    section.push_str(&format!("- **Sections:** {}\n", metadata.sections));
    section.push_str(&format!(
        "- **Run Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the analyst panel table.
fn generate_panel_section(analysts: &[Analyst]) -> String {
    if analysts.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Analyst Panel\n\n");
    section.push_str("| Name | Role | Affiliation | Focus |\n");
    section.push_str("|:---|:---|:---|:---|\n");

    for analyst in analysts {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            table_cell(&analyst.name),
            table_cell(&analyst.role),
            table_cell(&analyst.affiliation),
            table_cell(&analyst.description),
        ));
    }
    section.push('\n');

    section
}

/// Generate the per-section word counts.
fn generate_statistics_section(sections: &[Section]) -> String {
    if sections.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Section Statistics\n\n");
    section.push_str("| Section | Words |\n");
    section.push_str("|:---|:---:|\n");

    for (title, words) in word_counts(sections) {
        section.push_str(&format!("| {} | {} |\n", table_cell(&title), words));
    }
    section.push_str(&format!("| **Total** | **{}** |\n\n", total_words(sections)));

    section
}

/// Generate the consolidated source list.
fn generate_sources_section(sections: &[Section]) -> String {
    let sources = collect_sources(sections);
    if sources.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Sources\n\n");
    for (i, source) in sources.iter().enumerate() {
        section.push_str(&format!("{}. {}\n", i + 1, source));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by research-analyst v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

fn table_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Generate a JSON report.
pub fn generate_json_report(report: &ResearchReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Render the report in `format` and write it to `path`.
pub fn write_report(report: &ResearchReport, format: OutputFormat, path: &Path) -> Result<()> {
    let content = match format {
        OutputFormat::Json => generate_json_report(report)?,
        OutputFormat::Markdown => generate_markdown_report(report),
    };

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}
