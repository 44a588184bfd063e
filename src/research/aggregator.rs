//! Section aggregation and statistics.
//!
//! Sections arrive from concurrently running interviews. They are merged
//! into an append-only list at a single join point, in arrival order.

use crate::models::{AppendOnly, Section};
use std::collections::HashSet;

/// Collect sections in arrival order.
pub fn aggregate<I>(sections: I) -> Vec<Section>
where
    I: IntoIterator<Item = Section>,
{
    sections.into_iter().collect()
}

/// Append newly finished sections to the run's section list.
pub fn merge_into(target: &mut AppendOnly<Section>, sections: Vec<Section>) {
    target.merge(aggregate(sections).into());
}

/// Word count of each section, by title.
pub fn word_counts(sections: &[Section]) -> Vec<(String, usize)> {
    sections
        .iter()
        .map(|s| (s.title.clone(), s.content.split_whitespace().count()))
        .collect()
}

/// Total words over all sections.
pub fn total_words(sections: &[Section]) -> usize {
    word_counts(sections).iter().map(|(_, n)| n).sum()
}

/// Source lines listed under `### Sources` headers, deduplicated.
///
/// A leading `[n]` citation marker is stripped before comparing, so the
/// same link cited as `[1]` in one section and `[3]` in another is kept
/// once. First occurrence wins.
pub fn collect_sources(sections: &[Section]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for section in sections {
        for line in source_lines(&section.content) {
            if seen.insert(line.to_lowercase()) {
                sources.push(line);
            }
        }
    }

    sources
}

fn source_lines(content: &str) -> Vec<String> {
    let mut in_sources = false;
    let mut lines = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            in_sources = trimmed
                .trim_start_matches('#')
                .trim()
                .eq_ignore_ascii_case("sources");
            continue;
        }
        if !in_sources || trimmed.is_empty() {
            continue;
        }
        let source = strip_citation(trimmed.trim_start_matches(['-', '*']).trim());
        if !source.is_empty() {
            lines.push(source.to_string());
        }
    }

    lines
}

fn strip_citation(line: &str) -> &str {
    if let Some(rest) = line.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            if rest[..end].chars().all(|c| c.is_ascii_digit()) {
                return rest[end + 1..].trim();
            }
        }
    }
    line
}
