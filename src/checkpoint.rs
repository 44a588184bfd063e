//! Saved runs for the human feedback checkpoint.
//!
//! A run paused after analyst generation is written as pretty JSON and
//! can be resumed later with feedback.

use crate::models::ResearchGraphState;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Write a run to disk.
pub fn save(path: &Path, state: &ResearchGraphState) -> Result<()> {
    let json = serde_json::to_string_pretty(state).context("Failed to serialize run state")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write saved run: {}", path.display()))?;
    info!(stage = %state.stage, "Saved run to {}", path.display());
    Ok(())
}

/// Read a run saved with [`save`].
pub fn load(path: &Path) -> Result<ResearchGraphState> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read saved run: {}", path.display()))?;
    let state: ResearchGraphState = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse saved run: {}", path.display()))?;
    info!(stage = %state.stage, topic = %state.topic, "Loaded run from {}", path.display());
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::sample_analyst;
    use crate::models::{RunStage, Section};
    use std::io::Write;

    #[test]
    fn test_round_trip_preserves_state() {
        let mut state = ResearchGraphState::new("Quantum Computing", 3);
        state.analysts = vec![sample_analyst(1), sample_analyst(2)];
        state.human_analyst_feedback = "Add an ethicist".to_string();
        state.feedback_applied = true;
        state.sections.push(Section::new("Role 1", "## Qubits\n\nNotes."));
        state.stage = RunStage::Interviewing;

        let file = tempfile::NamedTempFile::new().unwrap();
        save(file.path(), &state).unwrap();
        let loaded = load(file.path()).unwrap();

        assert_eq!(loaded.topic, state.topic);
        assert_eq!(loaded.max_analysts, 3);
        assert_eq!(loaded.analysts, state.analysts);
        assert_eq!(loaded.human_analyst_feedback, "Add an ethicist");
        assert!(loaded.feedback_applied);
        assert_eq!(loaded.sections.as_slice(), state.sections.as_slice());
        assert_eq!(loaded.stage, RunStage::Interviewing);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("missing.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read saved run"));
    }

    #[test]
    fn test_load_corrupt_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{\"topic\": ").unwrap();
        let err = load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse saved run"));
    }

    #[test]
    fn test_minimal_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"topic": "Fusion", "max_analysts": 2}}"#).unwrap();
        let state = load(file.path()).unwrap();
        assert_eq!(state.topic, "Fusion");
        assert!(state.analysts.is_empty());
        assert_eq!(state.stage, RunStage::AwaitingFeedback);
    }
}
