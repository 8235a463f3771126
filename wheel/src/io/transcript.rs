//! Recorded agent transcripts (JSON Lines) for `wheel replay`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One recorded event of an agent run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranscriptEvent {
    /// An agent turn and the diff it produced, if any.
    Turn {
        output: String,
        #[serde(default)]
        diff: Option<String>,
    },
    /// A failing QA/build/test command observed during the run.
    CommandFailure { command: String, error: String },
}

/// Parse a JSONL transcript. Blank lines are skipped.
pub fn parse_transcript(contents: &str) -> Result<Vec<TranscriptEvent>> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).with_context(|| format!("parse event on line {}", idx + 1))
        })
        .collect()
}

pub fn load_transcript(path: &Path) -> Result<Vec<TranscriptEvent>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read transcript {}", path.display()))?;
    let events =
        parse_transcript(&contents).with_context(|| format!("parse {}", path.display()))?;
    debug!(path = %path.display(), events = events.len(), "transcript loaded");
    Ok(events)
}
