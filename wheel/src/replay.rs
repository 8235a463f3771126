//! `wheel replay`: feed a recorded agent transcript through the loop monitor.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::core::spindle::{
    SpindleConfig, SpindleResult, SpindleState, check_spindle_loop, get_file_edit_warnings,
    record_command_failure,
};
use crate::exit_codes;
use crate::io::config::load_config;
use crate::io::paths::WheelPaths;
use crate::io::transcript::{TranscriptEvent, load_transcript};

/// Summary of one replayed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayOutcome {
    pub turns: u32,
    pub command_failures: u32,
    /// First abort/block decision, if the monitor reached one.
    pub decision: Option<ReplayDecision>,
    /// Warnings raised along the way, each listed once in first-seen order.
    pub warnings: Vec<String>,
    /// Files over the churn threshold when the replay stopped.
    pub file_edit_warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayDecision {
    /// 1-based turn index that triggered the decision.
    pub turn: u32,
    pub result: SpindleResult,
}

impl ReplayOutcome {
    pub fn exit_code(&self) -> i32 {
        match &self.decision {
            Some(decision) if decision.result.should_block => exit_codes::LOOP_BLOCK,
            Some(_) => exit_codes::LOOP_ABORT,
            None => exit_codes::OK,
        }
    }
}

/// Replay `events` against a fresh monitor. Stops at the first decision.
pub fn replay_events(events: &[TranscriptEvent], config: &SpindleConfig) -> ReplayOutcome {
    let mut state = SpindleState::new();
    let mut outcome = ReplayOutcome {
        turns: 0,
        command_failures: 0,
        decision: None,
        warnings: Vec::new(),
        file_edit_warnings: Vec::new(),
    };

    for event in events {
        match event {
            TranscriptEvent::CommandFailure { command, error } => {
                outcome.command_failures += 1;
                record_command_failure(&mut state, command, error);
            }
            TranscriptEvent::Turn { output, diff } => {
                outcome.turns += 1;
                let result = check_spindle_loop(&mut state, output, diff.as_deref(), config);
                for warning in state.drain_warnings() {
                    if !outcome.warnings.contains(&warning) {
                        outcome.warnings.push(warning);
                    }
                }
                if !result.is_clear() {
                    debug!(turn = outcome.turns, reason = ?result.reason, "monitor decision");
                    outcome.decision = Some(ReplayDecision {
                        turn: outcome.turns,
                        result,
                    });
                    break;
                }
            }
        }
    }

    outcome.file_edit_warnings = get_file_edit_warnings(&state, config.max_file_edits);
    outcome
}

/// Load config from `root` and the transcript at `transcript_path`, then replay it.
#[instrument(skip_all, fields(root = %root.display(), transcript = %transcript_path.display()))]
pub fn replay_transcript(root: &Path, transcript_path: &Path) -> Result<ReplayOutcome> {
    let paths = WheelPaths::new(root);
    let config = load_config(&paths.config_path)?;
    let events = load_transcript(transcript_path)?;
    let outcome = replay_events(&events, &config.spindle);
    info!(
        turns = outcome.turns,
        decided = outcome.decision.is_some(),
        "replay finished"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spindle::SpindleReason;
    use crate::test_support::unified_diff;

    fn turn(output: &str, diff: Option<String>) -> TranscriptEvent {
        TranscriptEvent::Turn {
            output: output.to_string(),
            diff,
        }
    }

    fn failure(command: &str, error: &str) -> TranscriptEvent {
        TranscriptEvent::CommandFailure {
            command: command.to_string(),
            error: error.to_string(),
        }
    }

    fn reason(outcome: &ReplayOutcome) -> Option<SpindleReason> {
        outcome.decision.as_ref().and_then(|d| d.result.reason)
    }

    #[test]
    fn productive_run_has_no_decision() {
        let events = vec![
            turn(
                "Adding the parser entry point",
                Some(unified_diff("src/parser.rs", &["pub fn parse() {}"], &[])),
            ),
            turn(
                "Wiring the lexer into the parser",
                Some(unified_diff("src/lexer.rs", &["pub fn lex() {}"], &[])),
            ),
            turn(
                "Documenting the public API",
                Some(unified_diff("README.md", &["## Usage"], &[])),
            ),
        ];
        let outcome = replay_events(&events, &SpindleConfig::default());
        assert_eq!(outcome.turns, 3);
        assert_eq!(outcome.decision, None);
        assert_eq!(outcome.exit_code(), exit_codes::OK);
    }

    #[test]
    fn stalled_run_aborts_on_the_threshold_turn() {
        let events: Vec<TranscriptEvent> = [
            "Reading the config loader",
            "Looking at how errors propagate",
            "Checking the CLI argument parsing",
            "Reviewing the storage layer next",
            "Tracing how the scheduler is invoked",
            "never reached",
        ]
        .iter()
        .map(|output| turn(output, None))
        .collect();

        let outcome = replay_events(&events, &SpindleConfig::default());
        assert_eq!(outcome.turns, 5);
        assert_eq!(reason(&outcome), Some(SpindleReason::Stalling));
        assert_eq!(outcome.decision.as_ref().expect("decision").turn, 5);
        assert_eq!(outcome.exit_code(), exit_codes::LOOP_ABORT);
    }

    const UNRESOLVED: &str = "error[E0433]: failed to resolve: use of undeclared crate `foo`";

    #[test]
    fn repeated_command_failure_blocks() {
        let events = vec![
            failure("cargo build", UNRESOLVED),
            turn(
                "Adding the dependency",
                Some(unified_diff("Cargo.toml", &["foo = \"1\""], &[])),
            ),
            failure("cargo build", UNRESOLVED),
            turn(
                "Checking the import path",
                Some(unified_diff("src/lib.rs", &["use foo::Bar;"], &[])),
            ),
            failure("cargo build", UNRESOLVED),
            turn(
                "Trying a fully qualified path",
                Some(unified_diff("src/main.rs", &["fn main() { foo::run(); }"], &[])),
            ),
        ];
        let outcome = replay_events(&events, &SpindleConfig::default());
        assert_eq!(outcome.command_failures, 3);
        assert_eq!(reason(&outcome), Some(SpindleReason::CommandFailure));
        assert_eq!(outcome.exit_code(), exit_codes::LOOP_BLOCK);
    }

    #[test]
    fn churn_warnings_are_reported_once() {
        let config = SpindleConfig {
            max_file_edits: 2,
            ..SpindleConfig::default()
        };
        let events: Vec<TranscriptEvent> = (0..4)
            .map(|i| {
                let line = format!("const N: u32 = {};", i);
                turn(
                    &format!("Adjusting constant number {}", i),
                    Some(unified_diff("src/hot.rs", &[line.as_str()], &[])),
                )
            })
            .collect();

        let outcome = replay_events(&events, &config);
        assert_eq!(outcome.decision, None);
        assert_eq!(
            outcome.warnings,
            vec![
                "src/hot.rs edited 3 times this cycle (threshold 2)".to_string(),
                "src/hot.rs edited 4 times this cycle (threshold 2)".to_string(),
            ]
        );
        assert_eq!(
            outcome.file_edit_warnings,
            vec!["src/hot.rs edited 4 times this cycle (threshold 2)".to_string()]
        );
    }
}
