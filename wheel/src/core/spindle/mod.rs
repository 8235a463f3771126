//! Agent loop monitor ("spindle").
//!
//! A [`SpindleState`] is owned by exactly one agent run. The control loop
//! feeds it every turn through [`check_spindle_loop`] and acts on the returned
//! [`SpindleResult`]: `should_abort` means the agent is looping and should be
//! killed, `should_block` means the agent hit something it cannot fix and a
//! human should look. Both are advisory; the monitor never touches processes.
//!
//! Checks run in a fixed order and the first one that fires wins:
//! token budget, stalling, oscillation, repetition, spinning, then the
//! failing-command history (ping-pong before repeated failures).

pub mod churn;
pub mod commands;
pub mod oscillation;
pub mod repetition;
pub mod text;

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use churn::{FileEditCounts, file_edit_warnings};
use commands::{CommandSignature, CommandVerdict, classify_command_failures, push_signature};
use oscillation::detect_oscillation;
use repetition::detect_repetition;
use text::estimate_tokens;

/// Agent turns retained for repetition checks.
pub const MAX_OUTPUT_HISTORY: usize = 10;
/// Non-empty diffs retained for oscillation checks.
pub const MAX_DIFF_HISTORY: usize = 10;
/// Stored diffs combined with the current diff for oscillation checks.
const OSCILLATION_HISTORY: usize = 2;
/// Turns required before the spinning check can fire.
const SPINNING_MIN_TURNS: u32 = 3;

/// Thresholds for the loop monitor. Any count or budget set to 0 disables its check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpindleConfig {
    pub enabled: bool,
    /// Jaccard similarity at which two turns count as near-duplicates.
    pub similarity_threshold: f64,
    /// Near-duplicate turns in a row (including the latest) that count as repetition.
    pub max_similar_outputs: u32,
    /// Consecutive turns without a diff before aborting.
    pub max_stall_iterations: u32,
    pub token_budget_warning: u64,
    pub token_budget_abort: u64,
    /// Full A,B cycles of alternating QA failures before aborting.
    pub max_qa_ping_pong: u32,
    /// Identical consecutive command failures before blocking.
    pub max_command_failures: u32,
    /// Edits to a single file before a churn warning.
    pub max_file_edits: u32,
    /// Output volume after which a near-zero change ratio counts as spinning.
    pub spinning_min_output_chars: u64,
    /// Change-to-output character ratio below which the agent is spinning.
    pub spinning_max_change_ratio: f64,
}

impl Default for SpindleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            similarity_threshold: 0.8,
            max_similar_outputs: 3,
            max_stall_iterations: 5,
            token_budget_warning: 140_000,
            token_budget_abort: 180_000,
            max_qa_ping_pong: 3,
            max_command_failures: 3,
            max_file_edits: 8,
            spinning_min_output_chars: 60_000,
            spinning_max_change_ratio: 0.02,
        }
    }
}

impl SpindleConfig {
    /// Configuration errors, empty when the config is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            errors.push("similarity_threshold must be within [0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.spinning_max_change_ratio) {
            errors.push("spinning_max_change_ratio must be within [0, 1]".to_string());
        }
        if self.token_budget_warning > 0
            && self.token_budget_abort > 0
            && self.token_budget_warning > self.token_budget_abort
        {
            errors.push("token_budget_warning must not exceed token_budget_abort".to_string());
        }
        errors
    }
}

/// Why the monitor flagged the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpindleReason {
    Oscillation,
    Spinning,
    Stalling,
    Repetition,
    TokenBudget,
    QaPingPong,
    CommandFailure,
}

impl SpindleReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SpindleReason::Oscillation => "oscillation",
            SpindleReason::Spinning => "spinning",
            SpindleReason::Stalling => "stalling",
            SpindleReason::Repetition => "repetition",
            SpindleReason::TokenBudget => "token_budget",
            SpindleReason::QaPingPong => "qa_ping_pong",
            SpindleReason::CommandFailure => "command_failure",
        }
    }
}

impl std::fmt::Display for SpindleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evidence attached to a decision. Only fields relevant to the reason are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpindleDiagnostics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations_without_change: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub repeated_patterns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oscillation_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ping_pong_cycles: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consecutive_failures: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_to_output_ratio: Option<f64>,
}

/// Decision for one turn. `should_abort` and `should_block` are never both set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpindleResult {
    pub should_abort: bool,
    pub should_block: bool,
    pub reason: Option<SpindleReason>,
    pub confidence: f64,
    pub diagnostics: SpindleDiagnostics,
}

impl SpindleResult {
    /// No loop detected.
    pub fn clear() -> Self {
        Self {
            should_abort: false,
            should_block: false,
            reason: None,
            confidence: 0.0,
            diagnostics: SpindleDiagnostics::default(),
        }
    }

    fn abort(reason: SpindleReason, confidence: f64, diagnostics: SpindleDiagnostics) -> Self {
        Self {
            should_abort: true,
            should_block: false,
            reason: Some(reason),
            confidence: confidence.clamp(0.0, 1.0),
            diagnostics,
        }
    }

    fn block(reason: SpindleReason, confidence: f64, diagnostics: SpindleDiagnostics) -> Self {
        Self {
            should_abort: false,
            should_block: true,
            reason: Some(reason),
            confidence: confidence.clamp(0.0, 1.0),
            diagnostics,
        }
    }

    pub fn is_clear(&self) -> bool {
        !self.should_abort && !self.should_block
    }
}

/// Per-run monitor state. Never shared between agents and never persisted.
#[derive(Debug, Clone, Default)]
pub struct SpindleState {
    outputs: VecDeque<String>,
    diffs: VecDeque<String>,
    iterations: u32,
    iterations_since_change: u32,
    estimated_tokens: u64,
    warnings: Vec<String>,
    total_output_chars: u64,
    total_change_chars: u64,
    failing_command_signatures: VecDeque<CommandSignature>,
    file_edit_counts: FileEditCounts,
}

impl SpindleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recent agent turns, newest last.
    pub fn outputs(&self) -> &VecDeque<String> {
        &self.outputs
    }

    /// Recent non-empty diffs, newest last.
    pub fn diffs(&self) -> &VecDeque<String> {
        &self.diffs
    }

    pub fn iterations_since_change(&self) -> u32 {
        self.iterations_since_change
    }

    pub fn estimated_tokens(&self) -> u64 {
        self.estimated_tokens
    }

    pub fn total_output_chars(&self) -> u64 {
        self.total_output_chars
    }

    pub fn total_change_chars(&self) -> u64 {
        self.total_change_chars
    }

    pub fn failing_command_signatures(&self) -> &VecDeque<CommandSignature> {
        &self.failing_command_signatures
    }

    pub fn file_edit_counts(&self) -> &FileEditCounts {
        &self.file_edit_counts
    }

    /// Pending warnings, without clearing them.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Take all pending warnings.
    pub fn drain_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

/// Record a failing command (QA check, build, test) for ping-pong and
/// repeated-failure classification. The history keeps the latest 20 entries.
pub fn record_command_failure(state: &mut SpindleState, command: &str, error_message: &str) {
    push_signature(
        &mut state.failing_command_signatures,
        CommandSignature::new(command, error_message),
    );
}

/// Warnings for files edited more than `max_file_edits` times in this run.
pub fn get_file_edit_warnings(state: &SpindleState, max_file_edits: u32) -> Vec<String> {
    file_edit_warnings(&state.file_edit_counts, max_file_edits)
}

/// Evaluate one agent turn.
///
/// `diff` is the change produced by this turn, `None` or blank when the agent
/// did not modify anything. The turn is appended to history only when no loop
/// was detected.
pub fn check_spindle_loop(
    state: &mut SpindleState,
    output: &str,
    diff: Option<&str>,
    config: &SpindleConfig,
) -> SpindleResult {
    if !config.enabled {
        return SpindleResult::clear();
    }

    let diff = diff.filter(|d| !d.trim().is_empty());
    state.iterations += 1;
    state.estimated_tokens += estimate_tokens(output) + diff.map_or(0, estimate_tokens);
    state.total_output_chars += output.chars().count() as u64;
    state.total_change_chars += diff.map_or(0, |d| d.chars().count() as u64);

    if config.token_budget_abort > 0 && state.estimated_tokens > config.token_budget_abort {
        return SpindleResult::abort(
            SpindleReason::TokenBudget,
            1.0,
            SpindleDiagnostics {
                estimated_tokens: Some(state.estimated_tokens),
                ..SpindleDiagnostics::default()
            },
        );
    }
    if config.token_budget_warning > 0 && state.estimated_tokens > config.token_budget_warning {
        state.warnings.push(format!(
            "estimated tokens {} exceed warning budget {}",
            state.estimated_tokens, config.token_budget_warning
        ));
    }

    if let Some(diff) = diff {
        state.file_edit_counts.record_diff(diff);
        let churn = file_edit_warnings(&state.file_edit_counts, config.max_file_edits);
        state.warnings.extend(churn);
    }

    match diff {
        None => {
            state.iterations_since_change += 1;
            if config.max_stall_iterations > 0
                && state.iterations_since_change >= config.max_stall_iterations
            {
                let confidence = stall_confidence(
                    state.iterations_since_change,
                    config.max_stall_iterations,
                );
                return SpindleResult::abort(
                    SpindleReason::Stalling,
                    confidence,
                    SpindleDiagnostics {
                        iterations_without_change: Some(state.iterations_since_change),
                        ..SpindleDiagnostics::default()
                    },
                );
            }
        }
        Some(_) => state.iterations_since_change = 0,
    }

    let mut recent_diffs: Vec<&str> = state
        .diffs
        .iter()
        .skip(state.diffs.len().saturating_sub(OSCILLATION_HISTORY))
        .map(String::as_str)
        .collect();
    recent_diffs.extend(diff);
    let oscillation = detect_oscillation(&recent_diffs);
    if oscillation.detected {
        return SpindleResult::abort(
            SpindleReason::Oscillation,
            oscillation.confidence,
            SpindleDiagnostics {
                oscillation_pattern: oscillation.pattern,
                ..SpindleDiagnostics::default()
            },
        );
    }

    if !output.trim().is_empty() {
        let prior: Vec<&str> = state.outputs.iter().map(String::as_str).collect();
        let repetition = detect_repetition(&prior, output, config);
        if repetition.detected {
            return SpindleResult::abort(
                SpindleReason::Repetition,
                repetition.confidence,
                SpindleDiagnostics {
                    similarity_score: repetition.similarity,
                    repeated_patterns: repetition.patterns,
                    ..SpindleDiagnostics::default()
                },
            );
        }
    }

    if let Some(ratio) = spinning_ratio(state, config) {
        return SpindleResult::abort(
            SpindleReason::Spinning,
            0.75,
            SpindleDiagnostics {
                change_to_output_ratio: Some(ratio),
                estimated_tokens: Some(state.estimated_tokens),
                ..SpindleDiagnostics::default()
            },
        );
    }

    match classify_command_failures(
        &state.failing_command_signatures,
        config.max_qa_ping_pong,
        config.max_command_failures,
    ) {
        Some(CommandVerdict::PingPong {
            cycles,
            first,
            second,
        }) => {
            return SpindleResult::abort(
                SpindleReason::QaPingPong,
                (0.7 + 0.1 * f64::from(cycles)).min(0.95),
                SpindleDiagnostics {
                    ping_pong_cycles: Some(cycles),
                    command_signature: Some(format!("{} <-> {}", first, second)),
                    ..SpindleDiagnostics::default()
                },
            );
        }
        Some(CommandVerdict::Repeated { count, signature }) => {
            return SpindleResult::block(
                SpindleReason::CommandFailure,
                0.9,
                SpindleDiagnostics {
                    consecutive_failures: Some(count),
                    command_signature: Some(signature.to_string()),
                    ..SpindleDiagnostics::default()
                },
            );
        }
        None => {}
    }

    push_bounded(&mut state.outputs, output.to_string(), MAX_OUTPUT_HISTORY);
    if let Some(diff) = diff {
        push_bounded(&mut state.diffs, diff.to_string(), MAX_DIFF_HISTORY);
    }
    SpindleResult::clear()
}

/// Confidence grows from 0.8 at the threshold to 1.0 at twice the threshold.
fn stall_confidence(stalled: u32, threshold: u32) -> f64 {
    let over = f64::from(stalled.saturating_sub(threshold)) / f64::from(threshold.max(1));
    (0.8 + 0.2 * over).min(1.0)
}

/// Output-to-change ratio when the agent talks a lot without editing.
fn spinning_ratio(state: &SpindleState, config: &SpindleConfig) -> Option<f64> {
    if config.spinning_min_output_chars == 0
        || state.iterations < SPINNING_MIN_TURNS
        || state.total_output_chars < config.spinning_min_output_chars
    {
        return None;
    }
    let change_ratio = state.total_change_chars as f64 / state.total_output_chars as f64;
    if change_ratio < config.spinning_max_change_ratio {
        Some(change_ratio)
    } else {
        None
    }
}

fn push_bounded(history: &mut VecDeque<String>, item: String, cap: usize) {
    history.push_back(item);
    while history.len() > cap {
        history.pop_front();
    }
}
