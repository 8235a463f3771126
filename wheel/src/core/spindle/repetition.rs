//! Detection of an agent repeating itself: near-duplicate turns and stuck phrasing.

use std::collections::HashSet;

use super::SpindleConfig;
use super::text::{compute_similarity, find_repeated_phrases};

/// Phrases that signal an agent going around in circles. Matched case-insensitively.
pub const STUCK_PHRASES: &[&str] = &[
    "i apologize",
    "sorry",
    "let me try again",
    "let me try a different approach",
    "that didn't work",
    "still failing",
    "same error",
    "i made an error",
    "my mistake",
    "still not working",
];

const STUCK_PHRASE_MIN_PRIOR: usize = 2;
const STUCK_PHRASE_MIN_TOTAL: usize = 3;
const MAX_PATTERNS: usize = 5;

/// Outcome of [`detect_repetition`].
#[derive(Debug, Clone, PartialEq)]
pub struct Repetition {
    pub detected: bool,
    pub confidence: f64,
    /// Lowest similarity between the latest turn and the compared prior turns.
    pub similarity: Option<f64>,
    pub patterns: Vec<String>,
}

/// Check whether `latest` repeats the recent `prior_outputs`.
///
/// Two independent signals:
/// - the latest turn is at least `similarity_threshold` similar to each of the
///   last `max(max_similar_outputs - 1, 1)` prior turns;
/// - a stuck phrase occurs at least three times across prior turns and the
///   latest turn, with at least two of those in prior turns.
pub fn detect_repetition<S: AsRef<str>>(
    prior_outputs: &[S],
    latest: &str,
    config: &SpindleConfig,
) -> Repetition {
    let mut patterns = Vec::new();
    let mut confidence: f64 = 0.0;
    let mut detected = false;

    let similarity = near_duplicate_similarity(prior_outputs, latest, config);
    if let Some(score) = similarity.filter(|score| *score >= config.similarity_threshold) {
        detected = true;
        confidence = confidence.max(score);
        patterns.push(format!("near-duplicate output (similarity {:.2})", score));
    }

    let latest_lower = latest.to_lowercase();
    let prior_lower: Vec<String> = prior_outputs
        .iter()
        .map(|output| output.as_ref().to_lowercase())
        .collect();
    for phrase in STUCK_PHRASES {
        let prior_count: usize = prior_lower
            .iter()
            .map(|output| output.matches(phrase).count())
            .sum();
        let total = prior_count + latest_lower.matches(phrase).count();
        if prior_count >= STUCK_PHRASE_MIN_PRIOR && total >= STUCK_PHRASE_MIN_TOTAL {
            detected = true;
            let score = (0.7 + 0.05 * (total - STUCK_PHRASE_MIN_TOTAL) as f64).min(0.95);
            confidence = confidence.max(score);
            patterns.push(format!("stuck phrase \"{}\" x{}", phrase, total));
        }
    }

    if let Some(previous) = prior_outputs.last() {
        patterns.extend(find_repeated_phrases(
            latest,
            previous.as_ref(),
            MAX_PATTERNS,
        ));
    }
    dedupe_in_place(&mut patterns);
    patterns.truncate(MAX_PATTERNS);

    Repetition {
        detected,
        confidence,
        similarity,
        patterns,
    }
}

/// Minimum similarity against the window of recent prior turns, or `None` when
/// the check is disabled or there is not enough history yet.
fn near_duplicate_similarity<S: AsRef<str>>(
    prior_outputs: &[S],
    latest: &str,
    config: &SpindleConfig,
) -> Option<f64> {
    if config.max_similar_outputs == 0 || config.similarity_threshold <= 0.0 {
        return None;
    }
    let required = config.max_similar_outputs.saturating_sub(1).max(1) as usize;
    if prior_outputs.len() < required {
        return None;
    }
    prior_outputs[prior_outputs.len() - required..]
        .iter()
        .map(|prior| compute_similarity(latest, prior.as_ref()))
        .min_by(f64::total_cmp)
}

fn dedupe_in_place(patterns: &mut Vec<String>) {
    let mut seen = HashSet::new();
    patterns.retain(|pattern| seen.insert(pattern.clone()));
}
