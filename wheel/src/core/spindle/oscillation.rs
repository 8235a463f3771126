//! Detection of edits that undo each other across consecutive diffs.

use std::collections::BTreeSet;

/// Only the most recent diffs take part in oscillation checks.
const OSCILLATION_WINDOW: usize = 3;

/// Outcome of [`detect_oscillation`].
#[derive(Debug, Clone, PartialEq)]
pub struct Oscillation {
    pub detected: bool,
    pub confidence: f64,
    pub pattern: Option<String>,
}

impl Oscillation {
    fn none() -> Self {
        Self {
            detected: false,
            confidence: 0.0,
            pattern: None,
        }
    }

    fn found(confidence: f64, pattern: String) -> Self {
        Self {
            detected: true,
            confidence,
            pattern: Some(pattern),
        }
    }
}

#[derive(Debug, Default)]
struct DiffLines {
    added: BTreeSet<String>,
    removed: BTreeSet<String>,
}

/// Look for the same content being added then removed (or the reverse) across
/// the last two or three diffs.
///
/// Lines of a single character (`{`, `}`, `)`) are ignored and whitespace is
/// normalized. A three-step add→remove→add cycle scores 0.95; a two-step flip
/// scores `0.6 + 0.3 * overlap / min(|side|)`, so a clean flip scores 0.9.
pub fn detect_oscillation<S: AsRef<str>>(diffs: &[S]) -> Oscillation {
    let start = diffs.len().saturating_sub(OSCILLATION_WINDOW);
    let window: Vec<DiffLines> = diffs[start..]
        .iter()
        .map(|diff| parse_diff_lines(diff.as_ref()))
        .collect();
    if window.len() < 2 {
        return Oscillation::none();
    }

    if let [first, second, third] = window.as_slice() {
        let cycle: Vec<&String> = first
            .added
            .iter()
            .filter(|line| second.removed.contains(*line) && third.added.contains(*line))
            .collect();
        if let Some(line) = cycle.first() {
            return Oscillation::found(0.95, format!("add→remove→add: {}", line));
        }
    }

    // Newest pair first.
    for pair in window.windows(2).rev() {
        let (prev, curr) = (&pair[0], &pair[1]);
        let flips = [
            ("add→remove", &prev.added, &curr.removed),
            ("remove→add", &prev.removed, &curr.added),
        ];
        let moves_forward = replaces_with_new_content(prev, curr);
        let best = flips
            .iter()
            .filter(|(label, _, _)| !(moves_forward && *label == "add→remove"))
            .map(|(label, before, after)| {
                let overlap: Vec<&String> = before.intersection(after).collect();
                (label, before.len().min(after.len()), overlap)
            })
            .filter(|(_, _, overlap)| !overlap.is_empty())
            .max_by_key(|(_, _, overlap)| overlap.len());

        if let Some((label, smaller_side, overlap)) = best {
            let ratio = overlap.len() as f64 / smaller_side as f64;
            return Oscillation::found(
                0.6 + 0.3 * ratio,
                format!("{}: {}", label, overlap[0]),
            );
        }
    }

    Oscillation::none()
}

/// True when `curr` swaps lines for content `prev` never removed, as in
/// stepwise edits of one line (`x = 1` → `x = 2` → `x = 3`).
fn replaces_with_new_content(prev: &DiffLines, curr: &DiffLines) -> bool {
    curr.added.iter().any(|line| !prev.removed.contains(line))
}

fn parse_diff_lines(diff: &str) -> DiffLines {
    let mut lines = DiffLines::default();
    for line in diff.lines() {
        if line.starts_with("+++") || line.starts_with("---") {
            continue;
        }
        let (target, body) = if let Some(body) = line.strip_prefix('+') {
            (&mut lines.added, body)
        } else if let Some(body) = line.strip_prefix('-') {
            (&mut lines.removed, body)
        } else {
            continue;
        };
        let normalized = body.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.chars().count() <= 1 {
            continue;
        }
        target.insert(normalized);
    }
    lines
}
