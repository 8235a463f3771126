//! Failing-command history: QA ping-pong and persistent command failures.

use std::collections::VecDeque;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Maximum number of failing command signatures retained.
pub const MAX_COMMAND_SIGNATURES: usize = 20;
const MAX_SIGNATURE_CHARS: usize = 120;

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("digits regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// A failing command paired with the normalized shape of its error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSignature {
    pub command: String,
    pub error_signature: String,
}

impl CommandSignature {
    pub fn new(command: &str, error_message: &str) -> Self {
        Self {
            command: command.trim().to_string(),
            error_signature: error_signature(error_message),
        }
    }
}

impl std::fmt::Display for CommandSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} => {}", self.command, self.error_signature)
    }
}

/// Reduce an error message to a stable signature.
///
/// Takes the first non-blank line, lowercases it, replaces digit runs with `N`
/// (line numbers, pids, durations) and collapses whitespace.
pub fn error_signature(error_message: &str) -> String {
    let first_line = error_message
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_lowercase();
    let without_digits = DIGITS.replace_all(&first_line, "N");
    let collapsed = WHITESPACE.replace_all(&without_digits, " ");
    collapsed.chars().take(MAX_SIGNATURE_CHARS).collect()
}

/// Append a signature to the ring, evicting the oldest entry beyond the cap.
pub(crate) fn push_signature(ring: &mut VecDeque<CommandSignature>, signature: CommandSignature) {
    ring.push_back(signature);
    while ring.len() > MAX_COMMAND_SIGNATURES {
        ring.pop_front();
    }
}

/// Classification of the failing-command tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandVerdict {
    /// The tail alternates between two distinct failures for `cycles` A,B pairs.
    PingPong {
        cycles: u32,
        first: CommandSignature,
        second: CommandSignature,
    },
    /// The same failure repeated `count` times in a row.
    Repeated {
        count: u32,
        signature: CommandSignature,
    },
}

/// Classify the signature history. Ping-pong is checked before repeated failures.
///
/// A threshold of 0 disables the corresponding check.
pub fn classify_command_failures(
    ring: &VecDeque<CommandSignature>,
    max_qa_ping_pong: u32,
    max_command_failures: u32,
) -> Option<CommandVerdict> {
    if max_qa_ping_pong > 0 {
        let alternating = alternating_tail_len(ring);
        let cycles = (alternating / 2) as u32;
        if cycles >= max_qa_ping_pong {
            let len = ring.len();
            return Some(CommandVerdict::PingPong {
                cycles,
                first: ring[len - 2].clone(),
                second: ring[len - 1].clone(),
            });
        }
    }

    if max_command_failures > 0 {
        let count = repeated_tail_len(ring) as u32;
        if count >= max_command_failures {
            let signature = ring.back()?.clone();
            return Some(CommandVerdict::Repeated { count, signature });
        }
    }
    None
}

/// Length of the longest suffix strictly alternating between two distinct entries.
fn alternating_tail_len(ring: &VecDeque<CommandSignature>) -> usize {
    let len = ring.len();
    if len < 2 || ring[len - 1] == ring[len - 2] {
        return 0;
    }
    let mut run = 2;
    while run < len {
        let idx = len - run - 1;
        if ring[idx] != ring[idx + 2] {
            break;
        }
        run += 1;
    }
    run
}

/// Number of identical entries at the end of the ring.
fn repeated_tail_len(ring: &VecDeque<CommandSignature>) -> usize {
    let Some(last) = ring.back() else {
        return 0;
    };
    ring.iter().rev().take_while(|entry| *entry == last).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_of(entries: &[(&str, &str)]) -> VecDeque<CommandSignature> {
        let mut ring = VecDeque::new();
        for (command, error) in entries {
            push_signature(&mut ring, CommandSignature::new(command, error));
        }
        ring
    }

    #[test]
    fn signature_normalizes_digits_case_and_whitespace() {
        assert_eq!(
            error_signature("\n  Error at line 42:   Expected  `;`\nstack..."),
            "error at line N: expected `;`"
        );
        assert_eq!(
            error_signature("error at line 7: expected `;`"),
            error_signature("ERROR at line 1234: expected `;`")
        );
        assert_eq!(error_signature(""), "");
    }

    #[test]
    fn ring_keeps_last_twenty() {
        let mut ring = VecDeque::new();
        for i in 0..25 {
            push_signature(
                &mut ring,
                CommandSignature {
                    command: format!("cmd-{}", i),
                    error_signature: "boom".to_string(),
                },
            );
        }
        assert_eq!(ring.len(), MAX_COMMAND_SIGNATURES);
        assert_eq!(ring.front().expect("front").command, "cmd-5");
    }

    #[test]
    fn alternating_failures_ping_pong_after_enough_cycles() {
        let ring = ring_of(&[
            ("cargo test", "test a failed"),
            ("cargo test", "test b failed"),
            ("cargo test", "test a failed"),
            ("cargo test", "test b failed"),
        ]);
        assert!(matches!(
            classify_command_failures(&ring, 2, 3),
            Some(CommandVerdict::PingPong { cycles: 2, .. })
        ));
        assert_eq!(classify_command_failures(&ring, 3, 3), None);
    }

    #[test]
    fn three_distinct_signatures_are_not_ping_pong() {
        let ring = ring_of(&[
            ("cargo test", "a"),
            ("cargo test", "b"),
            ("cargo test", "c"),
            ("cargo test", "b"),
        ]);
        assert_eq!(alternating_tail_len(&ring), 3);
        assert_eq!(classify_command_failures(&ring, 2, 3), None);
    }

    #[test]
    fn identical_failures_repeat() {
        let ring = ring_of(&[
            ("npm test", "cannot find module x"),
            ("npm test", "cannot find module x"),
            ("npm test", "cannot find module x"),
        ]);
        assert!(matches!(
            classify_command_failures(&ring, 3, 3),
            Some(CommandVerdict::Repeated { count: 3, .. })
        ));
    }

    #[test]
    fn distinct_errors_for_same_command_do_not_repeat() {
        let ring = ring_of(&[
            ("npm test", "cannot find module x"),
            ("npm test", "cannot find module y"),
            ("npm test", "type error in z"),
        ]);
        assert_eq!(classify_command_failures(&ring, 3, 3), None);
    }

    #[test]
    fn zero_thresholds_disable_checks() {
        let ring = ring_of(&[("make", "e"), ("make", "e"), ("make", "e")]);
        assert_eq!(classify_command_failures(&ring, 0, 0), None);
    }
}
