//! Text primitives shared by the loop detectors.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Fragments shorter than this are too generic to count as a repeated phrase.
const MIN_PHRASE_CHARS: usize = 20;
/// Reported phrases are cut to this many characters.
const PHRASE_PREVIEW_CHARS: usize = 60;

static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+\s+|\n+").expect("sentence boundary regex"));

/// Coarse token estimate: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> u64 {
    text.chars().count().div_ceil(4) as u64
}

/// Jaccard similarity of the case-folded, punctuation-free word sets of `a` and `b`.
///
/// Two empty inputs are identical (1.0); exactly one empty input scores 0.0.
pub fn compute_similarity(a: &str, b: &str) -> f64 {
    let left = word_set(a);
    let right = word_set(b);
    match (left.is_empty(), right.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        (false, false) => {}
    }
    let shared = left.intersection(&right).count();
    let union = left.union(&right).count();
    shared as f64 / union as f64
}

fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect()
}

/// Sentence fragments (at least 20 characters) that appear in both `a` and `b`.
///
/// Matching ignores case and surrounding whitespace. Each match is cut to 60
/// characters followed by `...`; at most `max_results` are returned, in the
/// order they appear in `a`.
pub fn find_repeated_phrases(a: &str, b: &str, max_results: usize) -> Vec<String> {
    if max_results == 0 {
        return Vec::new();
    }
    let in_b: HashSet<String> = fragments(b).map(|f| f.to_lowercase()).collect();

    let mut seen = HashSet::new();
    let mut phrases = Vec::new();
    for fragment in fragments(a) {
        let key = fragment.to_lowercase();
        if !in_b.contains(&key) || !seen.insert(key) {
            continue;
        }
        let preview: String = fragment.chars().take(PHRASE_PREVIEW_CHARS).collect();
        phrases.push(format!("{}...", preview));
        if phrases.len() >= max_results {
            break;
        }
    }
    phrases
}

fn fragments(text: &str) -> impl Iterator<Item = &str> {
    SENTENCE_BOUNDARY
        .split(text)
        .map(|fragment| fragment.trim().trim_end_matches(['.', '!', '?']))
        .filter(|fragment| fragment.chars().count() >= MIN_PHRASE_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("test"), 1);
        assert_eq!(estimate_tokens("hello world"), 3);
        assert_eq!(estimate_tokens(&"a".repeat(100)), 25);
    }

    #[test]
    fn similarity_matches_jaccard_on_words() {
        let score = compute_similarity("the quick brown fox", "the slow brown dog");
        assert!((score - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn similarity_empty_rules() {
        assert_eq!(compute_similarity("", ""), 1.0);
        assert_eq!(compute_similarity("", "words"), 0.0);
        assert_eq!(compute_similarity("words", "   "), 0.0);
    }

    #[test]
    fn similarity_is_symmetric_bounded_and_reflexive() {
        let pairs = [
            ("fix the parser", "fix the lexer and parser"),
            ("alpha beta", "gamma delta"),
            ("one", "one one one"),
        ];
        for (a, b) in pairs {
            let ab = compute_similarity(a, b);
            assert_eq!(ab, compute_similarity(b, a));
            assert!((0.0..=1.0).contains(&ab));
            assert_eq!(compute_similarity(a, a), 1.0);
        }
    }

    #[test]
    fn similarity_ignores_case_and_punctuation() {
        assert_eq!(
            compute_similarity("Let me FIX this, now!", "let me fix this now"),
            1.0
        );
    }

    #[test]
    fn repeated_phrases_are_shared_long_fragments() {
        let a = "I will update the config loader now. Short one. Then run the tests again!";
        let b = "then run the tests again. I will update the config loader now.";
        let phrases = find_repeated_phrases(a, b, 5);
        assert_eq!(
            phrases,
            vec![
                "I will update the config loader now...".to_string(),
                "Then run the tests again...".to_string(),
            ]
        );
    }

    #[test]
    fn repeated_phrases_are_truncated_and_capped() {
        let long = "x".repeat(80);
        let phrases = find_repeated_phrases(&long, &long, 5);
        assert_eq!(phrases.len(), 1);
        assert_eq!(phrases[0], format!("{}...", "x".repeat(60)));

        let many = (0..8)
            .map(|i| format!("this is repeated sentence number {}", i))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(find_repeated_phrases(&many, &many, 5).len(), 5);
    }
}
