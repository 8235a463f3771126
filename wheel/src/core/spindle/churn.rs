//! Per-file edit counting to surface churn on the same files.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::LazyLock;

use regex::Regex;

/// Maximum number of distinct files tracked per cycle.
pub const MAX_TRACKED_FILES: usize = 200;

static FILE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^(?:diff --git a/\S+ b/(?P<git>\S+)|\+\+\+ b/(?P<plus>\S+)|\*\*\* (?:Update|Add) File: (?P<patch>.+?))\s*$",
    )
    .expect("file marker regex")
});

/// Edit counts keyed by file path, capped at [`MAX_TRACKED_FILES`] keys.
///
/// When a new file arrives at the cap, the file tracked longest is evicted.
#[derive(Debug, Clone, Default)]
pub struct FileEditCounts {
    counts: HashMap<String, u32>,
    order: VecDeque<String>,
}

impl FileEditCounts {
    /// Count one edit for each file touched by `diff`.
    pub fn record_diff(&mut self, diff: &str) {
        for file in touched_files(diff) {
            self.increment(file);
        }
    }

    fn increment(&mut self, file: String) {
        if let Some(count) = self.counts.get_mut(&file) {
            *count += 1;
            return;
        }
        while self.order.len() >= MAX_TRACKED_FILES {
            if let Some(oldest) = self.order.pop_front() {
                self.counts.remove(&oldest);
            }
        }
        self.order.push_back(file.clone());
        self.counts.insert(file, 1);
    }

    pub fn get(&self, file: &str) -> u32 {
        self.counts.get(file).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Files edited more than `max_edits` times, highest count first then by path.
    pub fn over_threshold(&self, max_edits: u32) -> Vec<(&str, u32)> {
        let mut hot: Vec<(&str, u32)> = self
            .counts
            .iter()
            .filter(|(_, count)| **count > max_edits)
            .map(|(file, count)| (file.as_str(), *count))
            .collect();
        hot.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        hot
    }
}

/// Files referenced by git or apply-patch headers in `diff`, each listed once.
pub fn touched_files(diff: &str) -> BTreeSet<String> {
    FILE_MARKER
        .captures_iter(diff)
        .filter_map(|caps| {
            caps.name("git")
                .or_else(|| caps.name("plus"))
                .or_else(|| caps.name("patch"))
        })
        .map(|m| m.as_str().trim().to_string())
        .filter(|file| !file.is_empty())
        .collect()
}

/// Human-readable warnings for files edited more than `max_file_edits` times.
///
/// A threshold of 0 disables the check.
pub fn file_edit_warnings(counts: &FileEditCounts, max_file_edits: u32) -> Vec<String> {
    if max_file_edits == 0 {
        return Vec::new();
    }
    counts
        .over_threshold(max_file_edits)
        .into_iter()
        .map(|(file, count)| {
            format!(
                "{} edited {} times this cycle (threshold {})",
                file, count, max_file_edits
            )
        })
        .collect()
}
