//! Semantic invariants not expressible via JSON Schema.

use std::collections::HashSet;

use crate::core::path::normalize_sector_path;
use crate::core::types::SectorState;

/// Check semantic invariants of a sector state document:
/// - No duplicate paths
/// - Paths are already normalized
/// - `production_file_count <= file_count`
/// - `proposal_yield` is finite and non-negative
pub fn validate_invariants(state: &SectorState) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    for sector in &state.sectors {
        let path = sector.path.as_str();
        if !seen.insert(path) {
            errors.push(format!("duplicate sector path '{}'", path));
        }
        if normalize_sector_path(path) != path {
            errors.push(format!("{}: path is not normalized", path));
        }
        if sector.production_file_count > sector.file_count {
            errors.push(format!(
                "{}: production_file_count {} exceeds file_count {}",
                path, sector.production_file_count, sector.file_count
            ));
        }
        if !sector.proposal_yield.is_finite() || sector.proposal_yield < 0.0 {
            errors.push(format!(
                "{}: proposal_yield must be a non-negative number",
                path
            ));
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sector, state};

    #[test]
    fn valid_state_has_no_errors() {
        let doc = state(vec![sector("src", 3), sector(".", 1)]);
        assert!(validate_invariants(&doc).is_empty());
    }

    #[test]
    fn reports_duplicates_and_bad_counts() {
        let mut bad = sector("src", 2);
        bad.production_file_count = 5;
        let doc = state(vec![sector("src", 3), bad, sector("./lib/", 1)]);

        let errors = validate_invariants(&doc);
        assert!(errors.iter().any(|err| err.contains("duplicate sector path")));
        assert!(errors.iter().any(|err| err.contains("exceeds file_count")));
        assert!(errors.iter().any(|err| err.contains("not normalized")));
    }
}
