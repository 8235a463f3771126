//! Test-only helpers for constructing sectors, inventories and diffs.

use crate::core::types::{ClassificationConfidence, ModuleInfo, Sector, SectorState};

/// Fixed wall clock used by tests (2024-01-01T00:00:00Z in epoch ms).
pub const NOW: i64 = 1_704_067_200_000;

/// One day in epoch milliseconds.
pub const DAY_MS: i64 = 86_400_000;

/// Create a production module entry with medium confidence.
pub fn module(path: &str, file_count: u32) -> ModuleInfo {
    ModuleInfo {
        path: path.to_string(),
        file_count,
        production_file_count: None,
        purpose: format!("{} purpose", path),
        production: true,
        classification_confidence: ClassificationConfidence::Medium,
    }
}

/// Create a never-scanned production sector with medium confidence.
pub fn sector(path: &str, file_count: u32) -> Sector {
    let mut sector = Sector::new(path);
    sector.purpose = format!("{} purpose", path);
    sector.file_count = file_count;
    sector.production_file_count = file_count;
    sector.classification_confidence = ClassificationConfidence::Medium;
    sector
}

/// Create a sector that was last scanned one hour before [`NOW`].
pub fn scanned_sector(
    path: &str,
    file_count: u32,
    scan_count: u32,
    last_scanned_cycle: u64,
    proposal_yield: f64,
) -> Sector {
    let mut sector = sector(path, file_count);
    sector.scan_count = scan_count;
    sector.last_scanned_cycle = last_scanned_cycle;
    sector.last_scanned_at = NOW - 3_600_000;
    sector.proposal_yield = proposal_yield;
    sector
}

/// Wrap sectors in a state document built at [`NOW`].
pub fn state(sectors: Vec<Sector>) -> SectorState {
    SectorState::new(sectors, NOW)
}

/// Render a unified diff for a single file adding and removing the given lines.
pub fn unified_diff(file: &str, added: &[&str], removed: &[&str]) -> String {
    let mut diff = format!(
        "diff --git a/{file} b/{file}\n--- a/{file}\n+++ b/{file}\n@@ -1,1 +1,1 @@\n"
    );
    for line in removed {
        diff.push('-');
        diff.push_str(line);
        diff.push('\n');
    }
    for line in added {
        diff.push('+');
        diff.push_str(line);
        diff.push('\n');
    }
    diff
}
