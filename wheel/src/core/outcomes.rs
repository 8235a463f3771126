//! Scheduler-owned state transitions for scan, ticket and merge events.
//!
//! Every entry point looks the sector up by normalized path. Unknown paths are
//! a no-op and report `false`.

use crate::core::path::normalize_sector_path;
use crate::core::types::{ClassificationConfidence, Reclassification, SectorState};

/// Weight kept from the previous yield when folding in a new scan.
const YIELD_EMA_KEEP: f64 = 0.7;
/// Outcome counters decay every time their total reaches a multiple of this.
const OUTCOME_DECAY_PERIOD: u32 = 20;
const OUTCOME_DECAY_FACTOR: f64 = 0.7;

/// Record a completed scan of `path` during `cycle`.
pub fn record_scan_result(
    state: &mut SectorState,
    path: &str,
    cycle: u64,
    proposal_count: u32,
    reclassification: Option<&Reclassification>,
    now: i64,
) -> bool {
    let path = normalize_sector_path(path);
    let Some(sector) = state.find_mut(&path) else {
        return false;
    };

    sector.last_scanned_at = now;
    sector.last_scanned_cycle = cycle;
    sector.scan_count += 1;
    sector.proposal_yield = YIELD_EMA_KEEP * sector.proposal_yield
        + (1.0 - YIELD_EMA_KEEP) * f64::from(proposal_count);

    if let Some(hint) =
        reclassification.filter(|hint| hint.confidence >= ClassificationConfidence::Medium)
    {
        if let Some(production) = hint.production {
            sector.set_production(production);
        }
        if let Some(purpose) = &hint.purpose {
            sector.purpose = purpose.clone();
        }
        sector.classification_confidence = hint.confidence;
    }
    true
}

/// Record a ticket success or failure for `path`, optionally tagged with a category.
///
/// When the total outcome count reaches a multiple of 20, both counters decay
/// by ×0.7 (rounded to the nearest integer).
pub fn record_ticket_outcome(
    state: &mut SectorState,
    path: &str,
    success: bool,
    category: Option<&str>,
) -> bool {
    let path = normalize_sector_path(path);
    let Some(sector) = state.find_mut(&path) else {
        return false;
    };

    if success {
        sector.success_count += 1;
    } else {
        sector.failure_count += 1;
    }

    let total = sector.total_outcomes();
    if total > 0 && total % OUTCOME_DECAY_PERIOD == 0 {
        sector.success_count = decay(sector.success_count);
        sector.failure_count = decay(sector.failure_count);
    }

    if let Some(category) = category.map(str::trim).filter(|c| !c.is_empty()) {
        let stats = sector
            .category_stats
            .entry(category.to_string())
            .or_default();
        if success {
            stats.success += 1;
        } else {
            stats.failure += 1;
        }
    }
    true
}

/// Record whether a PR produced from `path` was merged or closed.
pub fn record_merge_outcome(state: &mut SectorState, path: &str, merged: bool) -> bool {
    let path = normalize_sector_path(path);
    let Some(sector) = state.find_mut(&path) else {
        return false;
    };
    if merged {
        sector.merge_count += 1;
    } else {
        sector.closed_count += 1;
    }
    true
}

fn decay(count: u32) -> u32 {
    (f64::from(count) * OUTCOME_DECAY_FACTOR).round() as u32
}
