//! Read-only queries over sector history: difficulty, coverage, scope and affinity.

use crate::core::types::{
    CategoryAffinity, ClassificationConfidence, CoverageReport, Difficulty, ScopeAdjustment,
    Sector, SectorState,
};

const MIN_OUTCOMES_FOR_DIFFICULTY: u32 = 3;
const HARD_FAILURE_RATE: f64 = 0.6;
const MODERATE_FAILURE_RATE: f64 = 0.3;

const WIDEN_MAX_AVG_YIELD: f64 = 0.3;
const NARROW_TOP_N: usize = 3;
const NARROW_CONCENTRATION: f64 = 2.0;

const AFFINITY_MIN_ATTEMPTS: u32 = 3;
const AFFINITY_BOOST_RATE: f64 = 0.6;
const AFFINITY_SUPPRESS_RATE: f64 = 0.3;

/// Difficulty bucket from the sector's failure rate.
pub fn sector_difficulty(sector: &Sector) -> Difficulty {
    if sector.total_outcomes() < MIN_OUTCOMES_FOR_DIFFICULTY {
        return Difficulty::Easy;
    }
    let rate = sector.failure_rate();
    if rate > HARD_FAILURE_RATE {
        Difficulty::Hard
    } else if rate > MODERATE_FAILURE_RATE {
        Difficulty::Moderate
    } else {
        Difficulty::Easy
    }
}

/// Proposal confidence floor for a sector: harder sectors demand more.
pub fn sector_min_confidence(sector: &Sector, base: u32) -> u32 {
    let bump = match sector_difficulty(sector) {
        Difficulty::Hard => 20,
        Difficulty::Moderate => 10,
        Difficulty::Easy => 0,
    };
    base.saturating_add(bump).min(100)
}

/// Fraction of production sectors and files scanned at least once.
pub fn compute_coverage(state: &SectorState) -> CoverageReport {
    let production: Vec<&Sector> = state.sectors.iter().filter(|s| s.production).collect();
    let scanned: Vec<&&Sector> = production.iter().filter(|s| s.is_scanned()).collect();

    let total_files: u64 = production
        .iter()
        .map(|s| u64::from(s.production_file_count))
        .sum();
    let scanned_files: u64 = scanned
        .iter()
        .map(|s| u64::from(s.production_file_count))
        .sum();

    CoverageReport {
        scanned_sectors: scanned.len(),
        total_sectors: production.len(),
        scanned_files,
        total_files,
        sector_percent: percent(scanned.len() as u64, production.len() as u64),
        file_percent: percent(scanned_files, total_files),
        unclassified_sectors: state
            .sectors
            .iter()
            .filter(|s| s.classification_confidence == ClassificationConfidence::Low)
            .count(),
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

/// Suggest narrowing or widening the scan scope from yield distribution.
///
/// - `Widen` when the average yield of scanned sectors is below 0.3.
/// - `Narrow` when the top three scanned sectors average more than twice the
///   overall average (requires more than three scanned sectors).
/// - `Stable` otherwise, including when nothing has been scanned.
pub fn suggest_scope_adjustment(state: &SectorState) -> ScopeAdjustment {
    let mut yields: Vec<f64> = state
        .sectors
        .iter()
        .filter(|s| s.scan_count > 0)
        .map(|s| s.proposal_yield)
        .collect();
    if yields.is_empty() {
        return ScopeAdjustment::Stable;
    }

    let average = mean(&yields);
    if average < WIDEN_MAX_AVG_YIELD {
        return ScopeAdjustment::Widen;
    }

    if yields.len() > NARROW_TOP_N {
        yields.sort_by(|a, b| b.total_cmp(a));
        let top = mean(&yields[..NARROW_TOP_N]);
        if top > NARROW_CONCENTRATION * average {
            return ScopeAdjustment::Narrow;
        }
    }
    ScopeAdjustment::Stable
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Categories with enough attempts that clearly succeed (boost) or fail (suppress).
pub fn sector_category_affinity(sector: &Sector) -> CategoryAffinity {
    let mut affinity = CategoryAffinity::default();
    for (category, stats) in &sector.category_stats {
        let attempts = stats.attempts();
        if attempts < AFFINITY_MIN_ATTEMPTS {
            continue;
        }
        let rate = f64::from(stats.success) / f64::from(attempts);
        if rate > AFFINITY_BOOST_RATE {
            affinity.boost.push(category.clone());
        } else if rate < AFFINITY_SUPPRESS_RATE {
            affinity.suppress.push(category.clone());
        }
    }
    affinity
}
