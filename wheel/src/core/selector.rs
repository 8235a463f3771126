//! Deterministic selection of the next sector to scan.

use std::cmp::Ordering;

use crate::core::path::sector_scope;
use crate::core::types::{ClassificationConfidence, ScopeSelection, Sector, SectorState};

const DAY_MS: i64 = 86_400_000;
const STALE_AGE_MS: i64 = 7 * DAY_MS;

const POLISH_MIN_SCANS: u32 = 5;
const POLISH_MAX_YIELD: f64 = 0.3;
const POLISH_MAX_SUCCESS_RATE: f64 = 0.3;

const BARREN_MIN_SCANS: u32 = 2;
const BARREN_MAX_YIELD: f64 = 0.5;

const HIGH_FAILURE_MIN_FAILURES: u32 = 3;
const HIGH_FAILURE_RATE: f64 = 0.6;

/// Sectors need this many cycles since their last scan to be revisited
/// when no production sector qualifies.
const REVISIT_MIN_CYCLES: u64 = 2;

/// Pick the next sector to scan and its scope glob.
///
/// Refreshes polish marks on every sector before ranking, so the state is
/// mutated even when `None` is returned.
pub fn pick_next_sector(
    state: &mut SectorState,
    current_cycle: u64,
    now: i64,
) -> Option<ScopeSelection> {
    refresh_polish(state, now);

    let candidates = candidate_indices(&state.sectors, current_cycle);
    let best = candidates
        .into_iter()
        .map(|idx| &state.sectors[idx])
        .min_by(|a, b| compare_sectors(a, b, now))?;

    Some(ScopeSelection {
        sector: best.clone(),
        scope: sector_scope(&best.path),
    })
}

/// True when repeated scanning of `sector` has stopped producing value.
pub fn is_polish_candidate(sector: &Sector) -> bool {
    sector.scan_count >= POLISH_MIN_SCANS
        && sector.proposal_yield < POLISH_MAX_YIELD
        && (sector.total_outcomes() < 2 || sector.success_rate() < POLISH_MAX_SUCCESS_RATE)
}

/// Stamp newly polished sectors with `now` and clear sectors that recovered.
pub fn refresh_polish(state: &mut SectorState, now: i64) {
    for sector in &mut state.sectors {
        if is_polish_candidate(sector) {
            if sector.polished_at == 0 {
                sector.polished_at = now;
            }
        } else {
            sector.polished_at = 0;
        }
    }
}

fn candidate_indices(sectors: &[Sector], current_cycle: u64) -> Vec<usize> {
    let tiers: [&dyn Fn(&Sector) -> bool; 3] = [
        &|s: &Sector| s.production && s.file_count > 0,
        &|s: &Sector| {
            s.file_count > 0
                && current_cycle.saturating_sub(s.last_scanned_cycle) >= REVISIT_MIN_CYCLES
        },
        &|s: &Sector| !s.production && s.file_count > 0,
    ];

    for tier in tiers {
        let matches: Vec<usize> = sectors
            .iter()
            .enumerate()
            .filter(|(_, sector)| tier(sector))
            .map(|(idx, _)| idx)
            .collect();
        if !matches.is_empty() {
            return matches;
        }
    }
    Vec::new()
}

/// Rank two sectors; `Less` means `a` should be scanned first.
///
/// The first differentiating rule wins:
/// polished last, never-scanned first, lower last cycle first, older of two
/// week-stale sectors first, low confidence first, barren last, high-failure
/// last, higher yield first, more successes first, then path.
pub fn compare_sectors(a: &Sector, b: &Sector, now: i64) -> Ordering {
    a.is_polished()
        .cmp(&b.is_polished())
        .then_with(|| a.is_scanned().cmp(&b.is_scanned()))
        .then_with(|| a.last_scanned_cycle.cmp(&b.last_scanned_cycle))
        .then_with(|| compare_staleness(a, b, now))
        .then_with(|| is_low_confidence(b).cmp(&is_low_confidence(a)))
        .then_with(|| is_barren(a).cmp(&is_barren(b)))
        .then_with(|| is_high_failure(a).cmp(&is_high_failure(b)))
        .then_with(|| b.proposal_yield.total_cmp(&a.proposal_yield))
        .then_with(|| b.success_count.cmp(&a.success_count))
        .then_with(|| a.path.cmp(&b.path))
}

fn compare_staleness(a: &Sector, b: &Sector, now: i64) -> Ordering {
    if !a.is_scanned() || !b.is_scanned() {
        return Ordering::Equal;
    }
    let age_a = now - a.last_scanned_at;
    let age_b = now - b.last_scanned_at;
    if age_a > STALE_AGE_MS && age_b > STALE_AGE_MS && (age_a - age_b).abs() > DAY_MS {
        return a.last_scanned_at.cmp(&b.last_scanned_at);
    }
    Ordering::Equal
}

fn is_low_confidence(sector: &Sector) -> bool {
    sector.classification_confidence == ClassificationConfidence::Low
}

fn is_barren(sector: &Sector) -> bool {
    sector.scan_count > BARREN_MIN_SCANS && sector.proposal_yield < BARREN_MAX_YIELD
}

fn is_high_failure(sector: &Sector) -> bool {
    sector.failure_count >= HIGH_FAILURE_MIN_FAILURES && sector.failure_rate() > HIGH_FAILURE_RATE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{DAY_MS as TEST_DAY_MS, NOW, scanned_sector, sector, state};

    #[test]
    fn never_scanned_sector_always_wins() {
        let mut best_yield = scanned_sector("a", 10, 1, 1, 9.0);
        best_yield.success_count = 10;
        let mut failing = scanned_sector("b", 10, 1, 1, 0.0);
        failing.failure_count = 10;
        let mut doc = state(vec![best_yield, failing, sector("z", 1)]);

        let picked = pick_next_sector(&mut doc, 5, NOW).expect("pick");
        assert_eq!(picked.sector.path, "z");
        assert_eq!(picked.scope, "z/**");
    }

    #[test]
    fn higher_yield_wins_among_equals() {
        let mut doc = state(vec![
            scanned_sector("low", 10, 1, 3, 1.0),
            scanned_sector("high", 10, 1, 3, 2.0),
        ]);
        let picked = pick_next_sector(&mut doc, 5, NOW).expect("pick");
        assert_eq!(picked.sector.path, "high");
    }

    #[test]
    fn more_stale_cycle_wins() {
        let mut doc = state(vec![
            scanned_sector("recent", 10, 1, 4, 3.0),
            scanned_sector("stale", 10, 1, 2, 0.6),
        ]);
        let picked = pick_next_sector(&mut doc, 5, NOW).expect("pick");
        assert_eq!(picked.sector.path, "stale");
    }

    #[test]
    fn older_of_two_week_stale_sectors_wins() {
        let mut older = scanned_sector("older", 10, 1, 3, 0.6);
        older.last_scanned_at = NOW - 10 * TEST_DAY_MS;
        let mut newer = scanned_sector("newer", 10, 1, 3, 3.0);
        newer.last_scanned_at = NOW - 8 * TEST_DAY_MS;
        let mut doc = state(vec![newer, older]);

        let picked = pick_next_sector(&mut doc, 5, NOW).expect("pick");
        assert_eq!(picked.sector.path, "older");
    }

    #[test]
    fn staleness_within_a_day_falls_through_to_yield() {
        let mut a = scanned_sector("a", 10, 1, 3, 0.6);
        a.last_scanned_at = NOW - 9 * TEST_DAY_MS;
        let mut b = scanned_sector("b", 10, 1, 3, 3.0);
        b.last_scanned_at = NOW - 9 * TEST_DAY_MS + 3_600_000;
        let mut doc = state(vec![a, b]);

        let picked = pick_next_sector(&mut doc, 5, NOW).expect("pick");
        assert_eq!(picked.sector.path, "b");
    }

    #[test]
    fn low_confidence_sorts_before_higher_yield() {
        let mut uncertain = scanned_sector("uncertain", 10, 1, 3, 0.6);
        uncertain.classification_confidence = ClassificationConfidence::Low;
        let confident = scanned_sector("confident", 10, 1, 3, 3.0);
        let mut doc = state(vec![confident, uncertain]);

        let picked = pick_next_sector(&mut doc, 5, NOW).expect("pick");
        assert_eq!(picked.sector.path, "uncertain");
    }

    #[test]
    fn barren_and_high_failure_sort_last() {
        let barren = scanned_sector("barren", 10, 3, 3, 0.4);
        let mut failing = scanned_sector("failing", 10, 1, 3, 4.0);
        failing.failure_count = 4;
        failing.success_count = 1;
        let healthy = scanned_sector("healthy", 10, 1, 3, 0.6);

        let now = NOW;
        let mut ranked = [barren, failing, healthy];
        ranked.sort_by(|a, b| compare_sectors(a, b, now));
        let order: Vec<&str> = ranked.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(order, vec!["healthy", "failing", "barren"]);
    }

    #[test]
    fn polished_sector_sorts_last_and_is_stamped() {
        let dull = scanned_sector("dull", 10, 6, 1, 0.1);
        let busy = scanned_sector("busy", 10, 2, 4, 1.0);
        let mut doc = state(vec![dull, busy]);

        let picked = pick_next_sector(&mut doc, 5, NOW).expect("pick");
        assert_eq!(picked.sector.path, "busy");
        assert_eq!(doc.find("dull").expect("dull").polished_at, NOW);
        assert_eq!(doc.find("busy").expect("busy").polished_at, 0);
    }

    #[test]
    fn polish_clears_once_condition_stops_holding() {
        let mut dull = scanned_sector("dull", 10, 6, 1, 0.1);
        dull.polished_at = NOW - TEST_DAY_MS;
        let mut doc = state(vec![dull]);
        pick_next_sector(&mut doc, 5, NOW);
        assert_eq!(doc.sectors[0].polished_at, NOW - TEST_DAY_MS);

        doc.sectors[0].proposal_yield = 0.5;
        pick_next_sector(&mut doc, 6, NOW);
        assert_eq!(doc.sectors[0].polished_at, 0);
    }

    #[test]
    fn successful_sector_is_not_polished() {
        let mut s = scanned_sector("s", 10, 6, 1, 0.1);
        s.success_count = 3;
        s.failure_count = 1;
        assert!(!is_polish_candidate(&s));
    }

    #[test]
    fn root_sector_scope_is_top_level_only() {
        let mut doc = state(vec![sector(".", 4)]);
        let picked = pick_next_sector(&mut doc, 1, NOW).expect("pick");
        assert_eq!(picked.scope, "*");
    }

    #[test]
    fn widens_to_non_production_when_nothing_else_qualifies() {
        let mut tests = sector("tests", 5);
        tests.production = false;
        let empty = sector("src", 0);
        let mut doc = state(vec![empty, tests]);

        let picked = pick_next_sector(&mut doc, 1, NOW).expect("pick");
        assert_eq!(picked.sector.path, "tests");
    }

    #[test]
    fn revisit_tier_skips_sectors_scanned_last_cycle() {
        let build = |stale_cycle: u64| {
            let mut stale = scanned_sector("stale", 5, 6, stale_cycle, 0.1);
            stale.production = false;
            stale.production_file_count = 0;
            let mut recent = scanned_sector("recent", 5, 1, 4, 0.1);
            recent.production = false;
            recent.production_file_count = 0;
            state(vec![stale, recent])
        };

        let mut doc = build(2);
        let picked = pick_next_sector(&mut doc, 5, NOW).expect("pick");
        assert!(doc.find("stale").expect("stale").is_polished());
        assert_eq!(picked.sector.path, "stale");

        let mut doc = build(4);
        let picked = pick_next_sector(&mut doc, 5, NOW).expect("pick");
        assert_eq!(picked.sector.path, "recent");
    }

    #[test]
    fn returns_none_when_no_sector_has_files() {
        let mut doc = state(vec![sector("src", 0)]);
        assert!(pick_next_sector(&mut doc, 1, NOW).is_none());
    }

    #[test]
    fn selection_is_deterministic() {
        let build = || {
            state(vec![
                scanned_sector("b", 10, 1, 3, 1.0),
                scanned_sector("a", 10, 1, 3, 1.0),
                scanned_sector("c", 10, 1, 3, 1.0),
            ])
        };
        let first = pick_next_sector(&mut build(), 5, NOW).expect("pick");
        let second = pick_next_sector(&mut build(), 5, NOW).expect("pick");
        assert_eq!(first, second);
        assert_eq!(first.sector.path, "a");
    }
}
