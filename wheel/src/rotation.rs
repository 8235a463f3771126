//! Sector rotation commands: `wheel refresh`, `next`, `record` and `report`.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::core::metrics::{
    compute_coverage, sector_category_affinity, sector_difficulty, sector_min_confidence,
    suggest_scope_adjustment,
};
use crate::core::outcomes::{record_merge_outcome, record_scan_result, record_ticket_outcome};
use crate::core::sectors::{build_sectors, merge_sectors};
use crate::core::selector::pick_next_sector;
use crate::core::types::{
    CategoryAffinity, CoverageReport, Difficulty, Reclassification, ScopeAdjustment, Sector,
    SectorState,
};
use crate::io::config::load_config;
use crate::io::inventory::load_inventory;
use crate::io::paths::WheelPaths;
use crate::io::sector_store::{load_sector_state, write_sector_state};

/// Result of rebuilding the sector list from an inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub total_sectors: usize,
    /// Sectors whose history was carried over from the previous state.
    pub retained: usize,
    pub added: usize,
    pub dropped: usize,
}

/// Sector picked for the next cycle, with the scan parameters derived from its history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextScope {
    pub path: String,
    pub scope: String,
    pub purpose: String,
    pub difficulty: Difficulty,
    pub min_confidence: u32,
    pub affinity: CategoryAffinity,
}

/// One scan event reported by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanEvent {
    pub path: String,
    pub cycle: u64,
    pub proposal_count: u32,
    pub reclassification: Option<Reclassification>,
}

/// Scheduler overview printed by `wheel report`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationReport {
    pub built_at: i64,
    pub coverage: CoverageReport,
    pub scope_adjustment: ScopeAdjustment,
    pub sectors: Vec<SectorSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorSummary {
    pub path: String,
    pub production: bool,
    pub scan_count: u32,
    pub proposal_yield: f64,
    pub polished: bool,
    pub difficulty: Difficulty,
    pub min_confidence: u32,
    pub affinity: CategoryAffinity,
}

/// Rebuild sectors from the inventory at `inventory_path`, carrying history
/// over from the stored state, and persist the result.
#[instrument(skip_all, fields(root = %root.display(), inventory = %inventory_path.display()))]
pub fn refresh_from_inventory(
    root: &Path,
    inventory_path: &Path,
    now: i64,
) -> Result<RefreshSummary> {
    let paths = initialized_paths(root)?;
    let modules = load_inventory(inventory_path)?;
    let previous = load_sector_state(&paths.schema_path, &paths.sectors_path)
        .context("load previous sector state")?
        .map(|state| state.sectors)
        .unwrap_or_default();

    let merged = merge_sectors(build_sectors(&modules), &previous);
    let summary = summarize_refresh(&merged, &previous);
    write_sector_state(&paths.sectors_path, &SectorState::new(merged, now))?;

    info!(
        total = summary.total_sectors,
        retained = summary.retained,
        added = summary.added,
        dropped = summary.dropped,
        "sectors refreshed"
    );
    Ok(summary)
}

fn summarize_refresh(merged: &[Sector], previous: &[Sector]) -> RefreshSummary {
    let previous_paths: HashSet<&str> = previous.iter().map(|s| s.path.as_str()).collect();
    let merged_paths: HashSet<&str> = merged.iter().map(|s| s.path.as_str()).collect();
    let retained = merged_paths.intersection(&previous_paths).count();
    RefreshSummary {
        total_sectors: merged.len(),
        retained,
        added: merged.len() - retained,
        dropped: previous_paths.len() - retained,
    }
}

/// Pick the sector to scan in `cycle` and persist refreshed polish marks.
///
/// Returns `None` when no state exists yet or no sector qualifies.
#[instrument(skip_all, fields(root = %root.display(), cycle = cycle))]
pub fn next_scope(root: &Path, cycle: u64, now: i64) -> Result<Option<NextScope>> {
    let paths = initialized_paths(root)?;
    let config = load_config(&paths.config_path)?;
    let Some(mut state) = load_sector_state(&paths.schema_path, &paths.sectors_path)? else {
        warn!("no sector state, run `wheel refresh` first");
        return Ok(None);
    };

    let selection = pick_next_sector(&mut state, cycle, now);
    write_sector_state(&paths.sectors_path, &state).context("persist polish marks")?;

    let Some(selection) = selection else {
        debug!("no sector qualifies");
        return Ok(None);
    };
    let sector = &selection.sector;
    debug!(path = %sector.path, scope = %selection.scope, "sector selected");
    Ok(Some(NextScope {
        path: sector.path.clone(),
        scope: selection.scope.clone(),
        purpose: sector.purpose.clone(),
        difficulty: sector_difficulty(sector),
        min_confidence: sector_min_confidence(sector, config.scheduler.base_min_confidence),
        affinity: sector_category_affinity(sector),
    }))
}

/// Fold a scan result into the stored state. Returns `false` for unknown sectors.
#[instrument(skip_all, fields(root = %root.display(), path = %event.path, cycle = event.cycle))]
pub fn record_scan(root: &Path, event: &ScanEvent, now: i64) -> Result<bool> {
    update_state(root, |state| {
        record_scan_result(
            state,
            &event.path,
            event.cycle,
            event.proposal_count,
            event.reclassification.as_ref(),
            now,
        )
    })
}

/// Record a ticket outcome. Returns `false` for unknown sectors.
#[instrument(skip_all, fields(root = %root.display(), path = %path, success = success))]
pub fn record_ticket(
    root: &Path,
    path: &str,
    success: bool,
    category: Option<&str>,
) -> Result<bool> {
    update_state(root, |state| record_ticket_outcome(state, path, success, category))
}

/// Record whether a PR from the sector merged or closed. Returns `false` for unknown sectors.
#[instrument(skip_all, fields(root = %root.display(), path = %path, merged = merged))]
pub fn record_merge(root: &Path, path: &str, merged: bool) -> Result<bool> {
    update_state(root, |state| record_merge_outcome(state, path, merged))
}

fn update_state<F>(root: &Path, apply: F) -> Result<bool>
where
    F: FnOnce(&mut SectorState) -> bool,
{
    let paths = initialized_paths(root)?;
    let mut state = load_sector_state(&paths.schema_path, &paths.sectors_path)?
        .ok_or_else(|| anyhow!("no sector state found, run `wheel refresh` first"))?;
    if !apply(&mut state) {
        debug!("unknown sector, nothing recorded");
        return Ok(false);
    }
    write_sector_state(&paths.sectors_path, &state)?;
    Ok(true)
}

/// Coverage, scope adjustment and per-sector metrics for the stored state.
pub fn build_report(root: &Path) -> Result<RotationReport> {
    let paths = initialized_paths(root)?;
    let config = load_config(&paths.config_path)?;
    let state = load_sector_state(&paths.schema_path, &paths.sectors_path)?
        .unwrap_or_else(|| SectorState::new(Vec::new(), 0));
    let base = config.scheduler.base_min_confidence;

    Ok(RotationReport {
        built_at: state.built_at,
        coverage: compute_coverage(&state),
        scope_adjustment: suggest_scope_adjustment(&state),
        sectors: state
            .sectors
            .iter()
            .map(|sector| SectorSummary {
                path: sector.path.clone(),
                production: sector.production,
                scan_count: sector.scan_count,
                proposal_yield: sector.proposal_yield,
                polished: sector.is_polished(),
                difficulty: sector_difficulty(sector),
                min_confidence: sector_min_confidence(sector, base),
                affinity: sector_category_affinity(sector),
            })
            .collect(),
    })
}

fn initialized_paths(root: &Path) -> Result<WheelPaths> {
    let paths = WheelPaths::new(root);
    if !paths.state_dir.is_dir() {
        return Err(anyhow!(
            "{} not found, run `wheel init` first",
            paths.state_dir.display()
        ));
    }
    Ok(paths)
}
