//! Building sector lists from a module inventory and carrying history across rebuilds.

use std::collections::{HashMap, HashSet};

use crate::core::path::normalize_sector_path;
use crate::core::types::{ModuleInfo, Sector};

/// Relative file count change above which a polished sector is re-evaluated.
pub const FILE_COUNT_DRIFT: f64 = 0.2;

/// Deduplicate a module inventory by normalized path into fresh sectors.
///
/// The first module seen for a path wins. History fields start zeroed.
pub fn build_sectors(modules: &[ModuleInfo]) -> Vec<Sector> {
    let mut seen = HashSet::new();
    let mut sectors = Vec::new();
    for module in modules {
        let path = normalize_sector_path(&module.path);
        if !seen.insert(path.clone()) {
            continue;
        }
        let production_files = module
            .production_file_count
            .unwrap_or(if module.production { module.file_count } else { 0 });
        let mut sector = Sector::new(path);
        sector.purpose = module.purpose.clone();
        sector.production = module.production;
        sector.file_count = module.file_count;
        sector.production_file_count = production_files.min(module.file_count);
        sector.classification_confidence = module.classification_confidence;
        sectors.push(sector);
    }
    sectors
}

/// Copy scan/outcome history from `previous` onto matching `fresh` sectors.
///
/// Sectors missing from `fresh` are dropped. `polished_at` is cleared when the
/// file count drifted by more than [`FILE_COUNT_DRIFT`]. A previous
/// classification wins when it is more confident than the fresh inventory's.
pub fn merge_sectors(fresh: Vec<Sector>, previous: &[Sector]) -> Vec<Sector> {
    let by_path: HashMap<&str, &Sector> = previous
        .iter()
        .map(|sector| (sector.path.as_str(), sector))
        .collect();

    fresh
        .into_iter()
        .map(|mut sector| {
            let Some(prev) = by_path.get(sector.path.as_str()) else {
                return sector;
            };
            sector.last_scanned_at = prev.last_scanned_at;
            sector.last_scanned_cycle = prev.last_scanned_cycle;
            sector.scan_count = prev.scan_count;
            sector.proposal_yield = prev.proposal_yield;
            sector.success_count = prev.success_count;
            sector.failure_count = prev.failure_count;
            sector.merge_count = prev.merge_count;
            sector.closed_count = prev.closed_count;
            sector.category_stats = prev.category_stats.clone();
            sector.polished_at = if file_count_drifted(prev.file_count, sector.file_count) {
                0
            } else {
                prev.polished_at
            };

            if prev.classification_confidence > sector.classification_confidence {
                sector.set_production(prev.production);
                sector.purpose = prev.purpose.clone();
                sector.classification_confidence = prev.classification_confidence;
            }
            sector
        })
        .collect()
}

fn file_count_drifted(previous: u32, current: u32) -> bool {
    if previous == 0 {
        return current != 0;
    }
    let delta = (f64::from(current) - f64::from(previous)).abs();
    delta / f64::from(previous) > FILE_COUNT_DRIFT
}
