//! Shared deterministic types for the sector scheduler.
//!
//! These types define the persisted `SectorState` document and the values
//! exchanged with the external control loop. Field names serialize in
//! camelCase so stored documents keep a stable shape across versions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Current `SectorState` document version.
pub const SECTOR_STATE_VERSION: u32 = 2;

/// How confident the inventory (or a later scan) is about a sector's role.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationConfidence {
    #[default]
    Low,
    Medium,
    High,
}

/// Per-category ticket outcome counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryStats {
    pub success: u32,
    pub failure: u32,
}

impl CategoryStats {
    pub fn attempts(&self) -> u32 {
        self.success + self.failure
    }
}

/// A directory-scoped unit of scan/work history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sector {
    /// Normalized path (`.` for the repository root).
    pub path: String,
    pub purpose: String,
    /// False for tests, config, fixtures and generated code.
    pub production: bool,
    pub file_count: u32,
    pub production_file_count: u32,
    pub classification_confidence: ClassificationConfidence,
    /// Epoch milliseconds of the last scan, 0 if never scanned.
    pub last_scanned_at: i64,
    pub last_scanned_cycle: u64,
    pub scan_count: u32,
    /// Exponential moving average of proposals per scan.
    pub proposal_yield: f64,
    pub success_count: u32,
    pub failure_count: u32,
    /// Epoch milliseconds when the sector was marked polished, 0 if not.
    pub polished_at: i64,
    pub merge_count: u32,
    pub closed_count: u32,
    #[serde(default)]
    pub category_stats: BTreeMap<String, CategoryStats>,
}

impl Sector {
    /// Create a sector with zeroed scan/outcome history.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            purpose: String::new(),
            production: true,
            file_count: 0,
            production_file_count: 0,
            classification_confidence: ClassificationConfidence::Low,
            last_scanned_at: 0,
            last_scanned_cycle: 0,
            scan_count: 0,
            proposal_yield: 0.0,
            success_count: 0,
            failure_count: 0,
            polished_at: 0,
            merge_count: 0,
            closed_count: 0,
            category_stats: BTreeMap::new(),
        }
    }

    pub fn total_outcomes(&self) -> u32 {
        self.success_count + self.failure_count
    }

    /// Failure rate over recorded outcomes, 0 when there are none.
    pub fn failure_rate(&self) -> f64 {
        let total = self.total_outcomes();
        if total == 0 {
            return 0.0;
        }
        f64::from(self.failure_count) / f64::from(total)
    }

    /// Success rate over recorded outcomes, 0 when there are none.
    pub fn success_rate(&self) -> f64 {
        let total = self.total_outcomes();
        if total == 0 {
            return 0.0;
        }
        f64::from(self.success_count) / f64::from(total)
    }

    pub fn is_scanned(&self) -> bool {
        self.last_scanned_at > 0
    }

    pub fn is_polished(&self) -> bool {
        self.polished_at > 0
    }

    /// Change the production flag, keeping `production_file_count` consistent:
    /// non-production sectors count no production files, and a sector turned
    /// production with no counted files counts all of them.
    pub fn set_production(&mut self, production: bool) {
        self.production = production;
        if !production {
            self.production_file_count = 0;
        } else if self.production_file_count == 0 {
            self.production_file_count = self.file_count;
        }
    }
}

/// Persisted scheduler document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorState {
    pub version: u32,
    /// Epoch milliseconds when the sector list was last rebuilt.
    pub built_at: i64,
    pub sectors: Vec<Sector>,
}

impl SectorState {
    pub fn new(sectors: Vec<Sector>, built_at: i64) -> Self {
        Self {
            version: SECTOR_STATE_VERSION,
            built_at,
            sectors,
        }
    }

    pub fn find(&self, path: &str) -> Option<&Sector> {
        self.sectors.iter().find(|sector| sector.path == path)
    }

    pub(crate) fn find_mut(&mut self, path: &str) -> Option<&mut Sector> {
        self.sectors.iter_mut().find(|sector| sector.path == path)
    }
}

/// One entry of the module inventory handed to the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub path: String,
    pub file_count: u32,
    #[serde(default)]
    pub production_file_count: Option<u32>,
    #[serde(default)]
    pub purpose: String,
    #[serde(default = "default_production")]
    pub production: bool,
    #[serde(default)]
    pub classification_confidence: ClassificationConfidence,
}

fn default_production() -> bool {
    true
}

/// Classification hint produced by a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reclassification {
    pub production: Option<bool>,
    pub purpose: Option<String>,
    pub confidence: ClassificationConfidence,
}

/// Sector chosen for the next cycle and the scope glob to hand to the scanner.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeSelection {
    pub sector: Sector,
    pub scope: String,
}

/// Coarse difficulty bucket derived from a sector's failure rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Moderate,
    Hard,
}

/// Scan coverage across production sectors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    pub scanned_sectors: usize,
    pub total_sectors: usize,
    pub scanned_files: u64,
    pub total_files: u64,
    pub sector_percent: f64,
    pub file_percent: f64,
    /// Sectors whose classification confidence is still low.
    pub unclassified_sectors: usize,
}

/// Suggested change to how wide the next scans should reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeAdjustment {
    Narrow,
    Widen,
    Stable,
}

/// Categories that historically worked (boost) or failed (suppress) in a sector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryAffinity {
    pub boost: Vec<String>,
    pub suppress: Vec<String>,
}
