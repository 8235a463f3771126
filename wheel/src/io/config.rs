//! Wheel configuration stored under `.wheel/state/config.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::write_atomic;
use crate::core::spindle::SpindleConfig;

/// Wheel configuration (TOML).
///
/// Edited by humans; missing fields and a missing file fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WheelConfig {
    pub scheduler: SchedulerConfig,
    /// Loop monitor thresholds used by `wheel replay`.
    pub spindle: SpindleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Baseline minimum proposal confidence (0-100) before per-sector difficulty.
    pub base_min_confidence: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            base_min_confidence: 50,
        }
    }
}

impl WheelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.base_min_confidence > 100 {
            return Err(anyhow!("scheduler.base_min_confidence must be <= 100"));
        }
        let errors = self.spindle.validate();
        if !errors.is_empty() {
            return Err(anyhow!("spindle config invalid: {}", errors.join("; ")));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `WheelConfig::default()`.
pub fn load_config(path: &Path) -> Result<WheelConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config missing, using defaults");
        let cfg = WheelConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: WheelConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate().with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &WheelConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, WheelConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let mut cfg = WheelConfig::default();
        cfg.spindle.max_stall_iterations = 7;
        write_config(&path, &cfg).expect("write");
        assert_eq!(load_config(&path).expect("load"), cfg);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[spindle]\nmax_file_edits = 4\n").expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.spindle.max_file_edits, 4);
        assert_eq!(cfg.spindle.max_stall_iterations, 5);
        assert_eq!(cfg.scheduler, SchedulerConfig::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[spindle]\nsimilarity_threshold = 1.5\n").expect("write");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("similarity_threshold"));

        let cfg = WheelConfig {
            scheduler: SchedulerConfig {
                base_min_confidence: 101,
            },
            ..WheelConfig::default()
        };
        assert!(write_config(&path, &cfg).is_err());
    }
}
