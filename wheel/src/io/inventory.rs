//! Module inventory loading.
//!
//! The inventory is produced by an external provider that walks the codebase
//! and classifies directories. It arrives as a JSON array of [`ModuleInfo`].

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::types::ModuleInfo;

pub fn load_inventory(path: &Path) -> Result<Vec<ModuleInfo>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read inventory {}", path.display()))?;
    let modules: Vec<ModuleInfo> = serde_json::from_str(&contents)
        .with_context(|| format!("parse inventory {}", path.display()))?;
    debug!(path = %path.display(), modules = modules.len(), "inventory loaded");
    Ok(modules)
}
