//! I/O helpers for wheel commands.

pub mod config;
pub mod inventory;
pub mod paths;
pub mod sector_store;
pub mod transcript;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Write `contents` next to `path` under a temp name, then rename over `path`.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
