//! Canonical `.wheel/` layout and init scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument};

use super::config::{WheelConfig, write_config};

pub(crate) const SECTOR_STATE_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/sector_state/v1.schema.json"
));

/// All canonical paths within `.wheel/` for a project root.
#[derive(Debug, Clone)]
pub struct WheelPaths {
    pub root: PathBuf,
    pub wheel_dir: PathBuf,
    pub state_dir: PathBuf,
    pub sectors_path: PathBuf,
    pub schema_path: PathBuf,
    pub config_path: PathBuf,
}

impl WheelPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let wheel_dir = root.join(".wheel");
        let state_dir = wheel_dir.join("state");
        Self {
            root: root.clone(),
            wheel_dir: wheel_dir.clone(),
            state_dir: state_dir.clone(),
            sectors_path: state_dir.join("sectors.json"),
            schema_path: state_dir.join("schema.json"),
            config_path: state_dir.join("config.toml"),
        }
    }
}

/// Options for `init_wheel`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite existing wheel-owned files.
    pub force: bool,
}

/// Create `.wheel/` scaffolding in `root`: default config and the sector state schema.
///
/// Fails if `.wheel/` already exists unless `options.force` is set. Sector
/// state is left to `wheel refresh`.
#[instrument(skip_all, fields(root = %root.display(), force = options.force))]
pub fn init_wheel(root: &Path, options: &InitOptions) -> Result<WheelPaths> {
    let paths = WheelPaths::new(root);
    if paths.wheel_dir.exists() && !paths.wheel_dir.is_dir() {
        return Err(anyhow!("wheel init: .wheel exists but is not a directory"));
    }
    if paths.wheel_dir.exists() && !options.force {
        return Err(anyhow!(
            "wheel init: .wheel already exists (use --force to overwrite)"
        ));
    }

    fs::create_dir_all(&paths.state_dir)
        .with_context(|| format!("create directory {}", paths.state_dir.display()))?;
    fs::write(&paths.schema_path, SECTOR_STATE_SCHEMA)
        .with_context(|| format!("write schema {}", paths.schema_path.display()))?;
    write_config(&paths.config_path, &WheelConfig::default())?;

    debug!(state_dir = %paths.state_dir.display(), "wheel scaffolding written");
    Ok(paths)
}
