//! Sector state load/save helpers with version, schema and invariant validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;
use tracing::{debug, warn};

use super::write_atomic;
use crate::core::invariants::validate_invariants;
use crate::core::types::{SECTOR_STATE_VERSION, SectorState};

/// Load sector state from disk.
///
/// Returns `None` when the file does not exist or was written by a different
/// format version; either way the caller rebuilds from a fresh inventory.
pub fn load_sector_state(schema_path: &Path, state_path: &Path) -> Result<Option<SectorState>> {
    if !state_path.exists() {
        debug!(path = %state_path.display(), "no sector state on disk");
        return Ok(None);
    }
    let contents = fs::read_to_string(state_path)
        .with_context(|| format!("read sector state {}", state_path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse sector state {}", state_path.display()))?;

    let version = value.get("version").and_then(Value::as_u64);
    if version != Some(u64::from(SECTOR_STATE_VERSION)) {
        warn!(
            path = %state_path.display(),
            found = ?version,
            expected = SECTOR_STATE_VERSION,
            "sector state version mismatch, discarding"
        );
        return Ok(None);
    }

    validate_schema(schema_path, &value)?;
    let state: SectorState = serde_json::from_value(value)
        .with_context(|| format!("deserialize sector state {}", state_path.display()))?;
    validate_state_invariants(&state)?;
    debug!(sectors = state.sectors.len(), built_at = state.built_at, "sector state loaded");
    Ok(Some(state))
}

/// Atomically write sector state to disk (temp file + rename).
///
/// Refuses to persist a state that violates the sector invariants.
pub fn write_sector_state(state_path: &Path, state: &SectorState) -> Result<()> {
    validate_state_invariants(state)?;
    debug!(path = %state_path.display(), sectors = state.sectors.len(), "writing sector state");
    let mut buf = serde_json::to_string_pretty(state).context("serialize sector state")?;
    buf.push('\n');
    write_atomic(state_path, &buf)
}

fn validate_schema(schema_path: &Path, state: &Value) -> Result<()> {
    let schema_contents = fs::read_to_string(schema_path)
        .with_context(|| format!("read schema {}", schema_path.display()))?;
    let schema_value: Value = serde_json::from_str(&schema_contents)
        .with_context(|| format!("parse schema {}", schema_path.display()))?;
    let compiled =
        validator_for(&schema_value).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(state) {
        let messages = compiled
            .iter_errors(state)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "sector state schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

fn validate_state_invariants(state: &SectorState) -> Result<()> {
    let errors = validate_invariants(state);
    if errors.is_empty() {
        return Ok(());
    }
    Err(anyhow!("sector state invariants failed: {}", errors.join("; ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::paths::SECTOR_STATE_SCHEMA;
    use crate::test_support::{scanned_sector, sector, state};

    fn write_schema(root: &Path) -> std::path::PathBuf {
        let schema_path = root.join("schema.json");
        fs::write(&schema_path, SECTOR_STATE_SCHEMA).expect("write schema");
        schema_path
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let schema_path = write_schema(temp.path());
        let state_path = temp.path().join("sectors.json");

        let mut scanned = scanned_sector("src/core", 12, 2, 4, 1.5);
        scanned
            .category_stats
            .entry("refactor".to_string())
            .or_default()
            .success = 2;
        let original = state(vec![sector(".", 3), scanned]);
        write_sector_state(&state_path, &original).expect("write");

        let loaded = load_sector_state(&schema_path, &state_path)
            .expect("load")
            .expect("present");
        assert_eq!(loaded, original);
    }

    #[test]
    fn missing_file_loads_as_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        let schema_path = write_schema(temp.path());
        let loaded = load_sector_state(&schema_path, &temp.path().join("sectors.json"))
            .expect("load");
        assert!(loaded.is_none());
    }

    #[test]
    fn version_mismatch_loads_as_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        let schema_path = write_schema(temp.path());
        let state_path = temp.path().join("sectors.json");
        fs::write(&state_path, r#"{"version":1,"builtAt":0,"modules":[]}"#).expect("write");

        let loaded = load_sector_state(&schema_path, &state_path).expect("load");
        assert!(loaded.is_none());
    }

    #[test]
    fn schema_violation_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let schema_path = write_schema(temp.path());
        let state_path = temp.path().join("sectors.json");
        fs::write(
            &state_path,
            r#"{"version":2,"builtAt":0,"sectors":[{"path":"src"}]}"#,
        )
        .expect("write");

        let err = load_sector_state(&schema_path, &state_path).unwrap_err();
        assert!(err.to_string().contains("schema validation failed"));
    }

    #[test]
    fn invariant_violation_is_rejected_on_write_and_load() {
        let temp = tempfile::tempdir().expect("tempdir");
        let schema_path = write_schema(temp.path());
        let state_path = temp.path().join("sectors.json");
        let duplicated = state(vec![sector("src", 2), sector("src", 2)]);

        let err = write_sector_state(&state_path, &duplicated).unwrap_err();
        assert!(err.to_string().contains("invariants failed"));

        let buf = serde_json::to_string_pretty(&duplicated).expect("serialize");
        fs::write(&state_path, buf).expect("write raw");
        let err = load_sector_state(&schema_path, &state_path).unwrap_err();
        assert!(err.to_string().contains("invariants failed"));
    }
}
