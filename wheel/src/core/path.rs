//! Helpers for normalizing sector paths and rendering scan scopes.

/// Path used for the repository root sector.
pub const ROOT_SECTOR: &str = ".";

/// Normalize a sector path: forward slashes, no leading `./`, no trailing `/`.
///
/// An empty result (e.g. `""`, `"./"`) maps to the root sector `.`.
pub fn normalize_sector_path(raw: &str) -> String {
    let unified = raw.trim().replace('\\', "/");
    let mut path = unified.as_str();
    loop {
        if let Some(rest) = path.strip_prefix("./") {
            path = rest;
        } else if let Some(rest) = path.strip_prefix('/') {
            path = rest;
        } else {
            break;
        }
    }
    let path = path.trim_end_matches('/');

    let segments: Vec<&str> = path
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();
    if segments.is_empty() {
        return ROOT_SECTOR.to_string();
    }
    segments.join("/")
}

/// Scope glob handed to the scanner for a sector.
///
/// The root sector only covers top-level files; every other sector is recursive.
pub fn sector_scope(path: &str) -> String {
    if path == ROOT_SECTOR {
        "*".to_string()
    } else {
        format!("{}/**", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_dot_slash_and_trailing_slash() {
        assert_eq!(normalize_sector_path("./src/core/"), "src/core");
        assert_eq!(normalize_sector_path("src\\io"), "src/io");
        assert_eq!(normalize_sector_path("././lib//util"), "lib/util");
    }

    #[test]
    fn normalize_empty_paths_to_root() {
        assert_eq!(normalize_sector_path(""), ".");
        assert_eq!(normalize_sector_path("./"), ".");
        assert_eq!(normalize_sector_path("."), ".");
    }

    #[test]
    fn scope_for_root_is_top_level_only() {
        assert_eq!(sector_scope("."), "*");
        assert_eq!(sector_scope("src/core"), "src/core/**");
    }
}
