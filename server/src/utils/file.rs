//! Path helpers for config-supplied locations

use std::path::PathBuf;

/// Expand `~`, `~/...` and relative paths to an absolute path
///
/// Paths are not canonicalized, so they need not exist yet. An empty input
/// resolves to the current directory.
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();
    let cwd = || std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    if path.is_empty() {
        return cwd();
    }

    let expanded = match path.strip_prefix('~') {
        Some("") => dirs::home_dir().unwrap_or_else(|| PathBuf::from(path)),
        Some(rest) if rest.starts_with('/') || rest.starts_with('\\') => dirs::home_dir()
            .map(|home| home.join(&rest[1..]))
            .unwrap_or_else(|| PathBuf::from(path)),
        _ => PathBuf::from(path),
    };

    if expanded.is_relative() {
        cwd().join(expanded)
    } else {
        expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_path_absolute_unchanged() {
        assert_eq!(
            expand_path("/var/lib/recordql/recordql.duckdb"),
            PathBuf::from("/var/lib/recordql/recordql.duckdb")
        );
    }

    #[test]
    fn test_expand_path_relative_becomes_absolute() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(expand_path("data.duckdb"), cwd.join("data.duckdb"));
        assert_eq!(expand_path("./.recordql"), cwd.join("./.recordql"));
        assert_eq!(expand_path(".."), cwd.join(".."));
    }

    #[test]
    fn test_expand_path_tilde() {
        let result = expand_path("~/.recordql/recordql.json");
        assert!(result.is_absolute());
        assert!(!result.to_string_lossy().contains('~'));
        assert!(result.ends_with(".recordql/recordql.json"));

        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~"), home);
        }
    }

    #[test]
    fn test_expand_path_tilde_prefix_of_name_is_literal() {
        let result = expand_path("~backup");
        assert!(result.ends_with("~backup"));
    }

    #[test]
    fn test_expand_path_trims_and_defaults() {
        assert_eq!(expand_path("  /srv/data  "), PathBuf::from("/srv/data"));
        assert_eq!(expand_path("   "), std::env::current_dir().unwrap());
    }
}
