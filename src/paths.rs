//! Resolution of the config file location.
//!
//! A `config.toml` in the working directory wins over the per-user config
//! directory.

use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.toml";
const APP_DIR: &str = "airtrail";

/// Per-user configuration directory.
///
/// - **macOS**: `~/Library/Application Support/airtrail/`
/// - **Linux**: `~/.config/airtrail/`
/// - **Windows**: `%APPDATA%\airtrail\`
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join(APP_DIR)
}

/// Pick the config file: an explicit path first, then `./config.toml` if it
/// exists, then the per-user location.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let local = std::env::current_dir().unwrap_or_default().join(CONFIG_FILE);
    if local.exists() {
        return local;
    }
    user_config_dir().join(CONFIG_FILE)
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let explicit = Path::new("/tmp/somewhere/custom.toml");
        assert_eq!(resolve_config_path(Some(explicit)), explicit.to_path_buf());
    }

    #[test]
    fn test_user_config_dir_ends_with_app_dir() {
        assert!(user_config_dir().ends_with(APP_DIR));
    }

    #[test]
    fn test_resolved_path_is_a_config_file() {
        let path = resolve_config_path(None);
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some(CONFIG_FILE));
    }
}
