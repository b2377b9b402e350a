//! Platform-specific configuration paths.
//!
//! - Linux: `~/.config/cantor/config.toml`
//! - macOS: `~/Library/Application Support/cantor/config.toml`
//! - Windows: `%APPDATA%\cantor\config.toml`

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Application name used for directory paths.
const APP_NAME: &str = "cantor";

/// File name of the user configuration.
pub const CONFIG_FILE: &str = "config.toml";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the path of the user configuration file, whether or not it exists.
pub fn user_config_path() -> PathBuf {
    user_config_dir().join(CONFIG_FILE)
}

/// Ensure the user configuration directory exists.
pub fn ensure_user_config_dir() -> Result<PathBuf, ConfigError> {
    let dir = user_config_dir();
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| ConfigError::create_dir(&dir, e))?;
    }
    Ok(dir)
}

/// Locate the configuration file to load.
///
/// An explicit path is returned as given, so a missing file surfaces as a
/// read error instead of silently falling back to defaults. Without one, the
/// user configuration is returned if it exists.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let path = user_config_path();
    path.is_file().then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_paths_end_with_app_name() {
        assert!(user_config_dir().ends_with(APP_NAME));
        assert!(user_config_path().ends_with(Path::new(APP_NAME).join(CONFIG_FILE)));
    }

    #[test]
    fn explicit_path_wins() {
        let explicit = Path::new("/nonexistent/cantor-test.toml");
        assert_eq!(find_config(Some(explicit)), Some(explicit.to_path_buf()));
    }
}
