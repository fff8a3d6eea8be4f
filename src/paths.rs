//! XDG directory helpers for config and log locations.

use std::path::PathBuf;

const APP_DIR: &str = "reviewnotes";

/// Base directory for configuration files.
///
/// Uses `REVIEWNOTES_CONFIG_DIR` if set, otherwise `$XDG_CONFIG_HOME/reviewnotes`
/// or the platform config directory.
pub(crate) fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("REVIEWNOTES_CONFIG_DIR")
        && !dir.trim().is_empty()
    {
        return PathBuf::from(dir);
    }

    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join(".config")
        })
        .join(APP_DIR)
}

/// Default directory for rolling log files.
pub(crate) fn log_dir() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join("logs")
}
