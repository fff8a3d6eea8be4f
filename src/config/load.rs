use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

use super::merge::{apply_env_overrides, merge_layers};
use super::{Config, ConfigLayer};

/// Env var naming an explicit config file, same as `--config`.
pub const ENV_CONFIG: &str = "REVIEWNOTES_CONFIG";

pub fn config_path() -> PathBuf {
    crate::paths::config_dir().join("config.toml")
}

pub fn load_user_config() -> Result<Option<ConfigLayer>> {
    let path = config_path();
    if !path.exists() {
        return Ok(None);
    }
    load_file(&path).map(Some)
}

pub fn load_file(path: &Path) -> Result<ConfigLayer> {
    let contents = fs::read_to_string(path)
        .map_err(|e| config_error(format!("failed to read {}: {e}", path.display())))?;
    toml::from_str(&contents)
        .map_err(|e| config_error(format!("failed to parse {}: {e}", path.display())))
}

/// Defaults, then the user file, then `explicit` (or `REVIEWNOTES_CONFIG`),
/// then environment overrides.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let user = load_user_config()?;
    let site = match explicit {
        Some(path) => Some(load_file(path)?),
        None => match std::env::var_os(ENV_CONFIG) {
            Some(path) if !path.is_empty() => Some(load_file(Path::new(&path))?),
            _ => None,
        },
    };
    let mut config = merge_layers(user, site);
    apply_env_overrides(&mut config);
    validate(&config)?;
    Ok(config)
}

/// Settings that would only fail later, deep inside a worker.
pub fn validate(config: &Config) -> Result<()> {
    if config.threads == 0 {
        return Err(config_error("threads must be at least 1".to_string()));
    }
    if config.max_attempts == 0 {
        return Err(config_error("max_attempts must be at least 1".to_string()));
    }
    if !config.notes_ref.starts_with("refs/notes/")
        || !git2::Reference::is_valid_name(&config.notes_ref)
    {
        return Err(config_error(format!(
            "notes_ref `{}` is not a valid refs/notes/ reference",
            config.notes_ref
        )));
    }
    if config.labels.is_empty() {
        return Err(config_error("labels must name at least one label".to_string()));
    }
    Ok(())
}

fn config_error(reason: String) -> Error {
    Error::Config { reason }
}
