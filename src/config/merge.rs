use super::{Config, ConfigLayer};

pub const ENV_THREADS: &str = "REVIEWNOTES_THREADS";
pub const ENV_ASYNC: &str = "REVIEWNOTES_ASYNC";
pub const ENV_CANONICAL_URL: &str = "REVIEWNOTES_CANONICAL_URL";

pub fn merge_layers(user: Option<ConfigLayer>, site: Option<ConfigLayer>) -> Config {
    let mut config = Config::default();
    if let Some(layer) = user {
        layer.apply_to(&mut config);
    }
    if let Some(layer) = site {
        layer.apply_to(&mut config);
    }
    config
}

pub fn apply_env_overrides(config: &mut Config) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Apply overrides read through `lookup`. Unparseable values are ignored.
pub fn apply_overrides_from(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(raw) = lookup(ENV_THREADS) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            match trimmed.parse::<usize>() {
                Ok(value) if value > 0 => config.threads = value,
                Ok(_) => tracing::warn!("{ENV_THREADS} must be positive, ignoring"),
                Err(err) => tracing::warn!("invalid {ENV_THREADS}, ignoring: {err}"),
            }
        }
    }

    if let Some(raw) = lookup(ENV_ASYNC) {
        match parse_flag(raw.trim()) {
            Some(value) => config.async_updates = value,
            None => tracing::warn!("invalid {ENV_ASYNC} `{raw}`, ignoring"),
        }
    }

    if let Some(raw) = lookup(ENV_CANONICAL_URL) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            config.canonical_base_url = trimmed.to_string();
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
