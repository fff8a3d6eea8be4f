//! Config loading.

mod load;
mod merge;
mod schema;

pub use load::{ENV_CONFIG, config_path, load, load_file, load_user_config, validate};
pub use merge::{
    ENV_ASYNC, ENV_CANONICAL_URL, ENV_THREADS, apply_env_overrides, apply_overrides_from,
    merge_layers,
};
pub use schema::{
    Config, ConfigLayer, DEFAULT_ANONYMOUS_LABEL, DEFAULT_MAX_ATTEMPTS, DEFAULT_THREADS,
    FileLoggingConfig, FileLoggingConfigOverride, LogFormat, LogRotation, LoggingConfig,
    LoggingConfigOverride,
};

pub use crate::core::Timezone;
