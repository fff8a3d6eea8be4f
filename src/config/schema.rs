use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::{LabelDefinitions, Timezone};
use crate::export::ConflictPolicy;
use crate::git::{Committer, DEFAULT_NOTES_REF};

pub const DEFAULT_THREADS: usize = 2;
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;
pub const DEFAULT_ANONYMOUS_LABEL: &str = "Name of user not set";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_path: PathBuf,
    pub changes: Option<PathBuf>,
    pub threads: usize,
    #[serde(rename = "async")]
    pub async_updates: bool,
    pub timezone: Timezone,
    pub anonymous_identity_label: String,
    pub canonical_base_url: String,
    pub labels: LabelDefinitions,
    pub notes_ref: String,
    pub max_attempts: usize,
    pub on_conflict_exhausted: ConflictPolicy,
    pub committer: Committer,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            changes: None,
            threads: DEFAULT_THREADS,
            async_updates: false,
            timezone: Timezone::default(),
            anonymous_identity_label: DEFAULT_ANONYMOUS_LABEL.to_string(),
            canonical_base_url: "http://localhost:8080/".to_string(),
            labels: LabelDefinitions::default(),
            notes_ref: DEFAULT_NOTES_REF.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            on_conflict_exhausted: ConflictPolicy::default(),
            committer: Committer::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Tree,
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogRotation {
    Daily,
    Hourly,
    Minutely,
    Never,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub stderr: bool,
    pub stderr_format: LogFormat,
    pub filter: Option<String>,
    pub file: FileLoggingConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stderr: true,
            stderr_format: LogFormat::Compact,
            filter: None,
            file: FileLoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    pub enabled: bool,
    pub dir: Option<PathBuf>,
    pub format: LogFormat,
    pub rotation: LogRotation,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: None,
            format: LogFormat::Json,
            rotation: LogRotation::Daily,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfigOverride {
    pub stderr: Option<bool>,
    pub stderr_format: Option<LogFormat>,
    pub filter: Option<String>,
    pub file: Option<FileLoggingConfigOverride>,
}

impl LoggingConfigOverride {
    pub fn apply_to(&self, target: &mut LoggingConfig) {
        if let Some(stderr) = self.stderr {
            target.stderr = stderr;
        }
        if let Some(format) = self.stderr_format {
            target.stderr_format = format;
        }
        if let Some(filter) = self.filter.as_ref() {
            target.filter = Some(filter.clone());
        }
        if let Some(file) = self.file.as_ref() {
            file.apply_to(&mut target.file);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileLoggingConfigOverride {
    pub enabled: Option<bool>,
    pub dir: Option<PathBuf>,
    pub format: Option<LogFormat>,
    pub rotation: Option<LogRotation>,
}

impl FileLoggingConfigOverride {
    pub fn apply_to(&self, target: &mut FileLoggingConfig) {
        if let Some(enabled) = self.enabled {
            target.enabled = enabled;
        }
        if let Some(dir) = self.dir.as_ref() {
            target.dir = Some(dir.clone());
        }
        if let Some(format) = self.format {
            target.format = format;
        }
        if let Some(rotation) = self.rotation {
            target.rotation = rotation;
        }
    }
}

/// One configuration file; unset keys leave the layer below untouched.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ConfigLayer {
    pub base_path: Option<PathBuf>,
    pub changes: Option<PathBuf>,
    pub threads: Option<usize>,
    #[serde(rename = "async")]
    pub async_updates: Option<bool>,
    pub timezone: Option<Timezone>,
    pub anonymous_identity_label: Option<String>,
    pub canonical_base_url: Option<String>,
    pub labels: Option<LabelDefinitions>,
    pub notes_ref: Option<String>,
    pub max_attempts: Option<usize>,
    pub on_conflict_exhausted: Option<ConflictPolicy>,
    pub committer: Option<Committer>,
    #[serde(default)]
    pub logging: LoggingConfigOverride,
}

impl ConfigLayer {
    pub fn apply_to(&self, target: &mut Config) {
        if let Some(path) = self.base_path.as_ref() {
            target.base_path = path.clone();
        }
        if let Some(path) = self.changes.as_ref() {
            target.changes = Some(path.clone());
        }
        if let Some(threads) = self.threads {
            target.threads = threads;
        }
        if let Some(async_updates) = self.async_updates {
            target.async_updates = async_updates;
        }
        if let Some(tz) = self.timezone {
            target.timezone = tz;
        }
        if let Some(label) = self.anonymous_identity_label.as_ref() {
            target.anonymous_identity_label = label.clone();
        }
        if let Some(url) = self.canonical_base_url.as_ref() {
            target.canonical_base_url = url.clone();
        }
        if let Some(labels) = self.labels.as_ref() {
            target.labels = labels.clone();
        }
        if let Some(notes_ref) = self.notes_ref.as_ref() {
            target.notes_ref = notes_ref.clone();
        }
        if let Some(attempts) = self.max_attempts {
            target.max_attempts = attempts;
        }
        if let Some(policy) = self.on_conflict_exhausted {
            target.on_conflict_exhausted = policy;
        }
        if let Some(committer) = self.committer.as_ref() {
            target.committer = committer.clone();
        }
        self.logging.apply_to(&mut target.logging);
    }
}
