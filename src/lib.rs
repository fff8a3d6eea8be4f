#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod export;
pub mod feed;
pub mod git;
pub mod listener;
mod paths;
pub mod progress;
pub mod telemetry;

pub use error::{Error, Transience};
pub type Result<T> = std::result::Result<T, Error>;

pub use crate::core::{
    AccountId, Approval, Change, ChangeId, ChangeKey, ChangeStatus, CommitId, CoreError,
    Identity, LabelDefinitions, NoteSettings, ProjectName, Timezone,
};
