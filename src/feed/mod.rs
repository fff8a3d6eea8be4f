//! Change feed: where merged changes come from.

mod jsonl;

use std::path::PathBuf;

use git2::Oid;
use thiserror::Error;

use crate::core::{Change, ProjectName};
use crate::error::Transience;

pub use jsonl::JsonlFeed;

/// Source of review metadata.
pub trait ChangeSource: Send + Sync {
    /// Every change whose status is merged.
    fn merged_changes(&self) -> Result<Vec<Change>, FeedError>;

    /// The merged change whose merge commit in `project` is `commit`.
    fn change_for_commit(
        &self,
        project: &ProjectName,
        commit: Oid,
    ) -> Result<Option<Change>, FeedError>;
}

/// The change feed could not be read.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FeedError {
    #[error("failed to read {}: {source}", path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl FeedError {
    pub fn transience(&self) -> Transience {
        match self {
            FeedError::Unavailable { .. } => Transience::Retryable,
            FeedError::Parse { .. } => Transience::Permanent,
        }
    }
}
