//! Git notes error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::{CoreError, ProjectName};
use crate::error::Transience;

/// Errors that can occur while reading or writing review notes.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum NotesError {
    #[error("Unable to open project: {project}")]
    RepositoryNotFound { project: ProjectName },

    #[error("failed to open repository {project} at {}: {source}", path.display())]
    OpenRepo {
        project: ProjectName,
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("{refname} was updated concurrently")]
    ConcurrentUpdate { refname: String },

    #[error("gave up updating {refname} after {attempts} attempts")]
    TooManyAttempts { refname: String, attempts: usize },

    #[error("export of {project} stopped: {reason}")]
    Interrupted { project: ProjectName, reason: String },

    #[error("invalid note: {0}")]
    Build(#[from] CoreError),

    #[error("git operation failed: {0}")]
    Git(#[from] git2::Error),
}

impl NotesError {
    /// Whether retrying this operation may succeed.
    pub fn transience(&self) -> Transience {
        match self {
            NotesError::ConcurrentUpdate { .. } | NotesError::TooManyAttempts { .. } => {
                Transience::Retryable
            }
            NotesError::RepositoryNotFound { .. }
            | NotesError::OpenRepo { .. }
            | NotesError::Interrupted { .. }
            | NotesError::Build(_)
            | NotesError::Git(_) => Transience::Permanent,
        }
    }

    /// True when the failure came from losing a compare-and-swap race.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            NotesError::ConcurrentUpdate { .. } | NotesError::TooManyAttempts { .. }
        )
    }
}
