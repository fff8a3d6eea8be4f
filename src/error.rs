use thiserror::Error;

use crate::core::{CoreError, ProjectName};
use crate::feed::FeedError;
use crate::git::NotesError;

/// Whether retrying this operation may succeed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Transience {
    /// Retry will never help without changing inputs/state.
    Permanent,
    /// Retry may help (transient contention/outage).
    Retryable,
}

impl Transience {
    pub fn is_retryable(self) -> bool {
        matches!(self, Transience::Retryable)
    }
}

/// Crate-level convenience error.
///
/// A thin wrapper over the capability errors.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Notes(#[from] NotesError),

    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    #[error("export aborted at {project}: {source}")]
    Aborted {
        project: ProjectName,
        #[source]
        source: NotesError,
    },

    #[error("{count} export worker(s) stopped unexpectedly")]
    WorkersLost { count: usize },
}

impl Error {
    pub fn transience(&self) -> Transience {
        match self {
            Error::Core(e) => e.transience(),
            Error::Feed(e) => e.transience(),
            Error::Notes(e) => e.transience(),
            Error::Config { .. } | Error::Aborted { .. } | Error::WorkersLost { .. } => {
                Transience::Permanent
            }
        }
    }
}
