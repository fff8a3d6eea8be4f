//! Git integration module.
//!
//! Provides:
//! - RepoManager for opening project repositories by name
//! - NotesWriter publishing note batches with compare-and-swap retries
//! - Commit range enumeration for reference updates

pub mod error;
pub mod notes;
pub mod repo;
pub mod walk;

pub use error::NotesError;
pub use notes::{CommitOutcome, Committer, DEFAULT_NOTES_REF, NoteBatch, NotesWriter};
pub use repo::RepoManager;
pub use walk::commits_in_range;
