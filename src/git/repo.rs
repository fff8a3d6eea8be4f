//! Repository lookup by project name.

use std::path::PathBuf;

use git2::{ErrorCode, Repository};

use super::error::NotesError;
use crate::core::ProjectName;

/// Opens the repositories stored under one base directory.
///
/// Project `platform/core` lives at `<base>/platform/core.git`, or at
/// `<base>/platform/core` for a non-bare layout. Handles are never cached:
/// each caller owns the `Repository` it opens.
#[derive(Clone, Debug)]
pub struct RepoManager {
    base_path: PathBuf,
}

impl RepoManager {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Path the repository for `project` would be opened from.
    pub fn resolve(&self, project: &ProjectName) -> Option<PathBuf> {
        let bare = self.base_path.join(format!("{}.git", project.as_str()));
        if bare.is_dir() {
            return Some(bare);
        }
        let plain = self.base_path.join(project.as_str());
        plain.is_dir().then_some(plain)
    }

    pub fn open(&self, project: &ProjectName) -> Result<Repository, NotesError> {
        let path = self
            .resolve(project)
            .ok_or_else(|| NotesError::RepositoryNotFound {
                project: project.clone(),
            })?;
        match Repository::open(&path) {
            Ok(repo) => Ok(repo),
            Err(e) if e.code() == ErrorCode::NotFound => Err(NotesError::RepositoryNotFound {
                project: project.clone(),
            }),
            Err(e) => Err(NotesError::OpenRepo {
                project: project.clone(),
                path,
                source: e,
            }),
        }
    }
}
