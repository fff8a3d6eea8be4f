//! JSON Lines change feed.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use git2::Oid;

use super::{ChangeSource, FeedError};
use crate::core::{Change, ProjectName};

/// Changes loaded from a JSON Lines export, one change per line.
#[derive(Clone, Debug, Default)]
pub struct JsonlFeed {
    changes: Vec<Change>,
    by_commit: HashMap<(ProjectName, String), usize>,
}

impl JsonlFeed {
    pub fn open(path: &Path) -> Result<Self, FeedError> {
        let contents = fs::read_to_string(path).map_err(|source| FeedError::Unavailable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, FeedError> {
        let mut changes = Vec::new();
        for (idx, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let change: Change = serde_json::from_str(line)
                .map_err(|source| FeedError::Parse { line: idx + 1, source })?;
            changes.push(change);
        }
        Ok(Self::from_changes(changes))
    }

    pub fn from_changes(changes: Vec<Change>) -> Self {
        let by_commit = changes
            .iter()
            .enumerate()
            .filter(|(_, change)| change.is_merged())
            .map(|(idx, change)| {
                (
                    (change.project.clone(), change.merge_commit.as_str().to_string()),
                    idx,
                )
            })
            .collect();
        Self { changes, by_commit }
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

impl ChangeSource for JsonlFeed {
    fn merged_changes(&self) -> Result<Vec<Change>, FeedError> {
        Ok(self
            .changes
            .iter()
            .filter(|change| change.is_merged())
            .cloned()
            .collect())
    }

    fn change_for_commit(
        &self,
        project: &ProjectName,
        commit: Oid,
    ) -> Result<Option<Change>, FeedError> {
        let key = (project.clone(), commit.to_string());
        Ok(self.by_commit.get(&key).map(|idx| self.changes[*idx].clone()))
    }
}
