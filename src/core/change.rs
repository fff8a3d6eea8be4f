//! Review units and the identifiers that name them.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::error::{CoreError, InvalidId};
use super::identity::Identity;

/// Numeric change number, as it appears in review URLs.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ChangeId(u32);

impl ChangeId {
    pub fn new(id: u32) -> Result<Self, CoreError> {
        if id == 0 {
            return Err(InvalidId::Change {
                raw: id.to_string(),
                reason: "must be positive".into(),
            }
            .into());
        }
        Ok(Self(id))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for ChangeId {
    type Error = CoreError;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<ChangeId> for u32 {
    fn from(id: ChangeId) -> Self {
        id.0
    }
}

impl fmt::Debug for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChangeId({})", self.0)
    }
}

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable change key: `I` followed by 40 hex digits.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChangeKey(String);

impl ChangeKey {
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let Some(hex) = s.strip_prefix('I') else {
            return Err(InvalidId::ChangeKey {
                raw: s.to_string(),
                reason: "must start with 'I'".into(),
            }
            .into());
        };
        if !is_hex_of_len(hex, 40) {
            return Err(InvalidId::ChangeKey {
                raw: s.to_string(),
                reason: "expected 40 hex digits after 'I'".into(),
            }
            .into());
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ChangeKey {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ChangeKey> for String {
    fn from(key: ChangeKey) -> Self {
        key.0
    }
}

impl fmt::Debug for ChangeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChangeKey({:?})", self.0)
    }
}

impl fmt::Display for ChangeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Repository (project) name, a relative path such as `platform/core`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectName(String);

impl ProjectName {
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let invalid = |reason: &str| -> CoreError {
            InvalidId::Project {
                raw: s.to_string(),
                reason: reason.to_string(),
            }
            .into()
        };

        if s.is_empty() {
            return Err(invalid("empty"));
        }
        if s.starts_with('/') {
            return Err(invalid("must be relative"));
        }
        if s.ends_with(".git") || s.ends_with('/') {
            return Err(invalid("must not end with '.git' or '/'"));
        }
        if s.split('/').any(|part| part.is_empty() || part == "." || part == "..") {
            return Err(invalid("contains an empty, '.' or '..' component"));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProjectName {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ProjectName> for String {
    fn from(name: ProjectName) -> Self {
        name.0
    }
}

impl fmt::Debug for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProjectName({:?})", self.0)
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Full 40-hex commit id, normalized to lowercase.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitId(String);

impl CommitId {
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        if !is_hex_of_len(s, 40) {
            return Err(InvalidId::Commit {
                raw: s.to_string(),
                reason: "expected 40 hex digits".into(),
            }
            .into());
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CommitId {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<CommitId> for String {
    fn from(id: CommitId) -> Self {
        id.0
    }
}

impl fmt::Debug for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommitId({})", self.0)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    New,
    Merged,
    Abandoned,
}

/// A reviewer's signed vote on one label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub label: String,
    pub value: i16,
    pub account: Identity,
}

/// One review unit with the metadata a note records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub id: ChangeId,
    pub key: ChangeKey,
    pub project: ProjectName,
    pub branch: String,
    pub status: ChangeStatus,
    #[serde(default)]
    pub approvals: Vec<Approval>,
    pub submitter: Identity,
    pub merge_commit: CommitId,
    #[serde(with = "time::serde::timestamp")]
    pub submitted_at: OffsetDateTime,
}

impl Change {
    pub fn is_merged(&self) -> bool {
        self.status == ChangeStatus::Merged
    }
}

fn is_hex_of_len(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_hexdigit())
}
