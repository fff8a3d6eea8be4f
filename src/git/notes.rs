//! Review notes storage.
//!
//! Notes live in a tree reachable from a dedicated reference, one blob per
//! annotated commit, named by the commit's full hex id. Writers never lock:
//! each attempt reads the tip, builds a new tree and commit on top of it, and
//! publishes with a compare-and-swap on the reference. Losing the race means
//! starting over from the new tip, up to `max_attempts` times.

use std::collections::BTreeMap;
use std::path::Path;

use git2::{ErrorCode, ObjectType, Oid, Repository, Signature, Tree, TreeBuilder};
use serde::{Deserialize, Serialize};

use super::error::NotesError;
use crate::progress::Progress;

/// Default reference holding review notes.
pub const DEFAULT_NOTES_REF: &str = "refs/notes/review";

const FILE_MODE: i32 = 0o100644;
const DIR_MODE: i32 = 0o040000;
const COMMIT_SUBJECT: &str = "Update notes for submitted changes";
const REFLOG_MESSAGE: &str = "reviewnotes: update notes";

/// Identity used to author and commit notes commits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Committer {
    pub name: String,
    pub email: String,
}

impl Default for Committer {
    fn default() -> Self {
        Self {
            name: "Review Notes".to_string(),
            email: "reviewnotes@localhost".to_string(),
        }
    }
}

/// Notes to write in one atomic update, at most one per commit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NoteBatch {
    entries: BTreeMap<Oid, String>,
}

impl NoteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the note for `commit`.
    pub fn insert(&mut self, commit: Oid, content: String) {
        self.entries.insert(commit, content);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Oid, &str)> {
        self.entries.iter().map(|(oid, content)| (*oid, content.as_str()))
    }
}

/// Result of [`NotesWriter::commit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A new notes commit was published.
    Committed { commit: Oid, attempts: usize },
    /// Every note already existed with identical content.
    Unchanged { attempts: usize },
    /// Nothing to write.
    Empty,
}

impl CommitOutcome {
    pub fn commit(&self) -> Option<Oid> {
        match self {
            CommitOutcome::Committed { commit, .. } => Some(*commit),
            CommitOutcome::Unchanged { .. } | CommitOutcome::Empty => None,
        }
    }
}

/// Writes note batches onto one repository's notes reference.
pub struct NotesWriter<'r> {
    repo: &'r Repository,
    refname: &'r str,
    committer: &'r Committer,
    max_attempts: usize,
}

impl<'r> NotesWriter<'r> {
    pub fn new(
        repo: &'r Repository,
        refname: &'r str,
        committer: &'r Committer,
        max_attempts: usize,
    ) -> Self {
        Self {
            repo,
            refname,
            committer,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Current notes commit, or `None` before the first write.
    pub fn read_tip(&self) -> Result<Option<Oid>, NotesError> {
        match self.repo.refname_to_id(self.refname) {
            Ok(oid) => Ok(Some(oid)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Note attached to `commit` at the current tip.
    pub fn read_note(&self, commit: Oid) -> Result<Option<String>, NotesError> {
        let Some(tip) = self.read_tip()? else {
            return Ok(None);
        };
        let tree = self.repo.find_commit(tip)?.tree()?;
        let name = commit.to_string();
        let (dir, rest) = name.split_at(2);

        let entry_id = match tree.get_name(&name) {
            Some(entry) => Some(entry.id()),
            None => match tree.get_path(Path::new(dir).join(rest).as_path()) {
                Ok(entry) => Some(entry.id()),
                Err(e) if e.code() == ErrorCode::NotFound => None,
                Err(e) => return Err(e.into()),
            },
        };
        let Some(id) = entry_id else {
            return Ok(None);
        };
        let blob = self.repo.find_blob(id)?;
        Ok(Some(String::from_utf8_lossy(blob.content()).into_owned()))
    }

    /// Publish `batch` atomically.
    ///
    /// Each attempt credits `batch.len()` to `progress` once its tree is
    /// built. An attempt that loses the compare-and-swap retracts that credit
    /// before retrying; the final attempt's credit stands.
    pub fn commit(
        &self,
        batch: &NoteBatch,
        progress: &dyn Progress,
    ) -> Result<CommitOutcome, NotesError> {
        if batch.is_empty() {
            return Ok(CommitOutcome::Empty);
        }
        let credit = batch.len() as i64;
        let mut attempts = 0;

        loop {
            attempts += 1;
            let tip = self.read_tip()?;
            let base = match tip {
                Some(oid) => Some(self.repo.find_commit(oid)?.tree()?),
                None => None,
            };
            let tree_oid = self.build_tree(base.as_ref(), batch)?;
            progress.update(credit);

            if base.as_ref().map(Tree::id) == Some(tree_oid) {
                tracing::debug!(refname = self.refname, "notes already up to date");
                return Ok(CommitOutcome::Unchanged { attempts });
            }

            let commit = self.write_commit(tree_oid, tip, batch)?;
            match self.swap_ref(tip, commit) {
                Ok(()) => {
                    tracing::info!(
                        refname = self.refname,
                        commit = %commit,
                        notes = batch.len(),
                        attempts,
                        "review notes committed"
                    );
                    return Ok(CommitOutcome::Committed { commit, attempts });
                }
                Err(err) if err.is_conflict() => {
                    if attempts >= self.max_attempts {
                        tracing::debug!(
                            refname = self.refname,
                            attempts,
                            "notes ref kept moving, giving up"
                        );
                        return Err(NotesError::TooManyAttempts {
                            refname: self.refname.to_string(),
                            attempts,
                        });
                    }
                    progress.update(-credit);
                    tracing::debug!(refname = self.refname, attempt = attempts, "lost race, retrying");
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn build_tree(&self, base: Option<&Tree<'_>>, batch: &NoteBatch) -> Result<Oid, NotesError> {
        let mut builder = self.repo.treebuilder(base)?;
        for (commit, content) in batch.iter() {
            let name = commit.to_string();
            self.remove_fanout_entry(&mut builder, &name)?;
            let blob = self.repo.blob(content.as_bytes())?;
            builder.insert(&name, blob, FILE_MODE)?;
        }
        Ok(builder.write()?)
    }

    /// Drop a `ab/cdef...` note for the same commit so only one note remains.
    fn remove_fanout_entry(
        &self,
        builder: &mut TreeBuilder<'_>,
        name: &str,
    ) -> Result<(), NotesError> {
        let (dir, rest) = name.split_at(2);
        let (kind, id) = match builder.get(dir)? {
            Some(entry) => (entry.kind(), entry.id()),
            None => return Ok(()),
        };
        if kind != Some(ObjectType::Tree) {
            return Ok(());
        }
        let subtree = self.repo.find_tree(id)?;
        if subtree.get_name(rest).is_none() {
            return Ok(());
        }

        let mut sub = self.repo.treebuilder(Some(&subtree))?;
        sub.remove(rest)?;
        if sub.len() == 0 {
            builder.remove(dir)?;
        } else {
            let sub_oid = sub.write()?;
            builder.insert(dir, sub_oid, DIR_MODE)?;
        }
        Ok(())
    }

    fn write_commit(
        &self,
        tree_oid: Oid,
        parent: Option<Oid>,
        batch: &NoteBatch,
    ) -> Result<Oid, NotesError> {
        let tree = self.repo.find_tree(tree_oid)?;
        let sig = Signature::now(&self.committer.name, &self.committer.email)?;
        let message = self.commit_message(batch);

        let parents = match parent {
            Some(oid) => vec![self.repo.find_commit(oid)?],
            None => Vec::new(),
        };
        let parent_refs: Vec<_> = parents.iter().collect();
        Ok(self
            .repo
            .commit(None, &sig, &sig, &message, &tree, &parent_refs)?)
    }

    fn commit_message(&self, batch: &NoteBatch) -> String {
        let mut message = format!("{COMMIT_SUBJECT}\n\n");
        for (commit, _) in batch.iter() {
            let summary = self
                .repo
                .find_commit(commit)
                .ok()
                .and_then(|c| c.summary().map(str::to_string))
                .unwrap_or_else(|| commit.to_string());
            message.push_str("* ");
            message.push_str(&summary);
            message.push('\n');
        }
        message
    }

    /// Move the reference from `expected` to `new`, failing if it moved.
    fn swap_ref(&self, expected: Option<Oid>, new: Oid) -> Result<(), NotesError> {
        let result = match expected {
            Some(old) => self
                .repo
                .reference_matching(self.refname, new, true, old, REFLOG_MESSAGE)
                .map(drop),
            None => self
                .repo
                .reference(self.refname, new, false, REFLOG_MESSAGE)
                .map(drop),
        };
        match result {
            Ok(()) => Ok(()),
            Err(e)
                if matches!(
                    e.code(),
                    ErrorCode::Modified | ErrorCode::Exists | ErrorCode::Locked | ErrorCode::NotFound
                ) =>
            {
                Err(NotesError::ConcurrentUpdate {
                    refname: self.refname.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}
