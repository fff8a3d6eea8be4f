//! Commit enumeration for reference updates.

use git2::{Oid, Repository, Sort};

use super::error::NotesError;

/// Commits reachable from `new` but not from `old`, oldest first.
///
/// A zero `old` means the branch was created, so everything reachable from
/// `new` counts. A zero `new` means the branch was deleted and yields nothing.
pub fn commits_in_range(repo: &Repository, old: Oid, new: Oid) -> Result<Vec<Oid>, NotesError> {
    if new.is_zero() {
        return Ok(Vec::new());
    }
    let mut walk = repo.revwalk()?;
    walk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)?;
    walk.push(new)?;
    if !old.is_zero() {
        walk.hide(old)?;
    }
    Ok(walk.collect::<Result<Vec<_>, _>>()?)
}
