use std::path::Path;

use git2::{Oid, Repository, Signature, Time};

pub const NOTES_REF: &str = "refs/notes/review";

/// Bare repository for `project` under `base`, laid out as `<project>.git`.
pub fn init_project(base: &Path, project: &str) -> Result<Repository, String> {
    let path = base.join(format!("{project}.git"));
    Repository::init_bare(&path)
        .map_err(|err| format!("git init --bare failed for {path:?}: {err}"))
}

/// Append `count` commits to `refs/heads/<branch>`, returning them oldest first.
pub fn commit_chain(repo: &Repository, branch: &str, count: usize) -> Result<Vec<Oid>, String> {
    let refname = format!("refs/heads/{branch}");
    let sig = Signature::new("Dev", "dev@example.com", &Time::new(1_360_000_000, 0))
        .map_err(|err| format!("signature failed: {err}"))?;
    let mut parent = repo
        .find_reference(&refname)
        .ok()
        .and_then(|r| r.target());

    let mut out = Vec::with_capacity(count);
    for n in 0..count {
        let blob = repo
            .blob(format!("{branch} {n}\n").as_bytes())
            .map_err(|err| format!("write blob failed: {err}"))?;
        let mut builder = repo
            .treebuilder(None)
            .map_err(|err| format!("treebuilder failed: {err}"))?;
        builder
            .insert("file.txt", blob, 0o100644)
            .map_err(|err| format!("tree insert failed: {err}"))?;
        let tree_oid = builder
            .write()
            .map_err(|err| format!("tree write failed: {err}"))?;
        let tree = repo
            .find_tree(tree_oid)
            .map_err(|err| format!("find tree failed: {err}"))?;
        let parents = match parent {
            Some(oid) => vec![
                repo.find_commit(oid)
                    .map_err(|err| format!("find parent failed: {err}"))?,
            ],
            None => Vec::new(),
        };
        let parent_refs: Vec<_> = parents.iter().collect();
        let oid = repo
            .commit(
                Some(&refname),
                &sig,
                &sig,
                &format!("Change {n} on {branch}"),
                &tree,
                &parent_refs,
            )
            .map_err(|err| format!("commit failed: {err}"))?;
        out.push(oid);
        parent = Some(oid);
    }
    Ok(out)
}

pub fn notes_tip(repo: &Repository) -> Option<Oid> {
    repo.find_reference(NOTES_REF).ok().and_then(|r| r.target())
}

/// Note text for `commit`, read through libgit2's own notes lookup.
pub fn read_note(repo: &Repository, commit: Oid) -> Option<String> {
    repo.find_note(Some(NOTES_REF), commit)
        .ok()
        .and_then(|note| note.message().map(str::to_string))
}

/// Number of commits on the notes reference.
pub fn notes_history_len(repo: &Repository) -> usize {
    let Some(tip) = notes_tip(repo) else {
        return 0;
    };
    let mut walk = repo.revwalk().expect("revwalk");
    walk.push(tip).expect("push tip");
    walk.count()
}

/// Number of entries in the tree at the notes tip.
pub fn notes_tree_len(repo: &Repository) -> usize {
    let Some(tip) = notes_tip(repo) else {
        return 0;
    };
    repo.find_commit(tip)
        .and_then(|c| c.tree())
        .map(|t| t.len())
        .unwrap_or(0)
}
