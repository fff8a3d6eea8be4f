//! Incremental notes driven by reference updates.

use std::sync::Arc;

use git2::Oid;
use reviewnotes::feed::JsonlFeed;
use reviewnotes::git::CommitOutcome;
use reviewnotes::listener::{RefUpdate, RefUpdateListener, RefUpdatedEvent, create_review_notes};
use reviewnotes::{ChangeStatus, ProjectName};
use tempfile::TempDir;

use crate::fixtures::changes::{context, expected_note, merged_change};
use crate::fixtures::git::{
    commit_chain, init_project, notes_history_len, notes_tip, notes_tree_len, read_note,
};

fn event(project: &str, ref_name: &str, old: Oid, new: Oid) -> RefUpdatedEvent {
    RefUpdatedEvent {
        project: ProjectName::parse(project).unwrap(),
        updates: vec![RefUpdate {
            ref_name: ref_name.to_string(),
            old,
            new,
        }],
    }
}

#[test]
fn new_branch_notes_every_merged_commit() {
    let temp = TempDir::new().unwrap();
    let repo = init_project(temp.path(), "P").unwrap();
    let commits = commit_chain(&repo, "main", 3).unwrap();
    let feed = JsonlFeed::from_changes(vec![
        merged_change(1, "P", commits[0]),
        merged_change(3, "P", commits[2]),
    ]);

    let outcome = create_review_notes(
        &context(temp.path()),
        &feed,
        &event("P", "refs/heads/main", Oid::zero(), commits[2]),
    )
    .unwrap();

    assert!(matches!(outcome, CommitOutcome::Committed { .. }));
    assert_eq!(read_note(&repo, commits[0]), Some(expected_note(1, "P")));
    assert!(read_note(&repo, commits[1]).is_none());
    assert_eq!(read_note(&repo, commits[2]), Some(expected_note(3, "P")));
    assert_eq!(notes_history_len(&repo), 1);
}

#[test]
fn only_commits_after_old_tip_are_noted() {
    let temp = TempDir::new().unwrap();
    let repo = init_project(temp.path(), "P").unwrap();
    let first = commit_chain(&repo, "main", 2).unwrap();
    let second = commit_chain(&repo, "main", 2).unwrap();
    let feed = JsonlFeed::from_changes(
        first
            .iter()
            .chain(second.iter())
            .enumerate()
            .map(|(n, oid)| merged_change(n as u32 + 1, "P", *oid))
            .collect(),
    );

    create_review_notes(
        &context(temp.path()),
        &feed,
        &event("P", "refs/heads/main", first[1], second[1]),
    )
    .unwrap();

    assert_eq!(notes_tree_len(&repo), 2);
    assert!(read_note(&repo, first[0]).is_none());
    assert!(read_note(&repo, first[1]).is_none());
    assert_eq!(read_note(&repo, second[0]), Some(expected_note(3, "P")));
    assert_eq!(read_note(&repo, second[1]), Some(expected_note(4, "P")));
}

#[test]
fn unmerged_changes_get_no_note() {
    let temp = TempDir::new().unwrap();
    let repo = init_project(temp.path(), "P").unwrap();
    let commits = commit_chain(&repo, "main", 1).unwrap();
    let mut abandoned = merged_change(1, "P", commits[0]);
    abandoned.status = ChangeStatus::Abandoned;
    let feed = JsonlFeed::from_changes(vec![abandoned]);

    let outcome = create_review_notes(
        &context(temp.path()),
        &feed,
        &event("P", "refs/heads/main", Oid::zero(), commits[0]),
    )
    .unwrap();

    assert_eq!(outcome, CommitOutcome::Empty);
    assert!(notes_tip(&repo).is_none());
}

#[test]
fn non_branch_refs_and_deletions_write_nothing() {
    let temp = TempDir::new().unwrap();
    let repo = init_project(temp.path(), "P").unwrap();
    let commits = commit_chain(&repo, "main", 1).unwrap();
    let feed = JsonlFeed::from_changes(vec![merged_change(1, "P", commits[0])]);
    let ctx = context(temp.path());

    let tag = event("P", "refs/tags/v1.0", Oid::zero(), commits[0]);
    assert_eq!(create_review_notes(&ctx, &feed, &tag).unwrap(), CommitOutcome::Empty);

    let deleted = event("P", "refs/heads/main", commits[0], Oid::zero());
    assert_eq!(
        create_review_notes(&ctx, &feed, &deleted).unwrap(),
        CommitOutcome::Empty
    );
    assert!(notes_tip(&repo).is_none());
}

#[test]
fn queued_updates_drain_on_shutdown() {
    let temp = TempDir::new().unwrap();
    let p = init_project(temp.path(), "P").unwrap();
    let q = init_project(temp.path(), "Q").unwrap();
    let p_commits = commit_chain(&p, "main", 2).unwrap();
    let q_commits = commit_chain(&q, "main", 1).unwrap();
    let feed = JsonlFeed::from_changes(vec![
        merged_change(1, "P", p_commits[0]),
        merged_change(2, "P", p_commits[1]),
        merged_change(3, "Q", q_commits[0]),
    ]);

    let listener =
        RefUpdateListener::new(Arc::new(context(temp.path())), Arc::new(feed), true).unwrap();
    listener.on_ref_updated(event("P", "refs/heads/main", Oid::zero(), p_commits[0]));
    listener.on_ref_updated(event("P", "refs/heads/main", p_commits[0], p_commits[1]));
    listener.on_ref_updated(event("Q", "refs/heads/main", Oid::zero(), q_commits[0]));
    listener.shutdown();

    assert_eq!(notes_history_len(&p), 2);
    assert_eq!(read_note(&p, p_commits[0]), Some(expected_note(1, "P")));
    assert_eq!(read_note(&p, p_commits[1]), Some(expected_note(2, "P")));
    assert_eq!(read_note(&q, q_commits[0]), Some(expected_note(3, "Q")));
}

#[test]
fn synchronous_listener_swallows_failures() {
    let temp = TempDir::new().unwrap();
    let repo = init_project(temp.path(), "P").unwrap();
    let commits = commit_chain(&repo, "main", 1).unwrap();
    let feed = JsonlFeed::from_changes(vec![merged_change(1, "P", commits[0])]);

    let listener = RefUpdateListener::new(Arc::new(context(temp.path())), Arc::new(feed), false)
        .unwrap();
    listener.on_ref_updated(event("missing", "refs/heads/main", Oid::zero(), commits[0]));
    listener.on_ref_updated(event("P", "refs/heads/main", Oid::zero(), commits[0]));
    listener.shutdown();

    assert_eq!(read_note(&repo, commits[0]), Some(expected_note(1, "P")));
}
