//! Bulk export runs against real bare repositories.

use std::fs;

use git2::Repository;
use reviewnotes::Error;
use reviewnotes::export::{ConflictPolicy, ExportContext, TASK_TITLE, run_export};
use reviewnotes::feed::JsonlFeed;
use reviewnotes::git::{CommitOutcome, NotesError};
use reviewnotes::config::Timezone;
use reviewnotes::{ChangeStatus, CoreError, ProjectName};
use tempfile::TempDir;
use time::OffsetDateTime;

use crate::fixtures::changes::{
    UnavailableFeed, config, context, expected_note, merged_change,
};
use crate::fixtures::git::{
    commit_chain, init_project, notes_history_len, notes_tip, notes_tree_len, read_note,
};
use crate::fixtures::output::capture;

/// Lock the notes ref so every compare-and-swap attempt fails.
fn lock_notes_ref(repo: &Repository) {
    let dir = repo.path().join("refs").join("notes");
    fs::create_dir_all(&dir).expect("create refs/notes");
    fs::write(dir.join("review.lock"), b"").expect("write lock file");
}

#[test]
fn one_commit_per_project_with_every_note() {
    let temp = TempDir::new().unwrap();
    let p = init_project(temp.path(), "P").unwrap();
    let q = init_project(temp.path(), "Q").unwrap();
    let commits = commit_chain(&p, "main", 3).unwrap();
    let q_commits = commit_chain(&q, "main", 1).unwrap();

    let mut pending = merged_change(9, "Q", q_commits[0]);
    pending.status = ChangeStatus::New;
    let mut changes: Vec<_> = commits
        .iter()
        .enumerate()
        .map(|(n, oid)| merged_change(n as u32 + 1, "P", *oid))
        .collect();
    changes.push(pending);
    let feed = JsonlFeed::from_changes(changes);

    let (captured, output) = capture();
    let report = run_export(&context(temp.path()), &feed, 1, output).unwrap();

    assert_eq!(notes_history_len(&p), 1);
    assert_eq!(notes_tree_len(&p), 3);
    for (n, oid) in commits.iter().enumerate() {
        let id = n as u32 + 1;
        assert_eq!(read_note(&p, *oid).as_deref(), Some(expected_note(id, "P").as_str()));
    }
    assert!(notes_tip(&q).is_none());

    assert_eq!(report.total, 3);
    assert_eq!(report.completed, 3);
    assert!(report.failed.is_empty());
    let exported = report.exported("P").expect("P exported");
    assert_eq!(exported.notes, 3);
    assert!(matches!(
        exported.outcome,
        CommitOutcome::Committed { attempts: 1, .. }
    ));
    assert!(report.exported("Q").is_none());

    assert!(
        captured
            .progress
            .text()
            .ends_with(&format!("\r{TASK_TITLE}: 100% (3/3), done\n"))
    );
    assert_eq!(captured.diagnostics.text(), "");
}

#[test]
fn two_workers_each_project_exported_once() {
    let temp = TempDir::new().unwrap();
    let p = init_project(temp.path(), "P").unwrap();
    let q = init_project(temp.path(), "Q").unwrap();
    let p_commits = commit_chain(&p, "main", 3).unwrap();
    let q_commits = commit_chain(&q, "main", 2).unwrap();

    let mut changes = Vec::new();
    for (n, oid) in p_commits.iter().enumerate() {
        changes.push(merged_change(n as u32 + 1, "P", *oid));
    }
    for (n, oid) in q_commits.iter().enumerate() {
        changes.push(merged_change(n as u32 + 10, "Q", *oid));
    }
    let feed = JsonlFeed::from_changes(changes);

    let (_captured, output) = capture();
    let report = run_export(&context(temp.path()), &feed, 2, output).unwrap();

    assert_eq!(report.exported.len(), 2);
    assert_eq!(report.exported("P").unwrap().notes, 3);
    assert_eq!(report.exported("Q").unwrap().notes, 2);
    assert_eq!(report.completed, 5);

    for (repo, count) in [(&p, 3), (&q, 2)] {
        assert_eq!(notes_history_len(repo), 1);
        assert_eq!(notes_tree_len(repo), count);
    }
    assert_eq!(read_note(&q, q_commits[1]), Some(expected_note(11, "Q")));
}

#[test]
fn missing_repository_does_not_stop_siblings() {
    let temp = TempDir::new().unwrap();
    let p = init_project(temp.path(), "P").unwrap();
    let commits = commit_chain(&p, "main", 1).unwrap();
    let feed = JsonlFeed::from_changes(vec![
        merged_change(1, "P", commits[0]),
        merged_change(2, "gone", commits[0]),
    ]);

    let (captured, output) = capture();
    let report = run_export(&context(temp.path()), &feed, 2, output).unwrap();

    assert_eq!(captured.diagnostics.text(), "Unable to open project: gone\n");
    let failure = report.failed("gone").expect("gone failed");
    assert!(matches!(failure.error, NotesError::RepositoryNotFound { .. }));
    assert!(report.exported("gone").is_none());

    assert_eq!(read_note(&p, commits[0]), Some(expected_note(1, "P")));
}

#[test]
fn unrenderable_submission_time_fails_only_its_project() {
    let temp = TempDir::new().unwrap();
    let a = init_project(temp.path(), "A").unwrap();
    let b = init_project(temp.path(), "B").unwrap();
    let a_commits = commit_chain(&a, "main", 1).unwrap();
    let b_commits = commit_chain(&b, "main", 1).unwrap();

    // 9999-12-31 23:59:59 UTC has no +01:00 rendering.
    let mut last_second = merged_change(1, "A", a_commits[0]);
    last_second.submitted_at = OffsetDateTime::from_unix_timestamp(253_402_300_799).unwrap();
    let feed = JsonlFeed::from_changes(vec![last_second, merged_change(2, "B", b_commits[0])]);

    let mut cfg = config(temp.path());
    cfg.timezone = Timezone::parse("+01:00").unwrap();
    let ctx = ExportContext::from_config(&cfg);

    let (captured, output) = capture();
    let report = run_export(&ctx, &feed, 1, output).unwrap();

    let failure = report.failed("A").expect("A failed");
    assert!(matches!(
        failure.error,
        NotesError::Build(CoreError::DateFormat(_))
    ));
    let diagnostics = captured.diagnostics.text();
    assert_eq!(diagnostics.lines().count(), 1);
    assert!(diagnostics.starts_with("A: "));
    assert!(notes_tip(&a).is_none());

    assert_eq!(report.exported("B").unwrap().notes, 1);
    assert!(read_note(&b, b_commits[0]).is_some());
    assert_eq!(report.total, 2);
    assert_eq!(report.completed, 1);
}

#[test]
fn rerun_writes_no_new_commit() {
    let temp = TempDir::new().unwrap();
    let p = init_project(temp.path(), "P").unwrap();
    let commits = commit_chain(&p, "main", 2).unwrap();
    let feed = JsonlFeed::from_changes(
        commits
            .iter()
            .enumerate()
            .map(|(n, oid)| merged_change(n as u32 + 1, "P", *oid))
            .collect(),
    );
    let ctx = context(temp.path());

    let (_first, output) = capture();
    run_export(&ctx, &feed, 2, output).unwrap();
    let tip = notes_tip(&p);

    let (_second, output) = capture();
    let report = run_export(&ctx, &feed, 2, output).unwrap();

    assert_eq!(notes_tip(&p), tip);
    assert_eq!(notes_history_len(&p), 1);
    assert!(matches!(
        report.exported("P").unwrap().outcome,
        CommitOutcome::Unchanged { .. }
    ));
}

#[test]
fn missing_merge_commit_is_skipped() {
    let temp = TempDir::new().unwrap();
    let p = init_project(temp.path(), "P").unwrap();
    let commits = commit_chain(&p, "main", 1).unwrap();
    let stranger = git2::Oid::from_str(&"ab".repeat(20)).unwrap();
    let feed = JsonlFeed::from_changes(vec![
        merged_change(1, "P", commits[0]),
        merged_change(2, "P", stranger),
    ]);

    let (_captured, output) = capture();
    let report = run_export(&context(temp.path()), &feed, 1, output).unwrap();

    assert_eq!(report.exported("P").unwrap().notes, 1);
    assert_eq!(notes_tree_len(&p), 1);
    assert!(read_note(&p, stranger).is_none());
}

#[test]
fn unavailable_feed_fails_the_run() {
    let temp = TempDir::new().unwrap();
    let (captured, output) = capture();

    let err = run_export(&context(temp.path()), &UnavailableFeed, 2, output).unwrap_err();

    assert!(matches!(err, Error::Feed(_)));
    assert!(err.transience().is_retryable());
    assert_eq!(captured.diagnostics.text(), "");
}

#[test]
fn exhausted_conflicts_skip_by_default() {
    let temp = TempDir::new().unwrap();
    let a = init_project(temp.path(), "A").unwrap();
    let b = init_project(temp.path(), "B").unwrap();
    let a_commits = commit_chain(&a, "main", 1).unwrap();
    let b_commits = commit_chain(&b, "main", 1).unwrap();
    lock_notes_ref(&a);

    let feed = JsonlFeed::from_changes(vec![
        merged_change(1, "A", a_commits[0]),
        merged_change(2, "B", b_commits[0]),
    ]);
    let mut cfg = config(temp.path());
    cfg.max_attempts = 2;
    let ctx = ExportContext::from_config(&cfg);
    assert_eq!(ctx.on_conflict_exhausted, ConflictPolicy::Skip);

    let (captured, output) = capture();
    let report = run_export(&ctx, &feed, 1, output).unwrap();

    let failure = report.failed("A").expect("A failed");
    assert!(matches!(
        failure.error,
        NotesError::TooManyAttempts { attempts: 2, .. }
    ));
    assert!(captured.diagnostics.text().starts_with("A: "));
    assert!(notes_tip(&a).is_none());
    assert_eq!(read_note(&b, b_commits[0]), Some(expected_note(2, "B")));
}

#[test]
fn exhausted_conflicts_abort_when_configured() {
    let temp = TempDir::new().unwrap();
    let a = init_project(temp.path(), "A").unwrap();
    let b = init_project(temp.path(), "B").unwrap();
    let a_commits = commit_chain(&a, "main", 1).unwrap();
    let b_commits = commit_chain(&b, "main", 1).unwrap();
    lock_notes_ref(&a);

    let feed = JsonlFeed::from_changes(vec![
        merged_change(1, "A", a_commits[0]),
        merged_change(2, "B", b_commits[0]),
    ]);
    let mut cfg = config(temp.path());
    cfg.max_attempts = 2;
    cfg.on_conflict_exhausted = ConflictPolicy::Abort;
    let ctx = ExportContext::from_config(&cfg);

    let (_captured, output) = capture();
    let err = run_export(&ctx, &feed, 1, output).unwrap_err();

    match err {
        Error::Aborted { project, source } => {
            assert_eq!(project, ProjectName::parse("A").unwrap());
            assert!(source.is_conflict());
        }
        other => panic!("expected abort, got {other:?}"),
    }
    // The single worker stops before claiming B.
    assert!(notes_tip(&b).is_none());
}
