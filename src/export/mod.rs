//! Bulk export of review notes for every merged change.
//!
//! `run_export` groups merged changes by project, starts a fixed pool of
//! workers sharing one [`Scheduler`], and blocks until all of them finish.
//! Failures stay scoped to the project they happened in.

mod scheduler;
mod worker;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use git2::{ErrorCode, Oid, Repository};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::core::{Change, LabelDefinitions, NoteSettings, ProjectName, build_note};
use crate::feed::ChangeSource;
use crate::git::{CommitOutcome, Committer, NoteBatch, NotesError, RepoManager};
use crate::progress::ProgressMonitor;
use crate::{Error, Result};

pub use scheduler::{Scheduler, WorkItem, partition_by_project};
use worker::{Worker, WorkerLog, report_failure};

pub const TASK_TITLE: &str = "Scanning merged changes";

/// What to do with a project whose notes ref kept moving.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Report the project and carry on with the rest.
    #[default]
    Skip,
    /// Stop handing out work and fail the run.
    Abort,
}

/// Everything needed to turn changes into notes in some repository.
#[derive(Clone, Debug)]
pub struct ExportContext {
    pub repos: RepoManager,
    pub labels: LabelDefinitions,
    pub note_settings: NoteSettings,
    pub notes_ref: String,
    pub committer: Committer,
    pub max_attempts: usize,
    pub on_conflict_exhausted: ConflictPolicy,
}

impl ExportContext {
    pub fn from_config(config: &Config) -> Self {
        Self {
            repos: RepoManager::new(config.base_path.clone()),
            labels: config.labels.clone(),
            note_settings: NoteSettings::new(
                config.timezone,
                config.anonymous_identity_label.clone(),
                config.canonical_base_url.clone(),
            ),
            notes_ref: config.notes_ref.clone(),
            committer: config.committer.clone(),
            max_attempts: config.max_attempts.max(1),
            on_conflict_exhausted: config.on_conflict_exhausted,
        }
    }

    /// Notes for `changes` whose merge commit exists in `repo`.
    pub fn build_batch(
        &self,
        repo: &Repository,
        changes: &[Change],
    ) -> std::result::Result<NoteBatch, NotesError> {
        let mut batch = NoteBatch::new();
        for change in changes {
            let commit = Oid::from_str(change.merge_commit.as_str())?;
            match repo.find_commit(commit) {
                Ok(_) => {}
                Err(e) if e.code() == ErrorCode::NotFound => {
                    tracing::warn!(
                        change = %change.id,
                        commit = %commit,
                        "merge commit not in repository, skipping"
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
            batch.insert(commit, build_note(change, &self.labels, &self.note_settings)?);
        }
        Ok(batch)
    }
}

/// Where a run writes its human-facing output.
pub struct ExportOutput {
    pub progress: Box<dyn Write + Send>,
    pub diagnostics: Box<dyn Write + Send>,
}

impl ExportOutput {
    pub fn stdio() -> Self {
        Self {
            progress: Box::new(std::io::stdout()),
            diagnostics: Box::new(std::io::stderr()),
        }
    }
}

#[derive(Debug)]
pub struct ProjectExport {
    pub project: ProjectName,
    pub notes: usize,
    pub outcome: CommitOutcome,
}

#[derive(Debug)]
pub struct ProjectFailure {
    pub project: ProjectName,
    pub error: NotesError,
}

#[derive(Debug, Default)]
pub struct ExportReport {
    pub total: u64,
    pub completed: i64,
    pub exported: Vec<ProjectExport>,
    pub failed: Vec<ProjectFailure>,
}

impl ExportReport {
    pub fn exported(&self, project: &str) -> Option<&ProjectExport> {
        self.exported.iter().find(|e| e.project.as_str() == project)
    }

    pub fn failed(&self, project: &str) -> Option<&ProjectFailure> {
        self.failed.iter().find(|f| f.project.as_str() == project)
    }
}

/// Export notes for every merged change in `feed` using `threads` workers.
///
/// Only a change feed failure, an abort under [`ConflictPolicy::Abort`] or a
/// worker thread dying fails the run. Project failures, including buckets no
/// worker got to, are written to `output.diagnostics` and listed in the
/// report.
pub fn run_export(
    ctx: &ExportContext,
    feed: &dyn ChangeSource,
    threads: usize,
    output: ExportOutput,
) -> Result<ExportReport> {
    let threads = threads.max(1);
    let changes = feed.merged_changes()?;
    let scheduler = Scheduler::new(changes);

    let monitor = ProgressMonitor::new(output.progress);
    let diagnostics = Mutex::new(output.diagnostics);
    let abort = AtomicBool::new(false);

    monitor.begin(TASK_TITLE, scheduler.total_changes() as u64);
    monitor.start_workers(threads);
    tracing::info!(
        projects = scheduler.pending(),
        changes = scheduler.total_changes(),
        threads,
        "starting review notes export"
    );

    let mut lost_workers = 0;
    let logs: Vec<WorkerLog> = thread::scope(|s| {
        let mut handles = Vec::with_capacity(threads);
        for n in 0..threads {
            let worker = Worker {
                ctx,
                scheduler: scheduler.clone(),
                progress: &monitor,
                diagnostics: &diagnostics,
                abort: &abort,
            };
            match thread::Builder::new()
                .name(format!("reviewnotes-export-{n}"))
                .spawn_scoped(s, move || worker.run())
            {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    tracing::error!(error = %err, "failed to spawn export worker");
                    monitor.end_worker();
                }
            }
        }

        monitor.wait_for_completion();
        handles
            .into_iter()
            .filter_map(|handle| match handle.join() {
                Ok(log) => Some(log),
                Err(_) => {
                    tracing::error!("export worker panicked");
                    lost_workers += 1;
                    None
                }
            })
            .collect()
    });
    monitor.end();

    let mut report = ExportReport {
        total: monitor.total(),
        completed: monitor.completed(),
        ..ExportReport::default()
    };
    let mut aborted = None;
    for log in logs {
        report.exported.extend(log.exported);
        report.failed.extend(log.failed);
        if aborted.is_none() {
            aborted = log.aborted;
        }
    }

    if let Some(failure) = aborted {
        debug_assert!(abort.load(Ordering::SeqCst));
        return Err(Error::Aborted {
            project: failure.project,
            source: failure.error,
        });
    }

    for item in scheduler.drain_unclaimed() {
        let error = NotesError::Interrupted {
            project: item.project.clone(),
            reason: "no export worker left to claim it".to_string(),
        };
        report_failure(&diagnostics, &item.project, &error);
        report.failed.push(ProjectFailure {
            project: item.project,
            error,
        });
    }
    if lost_workers > 0 {
        return Err(Error::WorkersLost {
            count: lost_workers,
        });
    }
    Ok(report)
}

/// Default change feed location when none is configured.
pub fn default_feed_path(base_path: &std::path::Path) -> PathBuf {
    base_path.join("changes.jsonl")
}
