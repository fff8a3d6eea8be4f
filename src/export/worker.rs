//! Export workers.

use std::any::Any;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use super::scheduler::{Scheduler, WorkItem};
use super::{ConflictPolicy, ExportContext, ProjectExport, ProjectFailure};
use crate::core::ProjectName;
use crate::git::{NotesError, NotesWriter};
use crate::progress::ProgressMonitor;

/// What one worker did over its lifetime.
#[derive(Debug, Default)]
pub(super) struct WorkerLog {
    pub(super) exported: Vec<ProjectExport>,
    pub(super) failed: Vec<ProjectFailure>,
    pub(super) aborted: Option<ProjectFailure>,
}

pub(super) struct Worker<'a> {
    pub(super) ctx: &'a ExportContext,
    pub(super) scheduler: Scheduler,
    pub(super) progress: &'a ProgressMonitor,
    pub(super) diagnostics: &'a Mutex<Box<dyn Write + Send>>,
    pub(super) abort: &'a AtomicBool,
}

/// Ends the worker's registration even if the loop panics.
struct EndWorker<'a>(&'a ProgressMonitor);

impl Drop for EndWorker<'_> {
    fn drop(&mut self) {
        self.0.end_worker();
    }
}

impl Worker<'_> {
    pub(super) fn run(self) -> WorkerLog {
        let _end = EndWorker(self.progress);
        let mut log = WorkerLog::default();

        while !self.abort.load(Ordering::SeqCst) {
            let Some(item) = self.scheduler.claim_next() else {
                break;
            };
            let result = panic::catch_unwind(AssertUnwindSafe(|| self.export(&item)))
                .unwrap_or_else(|payload| {
                    Err(NotesError::Interrupted {
                        project: item.project.clone(),
                        reason: panic_message(payload.as_ref()),
                    })
                });
            match result {
                Ok(export) => log.exported.push(export),
                Err(error) => {
                    report_failure(self.diagnostics, &item.project, &error);
                    let failure = ProjectFailure {
                        project: item.project,
                        error,
                    };
                    if failure.error.is_conflict()
                        && self.ctx.on_conflict_exhausted == ConflictPolicy::Abort
                    {
                        self.abort.store(true, Ordering::SeqCst);
                        log.aborted = Some(failure);
                        break;
                    }
                    log.failed.push(failure);
                }
            }
        }
        log
    }

    fn export(&self, item: &WorkItem) -> Result<ProjectExport, NotesError> {
        let span = tracing::info_span!("export_project", project = %item.project);
        let _guard = span.enter();

        let repo = self.ctx.repos.open(&item.project)?;
        let batch = self.ctx.build_batch(&repo, &item.changes)?;
        let writer = NotesWriter::new(
            &repo,
            &self.ctx.notes_ref,
            &self.ctx.committer,
            self.ctx.max_attempts,
        );
        let outcome = writer.commit(&batch, self.progress)?;
        Ok(ProjectExport {
            project: item.project.clone(),
            notes: batch.len(),
            outcome,
        })
    }
}

/// Write the one diagnostic line for a failed project.
pub(super) fn report_failure(
    diagnostics: &Mutex<Box<dyn Write + Send>>,
    project: &ProjectName,
    error: &NotesError,
) {
    tracing::debug!(project = %project, error = %error, "review notes export failed");
    let line = match error {
        NotesError::RepositoryNotFound { .. } | NotesError::Interrupted { .. } => {
            error.to_string()
        }
        _ => format!("{project}: {error}"),
    };
    let mut out = diagnostics.lock().unwrap_or_else(PoisonError::into_inner);
    let _ = writeln!(out, "{line}");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}
