//! Incremental notes for reference updates.
//!
//! When a branch moves, every commit newly reachable from it that belongs to
//! a merged change gets its note, committed as one batch. Updates either run
//! on the caller's thread or go through a [`NotesQueue`] background thread.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{Receiver, Sender};
use git2::Oid;

use crate::core::{ProjectName, build_note};
use crate::export::ExportContext;
use crate::feed::ChangeSource;
use crate::git::{CommitOutcome, NoteBatch, NotesWriter, commits_in_range};
use crate::progress::NoProgress;
use crate::Result;

const BRANCH_PREFIX: &str = "refs/heads/";

/// One reference that moved from `old` to `new`. A zero id means absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefUpdate {
    pub ref_name: String,
    pub old: Oid,
    pub new: Oid,
}

impl RefUpdate {
    pub fn is_branch(&self) -> bool {
        self.ref_name.starts_with(BRANCH_PREFIX)
    }
}

#[derive(Clone, Debug)]
pub struct RefUpdatedEvent {
    pub project: ProjectName,
    pub updates: Vec<RefUpdate>,
}

/// Write notes for every merged change newly reachable through `event`.
pub fn create_review_notes(
    ctx: &ExportContext,
    feed: &dyn ChangeSource,
    event: &RefUpdatedEvent,
) -> Result<CommitOutcome> {
    let branches: Vec<&RefUpdate> = event.updates.iter().filter(|u| u.is_branch()).collect();
    if branches.is_empty() {
        return Ok(CommitOutcome::Empty);
    }

    let span = tracing::info_span!("ref_updated", project = %event.project);
    let _guard = span.enter();

    let repo = ctx.repos.open(&event.project)?;
    let mut batch = NoteBatch::new();
    for update in branches {
        for commit in commits_in_range(&repo, update.old, update.new)? {
            let Some(change) = feed.change_for_commit(&event.project, commit)? else {
                continue;
            };
            if !change.is_merged() {
                continue;
            }
            batch.insert(commit, build_note(&change, &ctx.labels, &ctx.note_settings)?);
        }
    }
    tracing::debug!(notes = batch.len(), "collected notes for reference update");

    let writer = NotesWriter::new(&repo, &ctx.notes_ref, &ctx.committer, ctx.max_attempts);
    Ok(writer.commit(&batch, &NoProgress)?)
}

/// Entry point for reference-update notifications.
pub struct RefUpdateListener {
    ctx: Arc<ExportContext>,
    feed: Arc<dyn ChangeSource>,
    queue: Option<NotesQueue>,
}

impl RefUpdateListener {
    /// Updates run on the notifying thread.
    pub fn synchronous(ctx: Arc<ExportContext>, feed: Arc<dyn ChangeSource>) -> Self {
        Self {
            ctx,
            feed,
            queue: None,
        }
    }

    /// Updates are handed to a background queue.
    pub fn with_queue(ctx: Arc<ExportContext>, feed: Arc<dyn ChangeSource>) -> io::Result<Self> {
        let queue = NotesQueue::start(Arc::clone(&ctx), Arc::clone(&feed))?;
        Ok(Self {
            ctx,
            feed,
            queue: Some(queue),
        })
    }

    pub fn new(
        ctx: Arc<ExportContext>,
        feed: Arc<dyn ChangeSource>,
        async_updates: bool,
    ) -> io::Result<Self> {
        if async_updates {
            Self::with_queue(ctx, feed)
        } else {
            Ok(Self::synchronous(ctx, feed))
        }
    }

    /// Failures are logged, never returned to the notifier.
    pub fn on_ref_updated(&self, event: RefUpdatedEvent) {
        match &self.queue {
            Some(queue) => queue.enqueue(event),
            None => run_logged(&self.ctx, self.feed.as_ref(), &event),
        }
    }

    /// Drain queued updates and stop the background thread, if any.
    pub fn shutdown(self) {
        if let Some(queue) = self.queue {
            queue.shutdown();
        }
    }
}

enum QueueCommand {
    Update(RefUpdatedEvent),
    Shutdown,
}

/// Single background thread applying reference updates in arrival order.
pub struct NotesQueue {
    tx: Sender<QueueCommand>,
    handle: JoinHandle<()>,
}

impl NotesQueue {
    pub fn start(ctx: Arc<ExportContext>, feed: Arc<dyn ChangeSource>) -> io::Result<Self> {
        let (tx, rx) = crossbeam::channel::unbounded();
        let handle = thread::Builder::new()
            .name("reviewnotes-listener".to_string())
            .spawn(move || run_queue(&ctx, feed.as_ref(), rx))?;
        Ok(Self { tx, handle })
    }

    pub fn enqueue(&self, event: RefUpdatedEvent) {
        if self.tx.send(QueueCommand::Update(event)).is_err() {
            tracing::error!("notes queue stopped, dropping reference update");
        }
    }

    /// Process everything already queued, then join the thread.
    pub fn shutdown(self) {
        let _ = self.tx.send(QueueCommand::Shutdown);
        if self.handle.join().is_err() {
            tracing::error!("notes queue thread panicked");
        }
    }
}

fn run_queue(ctx: &ExportContext, feed: &dyn ChangeSource, rx: Receiver<QueueCommand>) {
    while let Ok(cmd) = rx.recv() {
        match cmd {
            QueueCommand::Update(event) => run_logged(ctx, feed, &event),
            QueueCommand::Shutdown => break,
        }
    }
}

fn run_logged(ctx: &ExportContext, feed: &dyn ChangeSource, event: &RefUpdatedEvent) {
    match create_review_notes(ctx, feed, event) {
        Ok(outcome) => {
            if let Some(commit) = outcome.commit() {
                tracing::info!(project = %event.project, commit = %commit, "review notes updated");
            }
        }
        Err(err) => {
            tracing::error!(project = %event.project, error = %err, "cannot create review notes");
        }
    }
}
