//! Per-project work distribution.
//!
//! All buckets are enqueued up front on a closed channel. Each claim removes
//! one whole bucket, so a project's changes are never split across workers
//! and no change is handed out twice.

use std::collections::BTreeMap;

use crossbeam::channel::{self, Receiver};

use crate::core::{Change, ProjectName};

/// Every merged change of one project; the unit a worker claims.
#[derive(Clone, Debug)]
pub struct WorkItem {
    pub project: ProjectName,
    pub changes: Vec<Change>,
}

/// Hands out [`WorkItem`]s to any number of workers.
#[derive(Clone, Debug)]
pub struct Scheduler {
    rx: Receiver<WorkItem>,
    total_changes: usize,
}

impl Scheduler {
    pub fn new(changes: impl IntoIterator<Item = Change>) -> Self {
        let buckets = partition_by_project(changes);
        let total_changes = buckets.values().map(Vec::len).sum();

        let (tx, rx) = channel::unbounded();
        for (project, changes) in buckets {
            // `rx` is alive, so the send cannot fail.
            let _ = tx.send(WorkItem { project, changes });
        }
        drop(tx);

        Self { rx, total_changes }
    }

    /// Claim the next project bucket; `None` once every bucket is taken.
    pub fn claim_next(&self) -> Option<WorkItem> {
        self.rx.recv().ok()
    }

    /// Take every bucket no worker has claimed.
    pub fn drain_unclaimed(&self) -> Vec<WorkItem> {
        self.rx.try_iter().collect()
    }

    /// Buckets not yet claimed.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Merged changes across all buckets, claimed or not.
    pub fn total_changes(&self) -> usize {
        self.total_changes
    }
}

/// Group merged changes by project; other statuses are dropped.
pub fn partition_by_project(
    changes: impl IntoIterator<Item = Change>,
) -> BTreeMap<ProjectName, Vec<Change>> {
    let mut buckets: BTreeMap<ProjectName, Vec<Change>> = BTreeMap::new();
    for change in changes.into_iter().filter(Change::is_merged) {
        buckets.entry(change.project.clone()).or_default().push(change);
    }
    buckets
}
