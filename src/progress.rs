//! Progress accounting shared by export workers.
//!
//! Workers only touch atomic counters; the thread waiting for them is the one
//! that renders, so reporting never blocks on the terminal.

use std::io::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const REFRESH_INTERVAL: Duration = Duration::from_millis(500);

/// Receives progress deltas. Negative deltas retract earlier credit.
pub trait Progress: Send + Sync {
    fn update(&self, delta: i64);
}

/// Discards all progress.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn update(&self, _delta: i64) {}
}

/// Thread-safe task progress with a text display.
pub struct ProgressMonitor {
    title: Mutex<String>,
    total: AtomicU64,
    completed: AtomicI64,
    workers: Mutex<usize>,
    workers_done: Condvar,
    out: Mutex<Box<dyn Write + Send>>,
    last_shown: Mutex<Option<i64>>,
}

impl ProgressMonitor {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            title: Mutex::new(String::new()),
            total: AtomicU64::new(0),
            completed: AtomicI64::new(0),
            workers: Mutex::new(0),
            workers_done: Condvar::new(),
            out: Mutex::new(out),
            last_shown: Mutex::new(None),
        }
    }

    pub fn begin(&self, title: &str, total: u64) {
        *lock(&self.title) = title.to_string();
        self.total.store(total, Ordering::SeqCst);
        self.completed.store(0, Ordering::SeqCst);
        *lock(&self.last_shown) = None;
        self.render(false);
    }

    /// Register `count` workers that will each call [`Self::end_worker`].
    pub fn start_workers(&self, count: usize) {
        *lock(&self.workers) += count;
    }

    pub fn end_worker(&self) {
        let mut workers = lock(&self.workers);
        *workers = workers.saturating_sub(1);
        if *workers == 0 {
            self.workers_done.notify_all();
        }
    }

    /// Block until every registered worker has ended, refreshing the display.
    pub fn wait_for_completion(&self) {
        let mut workers = lock(&self.workers);
        while *workers > 0 {
            let (guard, _) = self
                .workers_done
                .wait_timeout(workers, REFRESH_INTERVAL)
                .unwrap_or_else(PoisonError::into_inner);
            workers = guard;
            self.render(false);
        }
    }

    /// Final display line.
    pub fn end(&self) {
        self.render(true);
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> i64 {
        self.completed.load(Ordering::SeqCst)
    }

    fn render(&self, done: bool) {
        let completed = self.completed();
        {
            let mut last = lock(&self.last_shown);
            if !done && *last == Some(completed) {
                return;
            }
            *last = Some(completed);
        }

        let line = render_line(&lock(&self.title), completed, self.total(), done);
        let mut out = lock(&self.out);
        // Display is best effort.
        let _ = out.write_all(line.as_bytes());
        let _ = out.flush();
    }
}

impl Progress for ProgressMonitor {
    fn update(&self, delta: i64) {
        self.completed.fetch_add(delta, Ordering::SeqCst);
    }
}

fn render_line(title: &str, completed: i64, total: u64, done: bool) -> String {
    let shown = completed.max(0);
    let mut line = if total == 0 {
        format!("\r{title}: {shown}")
    } else {
        let pct = (shown as u64).saturating_mul(100) / total;
        let width = total.to_string().len();
        format!("\r{title}: {pct:>3}% ({shown:>width$}/{total})")
    };
    if done {
        line.push_str(", done\n");
    }
    line
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
