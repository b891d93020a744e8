//! Bounded worker pool for per-file tasks.
//!
//! A dedicated `rayon` pool with exactly `N` threads. [`WorkerPool::scope`]
//! runs the submitting closure (the directory walk) on the calling thread
//! while submitted tasks run on the pool, and returns only after every task
//! has finished. Each task's result travels back over a channel, so results
//! are collected exactly once and no task can observe another's output.
//!
//! A task that panics loses its result but not its siblings': the panic is
//! caught on the worker and reported as a count in [`ScopeOutput::panicked`].

use crate::error::SyncError;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;

pub struct WorkerPool {
    pool: rayon::ThreadPool,
    workers: usize,
}

/// What a [`WorkerPool::scope`] produced.
#[derive(Debug)]
pub struct ScopeOutput<R, T> {
    /// Return value of the submitting closure.
    pub value: R,
    /// One entry per task that completed, in completion order.
    pub results: Vec<T>,
    pub submitted: usize,
    pub panicked: usize,
}

/// Handle for submitting tasks inside a [`WorkerPool::scope`].
pub struct TaskGroup<'a, 'scope, T> {
    scope: &'a rayon::Scope<'scope>,
    tx: mpsc::Sender<T>,
    submitted: Cell<usize>,
}

impl WorkerPool {
    /// Build a pool of exactly `workers` threads (at least one).
    pub fn new(workers: usize) -> Result<Self, SyncError> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("photosync-worker-{i}"))
            .build()
            .map_err(|e| SyncError::Pool(e.to_string()))?;
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `submit` on this thread, then wait for every task it submitted.
    pub fn scope<'scope, T, R, F>(&self, submit: F) -> ScopeOutput<R, T>
    where
        T: Send + 'scope,
        F: FnOnce(&TaskGroup<'_, 'scope, T>) -> R,
    {
        let (tx, rx) = mpsc::channel();
        let (value, submitted) = self.pool.in_place_scope(|scope| {
            let group = TaskGroup {
                scope,
                tx,
                submitted: Cell::new(0),
            };
            let value = submit(&group);
            (value, group.submitted.get())
        });

        // Every sender has been dropped once the scope has joined
        let results: Vec<T> = rx.try_iter().collect();
        let panicked = submitted.saturating_sub(results.len());
        ScopeOutput {
            value,
            results,
            submitted,
            panicked,
        }
    }
}

impl<'scope, T: Send + 'scope> TaskGroup<'_, 'scope, T> {
    /// Queue `task` on the pool. Blocks nothing; returns immediately.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() -> T + Send + 'scope,
    {
        let tx = self.tx.clone();
        self.submitted.set(self.submitted.get() + 1);
        self.scope.spawn(move |_| {
            if let Ok(result) = panic::catch_unwind(AssertUnwindSafe(task)) {
                // Receiver outlives the scope, send cannot fail
                let _ = tx.send(result);
            }
        });
    }

    pub fn submitted(&self) -> usize {
        self.submitted.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn zero_workers_means_one() {
        assert_eq!(WorkerPool::new(0).unwrap().workers(), 1);
    }

    #[test]
    fn never_exceeds_worker_count() {
        let pool = WorkerPool::new(3).unwrap();
        let running = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        let out = pool.scope(|group| {
            for i in 0..24 {
                let running = &running;
                let peak = &peak;
                group.submit(move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(5));
                    running.fetch_sub(1, Ordering::SeqCst);
                    i
                });
            }
        });

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
        assert_eq!(out.submitted, 24);
        let mut results = out.results;
        results.sort();
        assert_eq!(results, (0..24).collect::<Vec<_>>());
    }

    #[test]
    fn every_task_error_collected_once() {
        let pool = WorkerPool::new(2).unwrap();
        let out = pool.scope(|group| {
            for i in 0..10 {
                group.submit(move || {
                    if i % 3 == 0 {
                        vec![SyncError::Pool(format!("task {i}"))]
                    } else {
                        Vec::new()
                    }
                });
            }
            group.submitted()
        });

        assert_eq!(out.value, 10);
        let errors: Vec<String> = out.results.into_iter().flatten().map(|e| e.to_string()).collect();
        assert_eq!(errors.len(), 4);
        for i in [0, 3, 6, 9] {
            assert_eq!(
                errors.iter().filter(|e| e.ends_with(&format!("task {i}"))).count(),
                1
            );
        }
    }

    #[test]
    fn panicking_task_does_not_stop_siblings() {
        let pool = WorkerPool::new(2).unwrap();
        let out = pool.scope(|group| {
            group.submit(|| -> u32 { panic!("boom") });
            group.submit(|| 7);
        });
        assert_eq!(out.results, vec![7]);
        assert_eq!(out.panicked, 1);
    }

    #[test]
    fn scope_returns_after_all_tasks_finish() {
        let pool = WorkerPool::new(4).unwrap();
        let done = AtomicUsize::new(0);
        pool.scope(|group| {
            for _ in 0..8 {
                let done = &done;
                group.submit(move || {
                    std::thread::sleep(Duration::from_millis(2));
                    done.fetch_add(1, Ordering::SeqCst);
                });
            }
        });
        assert_eq!(done.load(Ordering::SeqCst), 8);
    }
}
