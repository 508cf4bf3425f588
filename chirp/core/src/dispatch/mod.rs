//! Task Dispatcher
//!
//! A fixed pool of OS threads draining one shared FIFO queue.
//!
//! # Design
//!
//! ```text
//!   submit(job) ──push_back──▶ ┌──────────────────────┐
//!   submit(job) ──push_back──▶ │ Mutex<VecDeque<Job>> │ ──pop_front──▶ worker[0]
//!                              │  + Condvar "ticket"  │ ──pop_front──▶ worker[1]
//!                              └──────────────────────┘
//! ```
//!
//! - `submit` never blocks on capacity; the queue is unbounded.
//! - Jobs leave the queue in submission order. With more than one worker
//!   their completion order is unspecified.
//! - A panicking job is caught and logged; its worker keeps running.
//! - `shutdown` wakes every idle worker. Busy workers finish their current job
//!   and then exit. Jobs still queued are dropped.
//! - There is no process-exit hook. The embedding application calls
//!   [`Dispatcher::shutdown`], or dropping the dispatcher does it.
//!
//! A job that hangs blocks its worker forever; shutdown does not interrupt
//! running jobs.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use crate::config::DispatcherConfig;

/// A unit of work run on a worker thread
pub type Job = Box<dyn FnOnce() + Send + 'static>;

// =============================================================================
// Errors
// =============================================================================

/// Dispatcher lifecycle failures
#[derive(Debug, Error)]
pub enum DispatchError {
    /// `shutdown` was called a second time
    #[error("Already shut down")]
    AlreadyShutdown,

    /// A job was submitted after shutdown
    #[error("Dispatcher is shut down")]
    ShutDown,

    /// The pool was asked for zero workers
    #[error("Dispatcher needs at least one worker thread")]
    NoWorkers,

    /// The OS refused to create a worker thread
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

// =============================================================================
// Shared Queue
// =============================================================================

struct QueueState {
    jobs: VecDeque<Job>,
    active: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    ticket: Condvar,
}

impl Shared {
    /// Block until a job is available; `None` once the dispatcher is shut down
    fn poll(&self) -> Option<Job> {
        let mut state = self.state.lock();
        loop {
            if !state.active {
                return None;
            }
            if let Some(job) = state.jobs.pop_front() {
                return Some(job);
            }
            self.ticket.wait(&mut state);
        }
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Worker pool with a FIFO queue
pub struct Dispatcher {
    name: String,
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

impl Dispatcher {
    /// Start `num_threads` workers named `"{name}[{index}]"`
    ///
    /// # Errors
    ///
    /// [`DispatchError::NoWorkers`] for a zero count, [`DispatchError::Spawn`]
    /// if a thread cannot be created (already started workers are stopped).
    pub fn new(name: impl Into<String>, num_threads: usize) -> Result<Self, DispatchError> {
        if num_threads == 0 {
            return Err(DispatchError::NoWorkers);
        }

        let name = name.into();
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                active: true,
            }),
            ticket: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(num_threads);
        for index in 0..num_threads {
            let worker_shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("{name}[{index}]"))
                .spawn(move || worker_loop(&worker_shared));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    shared.state.lock().active = false;
                    shared.ticket.notify_all();
                    return Err(DispatchError::Spawn(e));
                }
            }
        }

        tracing::info!(dispatcher = %name, workers = num_threads, "Dispatcher started");

        Ok(Self {
            name,
            shared,
            workers: Mutex::new(workers),
            worker_count: num_threads,
        })
    }

    /// Start a pool sized from configuration
    ///
    /// # Errors
    ///
    /// Same as [`Dispatcher::new`].
    pub fn from_config(config: &DispatcherConfig) -> Result<Self, DispatchError> {
        Self::new(config.name.clone(), config.num_threads)
    }

    /// Queue a job; returns immediately
    ///
    /// # Errors
    ///
    /// [`DispatchError::ShutDown`] after [`Dispatcher::shutdown`].
    pub fn submit<F>(&self, job: F) -> Result<(), DispatchError>
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut state = self.shared.state.lock();
            if !state.active {
                return Err(DispatchError::ShutDown);
            }
            state.jobs.push_back(Box::new(job));
        }
        self.shared.ticket.notify_one();
        Ok(())
    }

    /// Stop all workers after their current job
    ///
    /// # Errors
    ///
    /// [`DispatchError::AlreadyShutdown`] on the second call.
    pub fn shutdown(&self) -> Result<(), DispatchError> {
        let discarded = {
            let mut state = self.shared.state.lock();
            if !state.active {
                return Err(DispatchError::AlreadyShutdown);
            }
            state.active = false;
            std::mem::take(&mut state.jobs)
        };
        self.shared.ticket.notify_all();

        // Jobs are dropped outside the lock.
        let discarded = discarded.len();

        tracing::info!(dispatcher = %self.name, discarded, "Dispatcher shut down");
        Ok(())
    }

    /// Wait for every worker to exit
    ///
    /// Only returns after [`Dispatcher::shutdown`] and once running jobs have
    /// finished. A worker joining its own pool skips itself.
    pub fn join(&self) {
        let handles: Vec<_> = self.workers.lock().drain(..).collect();
        let current = thread::current().id();
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                tracing::error!(dispatcher = %self.name, "Worker thread terminated abnormally");
            }
        }
    }

    /// Jobs waiting in the queue
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.state.lock().jobs.len()
    }

    /// Whether jobs are still accepted
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.shared.state.lock().active
    }

    /// Size of the pool
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Thread name prefix
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if self.is_active() {
            let _ = self.shutdown();
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.name)
            .field("workers", &self.worker_count)
            .field("active", &self.is_active())
            .field("pending", &self.pending())
            .finish()
    }
}

fn worker_loop(shared: &Shared) {
    while let Some(job) = shared.poll() {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            tracing::error!(
                worker = thread::current().name().unwrap_or("unnamed"),
                panic = %panic_message(payload.as_ref()),
                "Task panicked, worker continues"
            );
        }
    }
    tracing::debug!(
        worker = thread::current().name().unwrap_or("unnamed"),
        "Worker exiting"
    );
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_single_worker_runs_in_submission_order() {
        let dispatcher = Dispatcher::new("fifo", 1).unwrap();
        let (tx, rx) = mpsc::channel();

        for i in 0..50 {
            let tx = tx.clone();
            dispatcher.submit(move || tx.send(i).unwrap()).unwrap();
        }

        let order: Vec<i32> = (0..50).map(|_| rx.recv_timeout(WAIT).unwrap()).collect();
        assert_eq!(order, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_panicking_job_does_not_kill_worker() {
        let dispatcher = Dispatcher::new("panics", 1).unwrap();
        let (tx, rx) = mpsc::channel();

        dispatcher.submit(|| panic!("boom")).unwrap();
        dispatcher.submit(move || tx.send("after").unwrap()).unwrap();

        assert_eq!(rx.recv_timeout(WAIT).unwrap(), "after");
    }

    #[test]
    fn test_second_shutdown_is_reported() {
        let dispatcher = Dispatcher::new("twice", 2).unwrap();
        assert!(dispatcher.shutdown().is_ok());
        assert!(matches!(
            dispatcher.shutdown(),
            Err(DispatchError::AlreadyShutdown)
        ));
        assert!(!dispatcher.is_active());
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let dispatcher = Dispatcher::new("closed", 1).unwrap();
        dispatcher.shutdown().unwrap();
        assert!(matches!(
            dispatcher.submit(|| {}),
            Err(DispatchError::ShutDown)
        ));
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(
            Dispatcher::new("empty", 0),
            Err(DispatchError::NoWorkers)
        ));
    }

    #[test]
    fn test_workers_are_named() {
        let dispatcher = Dispatcher::new("named", 1).unwrap();
        let (tx, rx) = mpsc::channel();
        dispatcher
            .submit(move || {
                tx.send(thread::current().name().map(str::to_string))
                    .unwrap();
            })
            .unwrap();

        assert_eq!(rx.recv_timeout(WAIT).unwrap().as_deref(), Some("named[0]"));
    }

    #[test]
    fn test_all_workers_take_jobs() {
        let dispatcher = Dispatcher::new("pool", 3).unwrap();
        assert_eq!(dispatcher.worker_count(), 3);

        // Three jobs that each wait for the others can only finish when all
        // three workers run concurrently.
        let barrier = Arc::new(std::sync::Barrier::new(3));
        let (tx, rx) = mpsc::channel();
        for _ in 0..3 {
            let barrier = Arc::clone(&barrier);
            let tx = tx.clone();
            dispatcher
                .submit(move || {
                    barrier.wait();
                    tx.send(()).unwrap();
                })
                .unwrap();
        }
        for _ in 0..3 {
            rx.recv_timeout(WAIT).unwrap();
        }
    }

    #[test]
    fn test_shutdown_discards_queued_jobs_and_join_returns() {
        let dispatcher = Dispatcher::new("discard", 1).unwrap();
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (ran_tx, ran_rx) = mpsc::channel::<()>();

        dispatcher
            .submit(move || {
                started_tx.send(()).unwrap();
                let _ = release_rx.recv();
            })
            .unwrap();
        started_rx.recv_timeout(WAIT).unwrap();

        dispatcher.submit(move || ran_tx.send(()).unwrap()).unwrap();
        assert_eq!(dispatcher.pending(), 1);

        dispatcher.shutdown().unwrap();
        assert_eq!(dispatcher.pending(), 0);
        release_tx.send(()).unwrap();
        dispatcher.join();

        assert!(ran_rx.try_recv().is_err());
    }

    #[test]
    fn test_drop_shuts_down() {
        let dispatcher = Dispatcher::new("dropped", 1).unwrap();
        let shared = Arc::clone(&dispatcher.shared);
        drop(dispatcher);
        assert!(!shared.state.lock().active);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
