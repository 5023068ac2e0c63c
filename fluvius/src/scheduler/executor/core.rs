use crate::error::FluxError;
use crate::scheduler::context::current_worker;
use crate::scheduler::executor::worker::Worker;
use crate::scheduler::work_stealing::injector::Injector;
use crate::scheduler::work_stealing::queue::LocalQueue;
use crate::scheduler::{Scheduler, Work};

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

/// Source of pool identifiers, so a worker can tell its own pool apart.
static NEXT_POOL_ID: AtomicUsize = AtomicUsize::new(0);

/// Bounded pool of worker threads with work stealing.
///
/// The `ParallelScheduler` is responsible for:
/// - spawning a fixed number of worker threads,
/// - distributing work through a global injector and per-worker queues,
/// - shutting the workers down and joining them.
///
/// Work scheduled from one of the pool's own workers goes to that worker's
/// local queue while it has room; everything else goes to the injector.
///
/// Build one with [`SchedulerBuilder`](crate::scheduler::SchedulerBuilder).
pub struct ParallelScheduler {
    name: String,
    pool: usize,

    /// Global injector queue shared by all workers.
    injector: Arc<Injector>,

    handles: Mutex<Vec<JoinHandle<()>>>,

    /// Shutdown flag shared with all workers.
    shutdown: Arc<AtomicBool>,

    worker_threads: usize,
}

impl ParallelScheduler {
    /// Spawns `threads` workers named `{name}-{index}`.
    pub(crate) fn new(name: String, threads: usize) -> Self {
        let pool = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        let injector = Arc::new(Injector::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let locals: Arc<Vec<Arc<LocalQueue>>> =
            Arc::new((0..threads).map(|_| Arc::new(LocalQueue::new())).collect());

        let mut handles = Vec::with_capacity(threads);

        for id in 0..threads {
            let worker = Worker::new(pool, id, locals.clone(), injector.clone());
            let shutdown = shutdown.clone();

            let spawned = thread::Builder::new()
                .name(format!("{name}-{id}"))
                .spawn(move || worker.run(shutdown));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(error) => tracing::error!(%error, scheduler = %name, "failed to spawn worker"),
            }
        }

        tracing::debug!(scheduler = %name, workers = handles.len(), "parallel scheduler started");

        Self {
            name,
            pool,
            injector,
            handles: Mutex::new(handles),
            shutdown,
            worker_threads: threads,
        }
    }

    /// Number of worker threads the scheduler was built with.
    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    /// Stops accepting work and signals all workers to exit.
    ///
    /// Work still queued is dropped. Idempotent.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        self.injector.shutdown();
        tracing::debug!(scheduler = %self.name, "parallel scheduler shutting down");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

impl Scheduler for ParallelScheduler {
    fn name(&self) -> &str {
        &self.name
    }

    fn schedule(&self, work: Work) -> Result<(), FluxError> {
        if self.is_shutdown() {
            return Err(FluxError::SchedulerShutdown(self.name.clone()));
        }

        let overflow = match current_worker(self.pool) {
            Some(context) => context.locals[context.worker].push(work).err(),
            None => Some(work),
        };

        if let Some(work) = overflow {
            self.injector.push(work);
        }

        Ok(())
    }

    fn is_current(&self) -> bool {
        current_worker(self.pool).is_some()
    }
}

impl Drop for ParallelScheduler {
    /// Shuts the pool down and joins every worker.
    ///
    /// A worker dropping the last handle to its own pool is not joined.
    fn drop(&mut self) {
        self.shutdown();

        let current = thread::current().id();

        for handle in self.handles.lock().drain(..) {
            if handle.thread().id() != current {
                let _ = handle.join();
            }
        }
    }
}
