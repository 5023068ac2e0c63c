use crate::scheduler::Work;
use crate::scheduler::context::{WorkerContext, enter_worker};
use crate::scheduler::work_stealing::injector::InjectorHandle;
use crate::scheduler::work_stealing::queue::LocalQueue;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A worker thread of a parallel scheduler.
///
/// The execution order is:
/// 1. Pop from the local queue
/// 2. Steal from the global injector
/// 3. Steal from other workers
/// 4. Park if no work is available
pub(crate) struct Worker {
    pool: usize,
    id: usize,

    /// All local queues (one per worker), used for stealing.
    locals: Arc<Vec<Arc<LocalQueue>>>,

    injector: InjectorHandle,
}

impl Worker {
    pub(crate) fn new(
        pool: usize,
        id: usize,
        locals: Arc<Vec<Arc<LocalQueue>>>,
        injector: InjectorHandle,
    ) -> Self {
        Self {
            pool,
            id,
            locals,
            injector,
        }
    }

    /// Runs the worker loop until `shutdown` is raised.
    ///
    /// A panicking work item is logged and does not take the worker down.
    pub(crate) fn run(&self, shutdown: Arc<AtomicBool>) {
        let context = WorkerContext {
            pool: self.pool,
            worker: self.id,
            locals: self.locals.clone(),
        };

        enter_worker(context, || {
            tracing::trace!(pool = self.pool, worker = self.id, "worker started");

            loop {
                if shutdown.load(Ordering::Acquire) {
                    break;
                }

                let work = self.locals[self.id]
                    .pop()
                    .or_else(|| self.injector.steal())
                    .or_else(|| self.try_steal());

                match work {
                    Some(work) => self.execute(work),
                    None => self.injector.park(),
                }
            }

            tracing::trace!(pool = self.pool, worker = self.id, "worker stopped");
        });
    }

    fn execute(&self, work: Work) {
        if panic::catch_unwind(AssertUnwindSafe(work)).is_err() {
            tracing::error!(pool = self.pool, worker = self.id, "scheduled work panicked");
        }
    }

    /// Steals from the other workers' local queues in round-robin order,
    /// starting with the next worker.
    fn try_steal(&self) -> Option<Work> {
        let len = self.locals.len();

        if len <= 1 {
            return None;
        }

        (1..len)
            .map(|offset| (self.id + offset) % len)
            .find_map(|victim| self.locals[victim].steal())
    }
}
