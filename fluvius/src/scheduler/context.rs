use crate::scheduler::work_stealing::queue::LocalQueue;

use std::cell::RefCell;
use std::sync::Arc;

/// Identity of the worker running on the current thread.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    /// Identifier of the pool the worker belongs to.
    pub(crate) pool: usize,

    /// Index of the worker inside its pool.
    pub(crate) worker: usize,

    /// Local queues of every worker of the pool.
    pub(crate) locals: Arc<Vec<Arc<LocalQueue>>>,
}

thread_local! {
    /// Worker context of the current thread, if it is a pool worker.
    ///
    /// Set once when a worker thread starts, so work scheduled from a worker
    /// can go to its local queue instead of the global injector.
    static CURRENT_WORKER: RefCell<Option<WorkerContext>> = const { RefCell::new(None) };
}

/// Installs `context` for the current thread for the duration of `f`.
pub(crate) fn enter_worker<R>(context: WorkerContext, f: impl FnOnce() -> R) -> R {
    CURRENT_WORKER.with(|cell| {
        let previous = cell.replace(Some(context));
        let out = f();
        cell.replace(previous);
        out
    })
}

/// Returns the current worker context if it belongs to `pool`.
pub(crate) fn current_worker(pool: usize) -> Option<WorkerContext> {
    CURRENT_WORKER.with(|cell| {
        cell.borrow()
            .as_ref()
            .filter(|context| context.pool == pool)
            .cloned()
    })
}
