use crate::scheduler::Work;

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Shared handle to the global injector.
pub(crate) type InjectorHandle = Arc<Injector>;

/// Upper bound on how long an idle worker sleeps before re-checking the
/// local queues of its siblings.
const PARK_TIMEOUT: Duration = Duration::from_millis(1);

/// Global work queue of a parallel scheduler.
///
/// Work submitted from outside the pool lands here before a worker picks
/// it up. The injector also parks idle workers and wakes them on push.
pub(crate) struct Injector {
    queue: Mutex<VecDeque<Work>>,

    /// Wakes parked workers.
    condvar: Condvar,

    shutdown: AtomicBool,
}

impl Injector {
    pub(crate) fn new() -> Self {
        Injector {
            queue: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Signals shutdown and wakes all parked workers.
    ///
    /// Work still queued is dropped.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.queue.lock().clear();
        self.condvar.notify_all();
    }

    pub(crate) fn push(&self, work: Work) {
        self.queue.lock().push_back(work);
        self.condvar.notify_one();
    }

    /// Parks the calling worker until work arrives, shutdown is signalled,
    /// or the park timeout expires.
    pub(crate) fn park(&self) {
        let mut queue = self.queue.lock();

        if self.shutdown.load(Ordering::Acquire) || !queue.is_empty() {
            return;
        }

        let _ = self.condvar.wait_for(&mut queue, PARK_TIMEOUT);
    }

    pub(crate) fn steal(&self) -> Option<Work> {
        self.queue.lock().pop_front()
    }
}
