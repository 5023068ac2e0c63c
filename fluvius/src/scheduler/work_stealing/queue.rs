use crate::scheduler::Work;

use parking_lot::Mutex;
use std::collections::VecDeque;

/// Number of items a local queue holds before new work spills over to the
/// injector.
pub(crate) const LOCAL_CAPACITY: usize = 256;

/// A per-worker local work queue.
///
/// The owning worker pushes and pops at the back (LIFO), other workers
/// steal from the front (FIFO).
pub(crate) struct LocalQueue {
    inner: Mutex<VecDeque<Work>>,
}

impl LocalQueue {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(LOCAL_CAPACITY)),
        }
    }

    /// Queues `work`, handing it back if the queue is full.
    pub(crate) fn push(&self, work: Work) -> Result<(), Work> {
        let mut inner = self.inner.lock();

        if inner.len() >= LOCAL_CAPACITY {
            return Err(work);
        }

        inner.push_back(work);
        Ok(())
    }

    pub(crate) fn pop(&self) -> Option<Work> {
        self.inner.lock().pop_back()
    }

    /// Removes the oldest item; used by other workers.
    pub(crate) fn steal(&self) -> Option<Work> {
        self.inner.lock().pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record(log: &Arc<AtomicUsize>, value: usize) -> Work {
        let log = log.clone();
        Box::new(move || log.store(value, Ordering::SeqCst))
    }

    #[test]
    fn owner_pops_newest_thief_steals_oldest() {
        let queue = LocalQueue::new();
        let log = Arc::new(AtomicUsize::new(0));

        for value in 1..=3 {
            assert!(queue.push(record(&log, value)).is_ok());
        }

        if let Some(work) = queue.pop() {
            work();
        }
        assert_eq!(log.load(Ordering::SeqCst), 3);

        if let Some(work) = queue.steal() {
            work();
        }
        assert_eq!(log.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn full_queue_hands_work_back() {
        let queue = LocalQueue::new();

        for _ in 0..LOCAL_CAPACITY {
            assert!(queue.push(Box::new(|| {})).is_ok());
        }

        assert!(queue.push(Box::new(|| {})).is_err());
    }
}
