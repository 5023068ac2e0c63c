use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Demand value meaning "no limit".
///
/// Once a subscription reaches it, emission no longer decrements it.
pub const UNBOUNDED: u64 = u64::MAX;

/// Outstanding demand of one subscription.
///
/// Updates are lock-free; concurrent `add` calls never lose requests.
pub(crate) struct Demand {
    requested: AtomicU64,
}

impl Demand {
    pub(crate) fn new() -> Self {
        Self {
            requested: AtomicU64::new(0),
        }
    }

    /// Adds `n`, saturating at [`UNBOUNDED`]. Returns the previous value.
    pub(crate) fn add(&self, n: u64) -> u64 {
        let mut current = self.requested.load(Ordering::Acquire);

        loop {
            if current == UNBOUNDED {
                return current;
            }

            let next = current.saturating_add(n);

            match self.requested.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(previous) => return previous,
                Err(actual) => current = actual,
            }
        }
    }

    /// Records `n` emitted elements. Unbounded demand is left untouched.
    pub(crate) fn produced(&self, n: u64) {
        let mut current = self.requested.load(Ordering::Acquire);

        loop {
            if current == UNBOUNDED {
                return;
            }

            let next = current.saturating_sub(n);

            match self.requested.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    pub(crate) fn get(&self) -> u64 {
        self.requested.load(Ordering::Acquire)
    }
}

/// Work-in-progress counter guarding a drain loop.
///
/// The thread that raises the counter from zero owns the loop; every other
/// caller only records that more work is pending. The owner keeps looping
/// until [`leave`](Self::leave) reports no missed work.
pub(crate) struct Wip {
    counter: AtomicUsize,
}

impl Wip {
    pub(crate) fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
        }
    }

    /// Returns `true` if the caller now owns the drain loop.
    pub(crate) fn enter(&self) -> bool {
        self.counter.fetch_add(1, Ordering::AcqRel) == 0
    }

    /// Acknowledges `missed` rounds; returns the rounds still pending.
    pub(crate) fn leave(&self, missed: usize) -> usize {
        self.counter.fetch_sub(missed, Ordering::AcqRel) - missed
    }
}
