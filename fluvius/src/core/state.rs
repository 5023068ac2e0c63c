use std::sync::atomic::{AtomicUsize, Ordering};

/// No subscriber is attached yet.
pub(crate) const UNSUBSCRIBED: usize = 0;

/// A subscriber is attached and may receive elements.
pub(crate) const ACTIVE: usize = 1;

/// The sequence completed.
///
/// Absorbing: no signal follows.
pub(crate) const COMPLETED: usize = 2;

/// The sequence failed.
///
/// Absorbing: no signal follows.
pub(crate) const ERRORED: usize = 3;

/// The subscriber cancelled.
///
/// Absorbing: no signal follows.
pub(crate) const CANCELLED: usize = 4;

/// Lifecycle of one stage subscription.
///
/// Transitions into a terminal state are compare-and-swap operations, so
/// exactly one caller wins the right to deliver the terminal signal.
pub(crate) struct Lifecycle {
    state: AtomicUsize,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicUsize::new(UNSUBSCRIBED),
        }
    }

    /// Moves `UNSUBSCRIBED` to `ACTIVE`. Returns `false` if already past it.
    pub(crate) fn activate(&self) -> bool {
        self.state
            .compare_exchange(UNSUBSCRIBED, ACTIVE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Moves to `COMPLETED`; `true` if the caller must signal completion.
    pub(crate) fn complete(&self) -> bool {
        self.terminate(COMPLETED)
    }

    /// Moves to `ERRORED`; `true` if the caller must signal the error.
    pub(crate) fn error(&self) -> bool {
        self.terminate(ERRORED)
    }

    /// Moves to `CANCELLED`; `true` on the first cancellation only.
    pub(crate) fn cancel(&self) -> bool {
        self.terminate(CANCELLED)
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.state.load(Ordering::Acquire) >= COMPLETED
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == CANCELLED
    }

    fn terminate(&self, target: usize) -> bool {
        loop {
            let current = self.state.load(Ordering::Acquire);

            if current >= COMPLETED {
                return false;
            }

            if self
                .state
                .compare_exchange(current, target, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }
    }
}
