use super::{TimerHandle, TimerTask};

use std::cmp::Ordering;
use std::time::Duration;

/// An entry in a clock's timer queue.
///
/// `TimerEntry` is stored inside a `BinaryHeap` ordered by deadline, with
/// the insertion sequence breaking ties so equal deadlines fire in FIFO
/// order.
pub(crate) struct TimerEntry {
    /// Offset from the clock origin at which the entry fires.
    pub(crate) deadline: Duration,

    /// Insertion order.
    pub(crate) sequence: u64,

    pub(crate) task: TimerTask,

    /// Cancellation flag shared with the owner of the timer.
    pub(crate) handle: TimerHandle,
}

impl TimerEntry {
    /// Runs the task unless the timer was cancelled meanwhile.
    pub(crate) fn fire(self) {
        if self.handle.is_cancelled() {
            return;
        }

        (self.task)();
    }
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.sequence == other.sequence
    }
}

impl Ord for TimerEntry {
    /// Orders entries by deadline, then sequence.
    ///
    /// Note that the comparison is **reversed** so that a
    /// `BinaryHeap<TimerEntry>` behaves as a min-heap.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
