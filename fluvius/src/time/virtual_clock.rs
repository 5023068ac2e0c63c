use super::timer::TimerEntry;
use super::{Clock, TimerHandle, TimerTask};

use parking_lot::Mutex;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;

/// A clock that only moves when told to.
///
/// Timers fire on the thread calling [`advance_by`](Self::advance_by) or
/// [`advance_to`](Self::advance_to), in deadline order. Timers scheduled by
/// a firing callback run within the same advance if they fall due.
pub struct VirtualClock {
    inner: Mutex<VirtualState>,
}

struct VirtualState {
    now: Duration,
    sequence: u64,
    timers: BinaryHeap<TimerEntry>,
}

impl VirtualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(VirtualState {
                now: Duration::ZERO,
                sequence: 0,
                timers: BinaryHeap::new(),
            }),
        })
    }

    /// Moves time forward by `duration`, firing every timer that falls due.
    pub fn advance_by(&self, duration: Duration) {
        let target = self.now().saturating_add(duration);
        self.advance_to(target);
    }

    /// Moves time forward to `target`, firing every timer that falls due.
    ///
    /// Time never moves backwards; an earlier target only fires timers
    /// already due.
    pub fn advance_to(&self, target: Duration) {
        loop {
            let entry = {
                let mut state = self.inner.lock();

                let due = state
                    .timers
                    .peek()
                    .is_some_and(|entry| entry.deadline <= target);

                if !due {
                    state.now = state.now.max(target);
                    return;
                }

                let Some(entry) = state.timers.pop() else {
                    return;
                };

                state.now = state.now.max(entry.deadline);
                entry
            };

            entry.fire();
        }
    }

    /// Number of timers waiting to fire, cancelled ones included.
    pub fn pending(&self) -> usize {
        self.inner.lock().timers.len()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Duration {
        self.inner.lock().now
    }

    fn schedule_with(&self, delay: Duration, handle: TimerHandle, task: TimerTask) {
        let mut state = self.inner.lock();

        let deadline = state.now.saturating_add(delay);
        let sequence = state.sequence;
        state.sequence += 1;

        state.timers.push(TimerEntry {
            deadline,
            sequence,
            task,
            handle,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::schedule_periodic;

    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn timers_fire_in_deadline_order() {
        let clock = VirtualClock::new();
        let fired = Arc::new(StdMutex::new(Vec::new()));

        for (label, delay) in [("late", 30), ("early", 10), ("middle", 20)] {
            let fired = fired.clone();
            clock.schedule(
                Duration::from_millis(delay),
                Box::new(move || fired.lock().unwrap().push(label)),
            );
        }

        clock.advance_by(Duration::from_millis(25));
        assert_eq!(*fired.lock().unwrap(), vec!["early", "middle"]);

        clock.advance_by(Duration::from_millis(5));
        assert_eq!(*fired.lock().unwrap(), vec!["early", "middle", "late"]);
        assert_eq!(clock.now(), Duration::from_millis(30));
    }

    #[test]
    fn cancelled_timer_does_not_fire() {
        let clock = VirtualClock::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = fired.clone();
        let handle = clock.schedule(
            Duration::from_secs(1),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        handle.cancel();
        clock.advance_by(Duration::from_secs(2));

        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn periodic_timer_requeues_until_cancelled() {
        let clock = VirtualClock::new();
        let ticks = Arc::new(AtomicUsize::new(0));

        let counter = ticks.clone();
        let handle = schedule_periodic(
            clock.clone(),
            Duration::from_secs(1),
            Duration::from_secs(1),
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        clock.advance_by(Duration::from_millis(3_500));
        assert_eq!(ticks.load(Ordering::SeqCst), 3);

        handle.cancel();
        clock.advance_by(Duration::from_secs(10));
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }
}
