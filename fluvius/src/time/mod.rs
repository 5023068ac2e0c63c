//! Clocks and timers.
//!
//! Timer-driven operators (`interval`, `delay_elements`, `skip_for`,
//! `take_for`) never sleep themselves; they hand callbacks to a [`Clock`].
//!
//! It includes:
//! - [`SystemClock`], backed by a dedicated timer thread,
//! - [`VirtualClock`], advanced by hand for deterministic tests,
//! - [`schedule_periodic`], the schedule-and-requeue loop behind periodic
//!   timers.

mod system;
mod timer;
mod virtual_clock;

#[doc(inline)]
pub use system::SystemClock;

#[doc(inline)]
pub use virtual_clock::VirtualClock;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Callback run by a clock once its delay elapsed.
pub type TimerTask = Box<dyn FnOnce() + Send>;

/// Source of time and one-shot timers.
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock was created.
    fn now(&self) -> Duration;

    /// Runs `task` once `delay` has elapsed, unless `handle` is cancelled
    /// first.
    fn schedule_with(&self, delay: Duration, handle: TimerHandle, task: TimerTask);

    /// Runs `task` once `delay` has elapsed.
    ///
    /// The returned handle cancels the timer.
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let handle = TimerHandle::new();
        self.schedule_with(delay, handle.clone(), task);
        handle
    }
}

/// Cancellation handle of a scheduled timer.
///
/// Clones share the same flag. Cancelling is idempotent and only prevents
/// callbacks that have not started yet.
#[derive(Debug, Clone, Default)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Runs `task` after `delay`, then once every `period`, until cancelled.
///
/// Each tick re-arms the next one. Deadlines are computed from the first
/// deadline rather than from the previous tick, so slow callbacks do not
/// accumulate drift.
pub fn schedule_periodic(
    clock: Arc<dyn Clock>,
    delay: Duration,
    period: Duration,
    task: Arc<dyn Fn() + Send + Sync>,
) -> TimerHandle {
    let handle = TimerHandle::new();
    let start = clock.now() + delay;

    arm(clock, handle.clone(), start, period, 0, task);

    handle
}

fn arm(
    clock: Arc<dyn Clock>,
    handle: TimerHandle,
    start: Duration,
    period: Duration,
    tick: u32,
    task: Arc<dyn Fn() + Send + Sync>,
) {
    let Some(offset) = period.checked_mul(tick) else {
        return;
    };

    let delay = (start + offset).saturating_sub(clock.now());
    let next_clock = clock.clone();
    let next_handle = handle.clone();

    clock.schedule_with(
        delay,
        handle,
        Box::new(move || {
            if next_handle.is_cancelled() {
                return;
            }

            task();

            if next_handle.is_cancelled() {
                return;
            }

            if let Some(next) = tick.checked_add(1) {
                arm(next_clock, next_handle, start, period, next, task);
            }
        }),
    );
}
