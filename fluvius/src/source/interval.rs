use crate::core::demand::{Demand, Wip};
use crate::core::state::Lifecycle;
use crate::core::{Publisher, Subscriber, Subscription, reject};
use crate::error::FluxError;
use crate::time::{Clock, TimerHandle, schedule_periodic};

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Source emitting `0, 1, 2, ...`, one value per period.
pub(crate) struct IntervalSource {
    delay: Duration,
    period: Duration,
    clock: Arc<dyn Clock>,
}

impl IntervalSource {
    pub(crate) fn new(delay: Duration, period: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            delay,
            period,
            clock,
        }
    }
}

impl Publisher<u64> for IntervalSource {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<u64>>) {
        if self.period.is_zero() {
            reject(
                subscriber,
                FluxError::InvalidArgument("interval period must be positive".to_owned()),
            );
            return;
        }

        let subscription = Arc::new(IntervalSubscription {
            downstream: subscriber.clone(),
            demand: Demand::new(),
            wip: Wip::new(),
            lifecycle: Lifecycle::new(),
            ticks: AtomicU64::new(0),
            next: AtomicU64::new(0),
            timer: Mutex::new(None),
            invalid_request: AtomicBool::new(false),
        });

        subscription.lifecycle.activate();
        subscriber.on_subscribe(subscription.clone());

        let weak: Weak<IntervalSubscription> = Arc::downgrade(&subscription);
        let handle = schedule_periodic(
            self.clock.clone(),
            self.delay,
            self.period,
            Arc::new(move || {
                if let Some(subscription) = weak.upgrade() {
                    subscription.tick();
                }
            }),
        );

        *subscription.timer.lock() = Some(handle.clone());

        if subscription.lifecycle.is_terminated() {
            handle.cancel();
        }
    }
}

struct IntervalSubscription {
    downstream: Arc<dyn Subscriber<u64>>,
    demand: Demand,
    wip: Wip,
    lifecycle: Lifecycle,
    /// Ticks fired so far.
    ticks: AtomicU64,
    /// Next value to emit; only the drainer touches it.
    next: AtomicU64,
    timer: Mutex<Option<TimerHandle>>,
    invalid_request: AtomicBool,
}

impl IntervalSubscription {
    fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::AcqRel);
        self.drain();
    }

    fn drain(&self) {
        if !self.wip.enter() {
            return;
        }

        let mut missed = 1;

        loop {
            if self.lifecycle.is_terminated() {
                return;
            }

            if self.invalid_request.load(Ordering::Acquire) {
                if self.lifecycle.error() {
                    self.stop_timer();
                    self.downstream.on_error(FluxError::InvalidDemand(0));
                }
                return;
            }

            let requested = self.demand.get();
            let ticks = self.ticks.load(Ordering::Acquire);
            let mut next = self.next.load(Ordering::Relaxed);
            let mut emitted = 0u64;

            while emitted < requested && next < ticks {
                if self.lifecycle.is_terminated() {
                    return;
                }

                self.downstream.on_next(next);
                next += 1;
                emitted += 1;
            }

            self.next.store(next, Ordering::Relaxed);

            if emitted > 0 {
                self.demand.produced(emitted);
            }

            missed = self.wip.leave(missed);

            if missed == 0 {
                break;
            }
        }
    }

    fn stop_timer(&self) {
        if let Some(handle) = self.timer.lock().take() {
            handle.cancel();
        }
    }
}

impl Subscription for IntervalSubscription {
    fn request(&self, n: u64) {
        if n == 0 {
            self.invalid_request.store(true, Ordering::Release);
        } else {
            self.demand.add(n);
        }

        self.drain();
    }

    fn cancel(&self) {
        if self.lifecycle.cancel() {
            tracing::trace!("interval cancelled");
        }

        self.stop_timer();
    }
}
