use super::{Source, StageLink};
use crate::core::serialized::SerializedSubscriber;
use crate::core::{Publisher, Subscriber, Subscription};
use crate::error::FluxError;
use crate::time::{Clock, TimerHandle};

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Forwards the first `limit` elements, then completes.
///
/// Upstream never sees more than `limit` requested in total.
pub(crate) struct Take<T> {
    source: Source<T>,
    limit: u64,
}

impl<T> Take<T> {
    pub(crate) fn new(source: Source<T>, limit: u64) -> Self {
        Self { source, limit }
    }
}

impl<T: Send + 'static> Publisher<T> for Take<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        self.source.subscribe(Arc::new(TakeSubscriber {
            downstream: subscriber,
            link: StageLink::new(),
            limit: self.limit,
            remaining: AtomicU64::new(self.limit),
            requested: AtomicU64::new(0),
        }));
    }
}

struct TakeSubscriber<T> {
    downstream: Arc<dyn Subscriber<T>>,
    link: StageLink,
    limit: u64,
    remaining: AtomicU64,
    /// Demand forwarded upstream so far, capped at `limit`.
    requested: AtomicU64,
}

impl<T: Send + 'static> Subscriber<T> for TakeSubscriber<T> {
    fn on_subscribe(self: Arc<Self>, subscription: Arc<dyn Subscription>) {
        if !self.link.attach(subscription) {
            return;
        }

        let downstream = self.downstream.clone();
        downstream.clone().on_subscribe(self.clone());

        if self.limit == 0 {
            self.link.complete_early(downstream.as_ref());
        }
    }

    fn on_next(&self, item: T) {
        if self.link.is_done() {
            return;
        }

        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| left.checked_sub(1));

        match previous {
            Ok(1) => {
                self.downstream.on_next(item);
                self.link.complete_early(self.downstream.as_ref());
            }
            Ok(_) => self.downstream.on_next(item),
            Err(_) => {}
        }
    }

    fn on_error(&self, error: FluxError) {
        self.link.forward_error(self.downstream.as_ref(), error);
    }

    fn on_complete(&self) {
        self.link.forward_complete(self.downstream.as_ref());
    }
}

impl<T: Send + 'static> Subscription for TakeSubscriber<T> {
    fn request(&self, n: u64) {
        if n == 0 {
            self.link.fail(self.downstream.as_ref(), FluxError::InvalidDemand(0));
            return;
        }

        let update = self
            .requested
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < self.limit).then(|| current.saturating_add(n).min(self.limit))
            });

        if let Ok(previous) = update {
            let granted = previous.saturating_add(n).min(self.limit) - previous;
            self.link.request(self.downstream.as_ref(), granted);
        }
    }

    fn cancel(&self) {
        self.link.cancel();
    }
}

/// Forwards elements until `duration` has elapsed, then completes.
pub(crate) struct TakeFor<T> {
    source: Source<T>,
    duration: Duration,
    clock: Arc<dyn Clock>,
}

impl<T> TakeFor<T> {
    pub(crate) fn new(source: Source<T>, duration: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            duration,
            clock,
        }
    }
}

impl<T: Send + 'static> Publisher<T> for TakeFor<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        self.source.subscribe(Arc::new(TakeForSubscriber {
            serial: SerializedSubscriber::new(subscriber),
            link: StageLink::new(),
            duration: self.duration,
            clock: self.clock.clone(),
            timer: Mutex::new(None),
        }));
    }
}

/// Signals come from upstream and from the timer thread, hence the
/// serialized downstream.
struct TakeForSubscriber<T> {
    serial: SerializedSubscriber<T>,
    link: StageLink,
    duration: Duration,
    clock: Arc<dyn Clock>,
    timer: Mutex<Option<TimerHandle>>,
}

impl<T: Send + 'static> TakeForSubscriber<T> {
    fn expire(&self) {
        if self.link.lifecycle.complete() {
            tracing::trace!(duration = ?self.duration, "take_for window elapsed");
            self.link.upstream.cancel();
            self.serial.complete();
        }
    }

    fn stop_timer(&self) {
        if let Some(handle) = self.timer.lock().take() {
            handle.cancel();
        }
    }
}

impl<T: Send + 'static> Subscriber<T> for TakeForSubscriber<T> {
    fn on_subscribe(self: Arc<Self>, subscription: Arc<dyn Subscription>) {
        if !self.link.attach(subscription) {
            return;
        }

        self.serial.downstream().clone().on_subscribe(self.clone());

        if self.link.is_done() {
            return;
        }

        let weak = Arc::downgrade(&self);
        let handle = self.clock.schedule(
            self.duration,
            Box::new(move || {
                if let Some(stage) = weak.upgrade() {
                    stage.expire();
                }
            }),
        );

        *self.timer.lock() = Some(handle.clone());

        if self.link.is_done() {
            handle.cancel();
        }
    }

    fn on_next(&self, item: T) {
        if !self.link.is_done() {
            self.serial.next(item);
        }
    }

    fn on_error(&self, error: FluxError) {
        self.stop_timer();

        if self.link.lifecycle.error() {
            self.link.upstream.release();
            self.serial.error(error);
        }
    }

    fn on_complete(&self) {
        self.stop_timer();

        if self.link.lifecycle.complete() {
            self.link.upstream.release();
            self.serial.complete();
        }
    }
}

impl<T: Send + 'static> Subscription for TakeForSubscriber<T> {
    fn request(&self, n: u64) {
        if n == 0 {
            self.stop_timer();

            if self.link.lifecycle.error() {
                self.link.upstream.cancel();
                self.serial.error(FluxError::InvalidDemand(0));
            }
        } else if !self.link.is_done() {
            self.link.upstream.request(n);
        }
    }

    fn cancel(&self) {
        self.stop_timer();
        self.link.cancel();
    }
}
