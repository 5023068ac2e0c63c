use super::{Source, StageLink};
use crate::core::{Publisher, Subscriber, Subscription};
use crate::error::FluxError;
use crate::time::{Clock, TimerHandle};

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Drops the first `count` elements.
pub(crate) struct Skip<T> {
    source: Source<T>,
    count: u64,
}

impl<T> Skip<T> {
    pub(crate) fn new(source: Source<T>, count: u64) -> Self {
        Self { source, count }
    }
}

impl<T: Send + 'static> Publisher<T> for Skip<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        self.source.subscribe(Arc::new(SkipSubscriber {
            downstream: subscriber,
            link: StageLink::new(),
            gate: Gate::Count {
                remaining: AtomicU64::new(self.count),
                initial: self.count,
            },
        }));
    }
}

/// Drops elements until `duration` has elapsed since subscription.
pub(crate) struct SkipFor<T> {
    source: Source<T>,
    duration: Duration,
    clock: Arc<dyn Clock>,
}

impl<T> SkipFor<T> {
    pub(crate) fn new(source: Source<T>, duration: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            duration,
            clock,
        }
    }
}

impl<T: Send + 'static> Publisher<T> for SkipFor<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let open = Arc::new(AtomicBool::new(self.duration.is_zero()));

        let timer = if self.duration.is_zero() {
            None
        } else {
            let flag = open.clone();
            Some(self.clock.schedule(
                self.duration,
                Box::new(move || flag.store(true, Ordering::Release)),
            ))
        };

        self.source.subscribe(Arc::new(SkipSubscriber {
            downstream: subscriber,
            link: StageLink::new(),
            gate: Gate::Timed {
                open,
                timer: Mutex::new(timer),
            },
        }));
    }
}

enum Gate {
    Count { remaining: AtomicU64, initial: u64 },
    Timed { open: Arc<AtomicBool>, timer: Mutex<Option<TimerHandle>> },
}

impl Gate {
    /// Returns `true` if the element must be dropped.
    fn drops(&self) -> bool {
        match self {
            Gate::Count { remaining, .. } => remaining
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| left.checked_sub(1))
                .is_ok(),
            Gate::Timed { open, .. } => !open.load(Ordering::Acquire),
        }
    }

    fn stop(&self) {
        if let Gate::Timed { timer, .. } = self {
            if let Some(handle) = timer.lock().take() {
                handle.cancel();
            }
        }
    }
}

struct SkipSubscriber<T> {
    downstream: Arc<dyn Subscriber<T>>,
    link: StageLink,
    gate: Gate,
}

impl<T: Send + 'static> Subscriber<T> for SkipSubscriber<T> {
    fn on_subscribe(self: Arc<Self>, subscription: Arc<dyn Subscription>) {
        if !self.link.attach(subscription) {
            return;
        }

        self.downstream.clone().on_subscribe(self.clone());

        // The skipped prefix is requested on top of the downstream's own
        // demand.
        if let Gate::Count { initial, .. } = self.gate {
            if initial > 0 && !self.link.is_done() {
                self.link.upstream.request(initial);
            }
        }
    }

    fn on_next(&self, item: T) {
        if self.link.is_done() {
            return;
        }

        if !self.gate.drops() {
            self.downstream.on_next(item);
        } else if matches!(self.gate, Gate::Timed { .. }) {
            self.link.upstream.request(1);
        }
    }

    fn on_error(&self, error: FluxError) {
        self.gate.stop();
        self.link.forward_error(self.downstream.as_ref(), error);
    }

    fn on_complete(&self) {
        self.gate.stop();
        self.link.forward_complete(self.downstream.as_ref());
    }
}

impl<T: Send + 'static> Subscription for SkipSubscriber<T> {
    fn request(&self, n: u64) {
        self.link.request(self.downstream.as_ref(), n);
    }

    fn cancel(&self) {
        self.gate.stop();
        self.link.cancel();
    }
}
