use super::{Source, StageLink};
use crate::core::demand::UNBOUNDED;
use crate::core::serialized::SerializedSubscriber;
use crate::core::{Publisher, Subscriber, Subscription};
use crate::error::FluxError;
use crate::time::{Clock, TimerHandle};

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Re-emits every element `delay` after it arrived.
///
/// Elements are pulled from upstream one at a time, so at most one element
/// is waiting on the clock. Completion waits for that element.
pub(crate) struct DelayElements<T> {
    source: Source<T>,
    delay: Duration,
    clock: Arc<dyn Clock>,
}

impl<T> DelayElements<T> {
    pub(crate) fn new(source: Source<T>, delay: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            delay,
            clock,
        }
    }
}

impl<T: Send + 'static> Publisher<T> for DelayElements<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let stage = Arc::new_cyclic(|me| DelaySubscriber {
            me: me.clone(),
            serial: SerializedSubscriber::new(subscriber),
            link: StageLink::new(),
            delay: self.delay,
            clock: self.clock.clone(),
            state: Mutex::new(DelayState {
                demand: 0,
                awaiting: false,
                pending: false,
                upstream_done: false,
                timer: None,
            }),
        });

        self.source.subscribe(stage);
    }
}

struct DelayState {
    /// Outstanding downstream demand.
    demand: u64,
    /// An element was requested upstream and has not arrived yet.
    awaiting: bool,
    /// An element is waiting on the clock.
    pending: bool,
    upstream_done: bool,
    timer: Option<TimerHandle>,
}

struct DelaySubscriber<T> {
    me: Weak<DelaySubscriber<T>>,
    serial: SerializedSubscriber<T>,
    link: StageLink,
    delay: Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<DelayState>,
}

impl<T: Send + 'static> DelaySubscriber<T> {
    /// Requests the next element if the downstream can take it.
    fn pull(&self) {
        {
            let mut state = self.state.lock();

            if state.awaiting || state.pending || state.upstream_done || state.demand == 0 {
                return;
            }

            state.awaiting = true;
        }

        self.link.upstream.request(1);
    }

    fn emit(&self, item: T) {
        // Still pending while delivering, so completion cannot overtake it.
        if !self.link.is_done() {
            self.serial.next(item);
        }

        let upstream_done = {
            let mut state = self.state.lock();
            state.pending = false;
            state.timer = None;

            if state.demand != UNBOUNDED {
                state.demand = state.demand.saturating_sub(1);
            }

            state.upstream_done
        };

        if self.link.is_done() {
            return;
        }

        if upstream_done {
            self.finish();
        } else {
            self.pull();
        }
    }

    fn finish(&self) {
        if self.link.lifecycle.complete() {
            self.link.upstream.release();
            self.serial.complete();
        }
    }

    fn stop_timer(&self) {
        if let Some(handle) = self.state.lock().timer.take() {
            handle.cancel();
        }
    }
}

impl<T: Send + 'static> Subscriber<T> for DelaySubscriber<T> {
    fn on_subscribe(self: Arc<Self>, subscription: Arc<dyn Subscription>) {
        if self.link.attach(subscription) {
            self.serial.downstream().clone().on_subscribe(self);
        }
    }

    fn on_next(&self, item: T) {
        if self.link.is_done() {
            return;
        }

        {
            let mut state = self.state.lock();
            state.awaiting = false;
            state.pending = true;
        }

        let me = self.me.clone();
        let handle = self.clock.schedule(
            self.delay,
            Box::new(move || {
                if let Some(stage) = me.upgrade() {
                    stage.emit(item);
                }
            }),
        );

        let mut state = self.state.lock();

        if state.pending {
            state.timer = Some(handle);
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
        let pending = {
            let mut state = self.state.lock();
            state.upstream_done = true;
            state.pending
        };

        if !pending {
            self.finish();
        }
    }
}

impl<T: Send + 'static> Subscription for DelaySubscriber<T> {
    fn request(&self, n: u64) {
        if n == 0 {
            self.stop_timer();

            if self.link.lifecycle.error() {
                self.link.upstream.cancel();
                self.serial.error(FluxError::InvalidDemand(0));
            }

            return;
        }

        {
            let mut state = self.state.lock();
            state.demand = state.demand.saturating_add(n);
        }

        self.pull();
    }

    fn cancel(&self) {
        self.stop_timer();
        self.link.cancel();
    }
}
