use super::{Source, StageLink};
use crate::core::demand::Wip;
use crate::core::{Publisher, Signal, Subscriber, Subscription, reject};
use crate::error::FluxError;
use crate::scheduler::Scheduler;

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};

/// Subscribes to the source from a scheduler.
///
/// Synchronous sources then emit on the scheduler too. Requests made from
/// outside the scheduler are handed back to it.
pub(crate) struct SubscribeOn<T> {
    source: Source<T>,
    scheduler: Arc<dyn Scheduler>,
}

impl<T> SubscribeOn<T> {
    pub(crate) fn new(source: Source<T>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self { source, scheduler }
    }
}

impl<T: Send + 'static> Publisher<T> for SubscribeOn<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let stage = Arc::new_cyclic(|me| SubscribeOnSubscriber {
            me: me.clone(),
            downstream: subscriber.clone(),
            link: StageLink::new(),
            scheduler: self.scheduler.clone(),
        });

        let source = self.source.clone();
        let scheduled = self
            .scheduler
            .schedule(Box::new(move || source.subscribe(stage)));

        if let Err(error) = scheduled {
            tracing::debug!(%error, "subscribe_on could not schedule the subscription");
            reject(subscriber, error);
        }
    }
}

struct SubscribeOnSubscriber<T> {
    me: Weak<SubscribeOnSubscriber<T>>,
    downstream: Arc<dyn Subscriber<T>>,
    link: StageLink,
    scheduler: Arc<dyn Scheduler>,
}

impl<T: Send + 'static> Subscriber<T> for SubscribeOnSubscriber<T> {
    fn on_subscribe(self: Arc<Self>, subscription: Arc<dyn Subscription>) {
        if self.link.attach(subscription) {
            self.downstream.clone().on_subscribe(self);
        }
    }

    fn on_next(&self, item: T) {
        if !self.link.is_done() {
            self.downstream.on_next(item);
        }
    }

    fn on_error(&self, error: FluxError) {
        self.link.forward_error(self.downstream.as_ref(), error);
    }

    fn on_complete(&self) {
        self.link.forward_complete(self.downstream.as_ref());
    }
}

impl<T: Send + 'static> Subscription for SubscribeOnSubscriber<T> {
    fn request(&self, n: u64) {
        if n == 0 || self.scheduler.is_current() {
            self.link.request(self.downstream.as_ref(), n);
            return;
        }

        let me = self.me.clone();
        let scheduled = self.scheduler.schedule(Box::new(move || {
            if let Some(stage) = me.upgrade() {
                stage.link.request(stage.downstream.as_ref(), n);
            }
        }));

        if let Err(error) = scheduled {
            self.link.fail(self.downstream.as_ref(), error);
        }
    }

    fn cancel(&self) {
        self.link.cancel();
    }
}

/// Delivers downstream signals from a scheduler, in order.
///
/// Signals are queued; one scheduled job at a time drains the queue.
pub(crate) struct PublishOn<T> {
    source: Source<T>,
    scheduler: Arc<dyn Scheduler>,
}

impl<T> PublishOn<T> {
    pub(crate) fn new(source: Source<T>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self { source, scheduler }
    }
}

impl<T: Send + 'static> Publisher<T> for PublishOn<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        self.source.subscribe(Arc::new_cyclic(|me| PublishOnSubscriber {
            me: me.clone(),
            downstream: subscriber,
            link: StageLink::new(),
            scheduler: self.scheduler.clone(),
            queue: Mutex::new(VecDeque::new()),
            wip: Wip::new(),
        }));
    }
}

struct PublishOnSubscriber<T> {
    me: Weak<PublishOnSubscriber<T>>,
    downstream: Arc<dyn Subscriber<T>>,
    link: StageLink,
    scheduler: Arc<dyn Scheduler>,
    queue: Mutex<VecDeque<Signal<T>>>,
    wip: Wip,
}

impl<T: Send + 'static> PublishOnSubscriber<T> {
    fn enqueue(&self, signal: Signal<T>) {
        self.queue.lock().push_back(signal);

        if !self.wip.enter() {
            return;
        }

        let me = self.me.clone();
        let scheduled = self.scheduler.schedule(Box::new(move || {
            if let Some(stage) = me.upgrade() {
                stage.drain();
            }
        }));

        if let Err(error) = scheduled {
            tracing::debug!(%error, "publish_on could not schedule delivery");
            self.queue.lock().clear();
            self.link.lifecycle.error();
            self.link.upstream.cancel();
            self.downstream.on_error(error);
        }
    }

    fn drain(&self) {
        let mut missed = 1;

        loop {
            loop {
                if self.link.lifecycle.is_cancelled() {
                    self.queue.lock().clear();
                    return;
                }

                let signal = self.queue.lock().pop_front();

                match signal {
                    Some(signal) => signal.deliver(self.downstream.as_ref()),
                    None => break,
                }
            }

            missed = self.wip.leave(missed);

            if missed == 0 {
                break;
            }
        }
    }
}

impl<T: Send + 'static> Subscriber<T> for PublishOnSubscriber<T> {
    fn on_subscribe(self: Arc<Self>, subscription: Arc<dyn Subscription>) {
        if self.link.attach(subscription) {
            self.downstream.clone().on_subscribe(self);
        }
    }

    fn on_next(&self, item: T) {
        if !self.link.is_done() {
            self.enqueue(Signal::Next(item));
        }
    }

    fn on_error(&self, error: FluxError) {
        if self.link.lifecycle.error() {
            self.link.upstream.release();
            self.enqueue(Signal::Error(error));
        }
    }

    fn on_complete(&self) {
        if self.link.lifecycle.complete() {
            self.link.upstream.release();
            self.enqueue(Signal::Complete);
        }
    }
}

impl<T: Send + 'static> Subscription for PublishOnSubscriber<T> {
    fn request(&self, n: u64) {
        if n == 0 {
            if self.link.lifecycle.error() {
                self.link.upstream.cancel();
                self.enqueue(Signal::Error(FluxError::InvalidDemand(0)));
            }
        } else if !self.link.is_done() {
            self.link.upstream.request(n);
        }
    }

    fn cancel(&self) {
        self.link.cancel();
    }
}
