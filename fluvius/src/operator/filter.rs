use super::{Source, StageLink};
use crate::core::{Publisher, Subscriber, Subscription};
use crate::error::{FluxError, catch_fault};

use std::sync::Arc;

/// Forwards the elements matching a predicate.
///
/// Every dropped element is replaced by a `request(1)` upstream so the
/// downstream still receives what it asked for.
pub(crate) struct Filter<T, P> {
    source: Source<T>,
    predicate: Arc<P>,
}

impl<T, P> Filter<T, P> {
    pub(crate) fn new(source: Source<T>, predicate: P) -> Self {
        Self {
            source,
            predicate: Arc::new(predicate),
        }
    }
}

impl<T, P> Publisher<T> for Filter<T, P>
where
    T: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        self.source.subscribe(Arc::new(FilterSubscriber {
            downstream: subscriber,
            link: StageLink::new(),
            predicate: self.predicate.clone(),
        }));
    }
}

struct FilterSubscriber<T, P> {
    downstream: Arc<dyn Subscriber<T>>,
    link: StageLink,
    predicate: Arc<P>,
}

impl<T, P> Subscriber<T> for FilterSubscriber<T, P>
where
    T: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    fn on_subscribe(self: Arc<Self>, subscription: Arc<dyn Subscription>) {
        if self.link.attach(subscription) {
            self.downstream.clone().on_subscribe(self);
        }
    }

    fn on_next(&self, item: T) {
        if self.link.is_done() {
            return;
        }

        match catch_fault("filter", || (self.predicate)(&item)) {
            Ok(true) => self.downstream.on_next(item),
            Ok(false) => self.link.upstream.request(1),
            Err(error) => self.link.fail(self.downstream.as_ref(), error),
        }
    }

    fn on_error(&self, error: FluxError) {
        self.link.forward_error(self.downstream.as_ref(), error);
    }

    fn on_complete(&self) {
        self.link.forward_complete(self.downstream.as_ref());
    }
}

impl<T, P> Subscription for FilterSubscriber<T, P>
where
    T: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    fn request(&self, n: u64) {
        self.link.request(self.downstream.as_ref(), n);
    }

    fn cancel(&self) {
        self.link.cancel();
    }
}
