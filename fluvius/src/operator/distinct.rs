use super::{Source, StageLink};
use crate::core::{Publisher, Subscriber, Subscription};
use crate::error::{FluxError, catch_fault};

use parking_lot::Mutex;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

/// Forwards the first element seen for each key.
///
/// The set of seen keys lives as long as the subscription and is never
/// pruned.
pub(crate) struct Distinct<T, K, F> {
    source: Source<T>,
    key: Arc<F>,
    _marker: std::marker::PhantomData<fn() -> K>,
}

impl<T, K, F> Distinct<T, K, F> {
    pub(crate) fn new(source: Source<T>, key: F) -> Self {
        Self {
            source,
            key: Arc::new(key),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T, K, F> Publisher<T> for Distinct<T, K, F>
where
    T: Send + 'static,
    K: Eq + Hash + Send + 'static,
    F: Fn(&T) -> K + Send + Sync + 'static,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        self.source.subscribe(Arc::new(DistinctSubscriber {
            downstream: subscriber,
            link: StageLink::new(),
            key: self.key.clone(),
            seen: Mutex::new(HashSet::new()),
        }));
    }
}

struct DistinctSubscriber<T, K, F> {
    downstream: Arc<dyn Subscriber<T>>,
    link: StageLink,
    key: Arc<F>,
    seen: Mutex<HashSet<K>>,
}

impl<T, K, F> Subscriber<T> for DistinctSubscriber<T, K, F>
where
    T: Send + 'static,
    K: Eq + Hash + Send + 'static,
    F: Fn(&T) -> K + Send + Sync + 'static,
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

        let key = match catch_fault("distinct", || (self.key)(&item)) {
            Ok(key) => key,
            Err(error) => {
                self.link.fail(self.downstream.as_ref(), error);
                return;
            }
        };

        let first = self.seen.lock().insert(key);

        if first {
            self.downstream.on_next(item);
        } else {
            self.link.upstream.request(1);
        }
    }

    fn on_error(&self, error: FluxError) {
        self.link.forward_error(self.downstream.as_ref(), error);
    }

    fn on_complete(&self) {
        self.link.forward_complete(self.downstream.as_ref());
    }
}

impl<T, K, F> Subscription for DistinctSubscriber<T, K, F>
where
    T: Send + 'static,
    K: Eq + Hash + Send + 'static,
    F: Fn(&T) -> K + Send + Sync + 'static,
{
    fn request(&self, n: u64) {
        self.link.request(self.downstream.as_ref(), n);
    }

    fn cancel(&self) {
        self.link.cancel();
    }
}
