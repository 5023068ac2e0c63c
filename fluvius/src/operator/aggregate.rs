use super::{Source, StageLink};
use crate::core::demand::UNBOUNDED;
use crate::core::scalar::DeferredScalar;
use crate::core::{Publisher, Subscriber, Subscription};
use crate::error::{FluxError, catch_fault};

use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::Arc;

/// Folds a whole sequence into one container, emitted on completion.
///
/// Backs `collect_list`, `collect_map` and `collect_map_with`. Upstream is
/// requested without bound; the result waits for downstream demand.
pub(crate) struct Collect<T, C, I, F> {
    source: Source<T>,
    operator: &'static str,
    init: Arc<I>,
    accumulate: Arc<F>,
    _marker: PhantomData<fn() -> C>,
}

impl<T, C, I, F> Collect<T, C, I, F>
where
    I: Fn() -> C,
    F: Fn(&mut C, T),
{
    pub(crate) fn new(source: Source<T>, operator: &'static str, init: I, accumulate: F) -> Self {
        Self {
            source,
            operator,
            init: Arc::new(init),
            accumulate: Arc::new(accumulate),
            _marker: PhantomData,
        }
    }
}

impl<T, C, I, F> Publisher<C> for Collect<T, C, I, F>
where
    T: Send + 'static,
    C: Send + 'static,
    I: Fn() -> C + Send + Sync + 'static,
    F: Fn(&mut C, T) + Send + Sync + 'static,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<C>>) {
        self.source.subscribe(Arc::new(CollectSubscriber {
            scalar: DeferredScalar::new(subscriber),
            link: StageLink::new(),
            operator: self.operator,
            container: Mutex::new(Some((self.init)())),
            accumulate: self.accumulate.clone(),
            _marker: PhantomData,
        }));
    }
}

struct CollectSubscriber<T, C, F> {
    scalar: DeferredScalar<C>,
    link: StageLink,
    operator: &'static str,
    container: Mutex<Option<C>>,
    accumulate: Arc<F>,
    _marker: PhantomData<fn(T)>,
}

impl<T, C, F> CollectSubscriber<T, C, F>
where
    T: Send + 'static,
    C: Send + 'static,
    F: Fn(&mut C, T) + Send + Sync + 'static,
{
    fn fail(&self, error: FluxError) {
        if self.link.lifecycle.error() {
            self.link.upstream.cancel();
            self.container.lock().take();
            self.scalar.error(error);
        }
    }
}

impl<T, C, F> Subscriber<T> for CollectSubscriber<T, C, F>
where
    T: Send + 'static,
    C: Send + 'static,
    F: Fn(&mut C, T) + Send + Sync + 'static,
{
    fn on_subscribe(self: Arc<Self>, subscription: Arc<dyn Subscription>) {
        if !self.link.attach(subscription) {
            return;
        }

        self.scalar.downstream().clone().on_subscribe(self.clone());
        self.link.upstream.request(UNBOUNDED);
    }

    fn on_next(&self, item: T) {
        if self.link.is_done() {
            return;
        }

        let outcome = {
            let mut container = self.container.lock();

            match container.as_mut() {
                Some(container) => catch_fault(self.operator, || (self.accumulate)(container, item)),
                None => Ok(()),
            }
        };

        if let Err(error) = outcome {
            self.fail(error);
        }
    }

    fn on_error(&self, error: FluxError) {
        if self.link.lifecycle.error() {
            self.link.upstream.release();
            self.container.lock().take();
            self.scalar.error(error);
        }
    }

    fn on_complete(&self) {
        if !self.link.lifecycle.complete() {
            return;
        }

        self.link.upstream.release();

        let container = self.container.lock().take();

        match container {
            Some(container) => self.scalar.complete_with(container),
            None => self.scalar.complete_empty(),
        }
    }
}

impl<T, C, F> Subscription for CollectSubscriber<T, C, F>
where
    T: Send + 'static,
    C: Send + 'static,
    F: Fn(&mut C, T) + Send + Sync + 'static,
{
    fn request(&self, n: u64) {
        if n == 0 {
            // Also overrides a result that is already waiting for demand.
            self.link.lifecycle.error();
            self.link.upstream.cancel();
            self.container.lock().take();
            self.scalar.error(FluxError::InvalidDemand(0));
        } else {
            self.scalar.on_request();
        }
    }

    fn cancel(&self) {
        Subscription::cancel(&self.scalar);
        self.link.cancel();
        self.container.lock().take();
    }
}
