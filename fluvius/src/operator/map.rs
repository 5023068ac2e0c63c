use super::{Source, StageLink};
use crate::core::{Publisher, Subscriber, Subscription};
use crate::error::{FluxError, catch_fault};

use std::marker::PhantomData;
use std::sync::Arc;

/// `map` and `try_map`.
///
/// The mapper may fail by returning `Err` or by panicking; either way the
/// stage cancels upstream and signals one operator error.
pub(crate) struct Map<T, R, F> {
    source: Source<T>,
    operator: &'static str,
    mapper: Arc<F>,
    _marker: PhantomData<fn() -> R>,
}

impl<T, R, F> Map<T, R, F>
where
    F: Fn(T) -> Result<R, FluxError>,
{
    pub(crate) fn new(source: Source<T>, operator: &'static str, mapper: F) -> Self {
        Self {
            source,
            operator,
            mapper: Arc::new(mapper),
            _marker: PhantomData,
        }
    }
}

impl<T, R, F> Publisher<R> for Map<T, R, F>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Result<R, FluxError> + Send + Sync + 'static,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<R>>) {
        self.source.subscribe(Arc::new(MapSubscriber {
            downstream: subscriber,
            link: StageLink::new(),
            operator: self.operator,
            mapper: self.mapper.clone(),
            _marker: PhantomData,
        }));
    }
}

struct MapSubscriber<T, R, F> {
    downstream: Arc<dyn Subscriber<R>>,
    link: StageLink,
    operator: &'static str,
    mapper: Arc<F>,
    _marker: PhantomData<fn(T)>,
}

impl<T, R, F> Subscriber<T> for MapSubscriber<T, R, F>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Result<R, FluxError> + Send + Sync + 'static,
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

        match catch_fault(self.operator, || (self.mapper)(item)).and_then(|mapped| mapped) {
            Ok(mapped) => self.downstream.on_next(mapped),
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

impl<T, R, F> Subscription for MapSubscriber<T, R, F>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Result<R, FluxError> + Send + Sync + 'static,
{
    fn request(&self, n: u64) {
        self.link.request(self.downstream.as_ref(), n);
    }

    fn cancel(&self) {
        self.link.cancel();
    }
}
