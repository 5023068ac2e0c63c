//! Single-value sequences.

use crate::core::{Publisher, Subscriber};
use crate::error::FluxError;
use crate::flux::Flux;
use crate::operator::log::Log;
use crate::operator::map::Map;
use crate::operator::schedule::SubscribeOn;
use crate::scheduler::Scheduler;
use crate::source::{ErrorSource, SupplierSource};
use crate::subscriber::{Disposable, LambdaSubscriber, OnComplete, OnError, block_last};

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// A sequence of at most one element.
///
/// Aggregating operators such as [`Flux::collect_list`] and [`Flux::all`]
/// return a `Mono`. A `Mono` converts into a [`Flux`] with `into()`, which
/// is how `flat_map` accepts one from its mapper.
pub struct Mono<T> {
    publisher: Arc<dyn Publisher<T>>,
}

impl<T> Clone for Mono<T> {
    fn clone(&self) -> Self {
        Self {
            publisher: self.publisher.clone(),
        }
    }
}

impl<T: Send + 'static> Mono<T> {
    /// Wraps a publisher that emits at most one element.
    pub fn from_publisher(publisher: impl Publisher<T> + 'static) -> Self {
        Self {
            publisher: Arc::new(publisher),
        }
    }

    pub(crate) fn into_publisher(self) -> Arc<dyn Publisher<T>> {
        self.publisher
    }

    /// Completes without a value.
    pub fn empty() -> Self {
        Self::from_publisher(SupplierSource::new("empty", || Ok(None)))
    }

    pub fn error(error: FluxError) -> Self {
        Self::from_publisher(ErrorSource::new(error))
    }

    /// Emits the result of `supplier`, called once per subscription.
    ///
    /// A panicking supplier fails the sequence with an operator error.
    pub fn from_fn<F>(supplier: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::from_publisher(SupplierSource::new("from_fn", move || Ok(Some(supplier()))))
    }

    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        self.publisher.subscribe(subscriber);
    }

    /// Subscribes with a value callback.
    pub fn subscribe_with<N>(&self, on_next: N) -> Disposable
    where
        N: Fn(T) + Send + Sync + 'static,
    {
        LambdaSubscriber::new(Box::new(on_next), None, None).attach(self.publisher.as_ref())
    }

    /// Subscribes with callbacks for every signal.
    pub fn subscribe_all<N, E, C>(&self, on_next: N, on_error: E, on_complete: C) -> Disposable
    where
        N: Fn(T) + Send + Sync + 'static,
        E: Fn(FluxError) + Send + Sync + 'static,
        C: Fn() + Send + Sync + 'static,
    {
        LambdaSubscriber::new(
            Box::new(on_next),
            Some(Box::new(on_error) as OnError),
            Some(Box::new(on_complete) as OnComplete),
        )
        .attach(self.publisher.as_ref())
    }

    /// Blocks until the value arrives.
    ///
    /// Returns `Ok(None)` for an empty `Mono`, and [`FluxError::Timeout`]
    /// (cancelling the subscription) if nothing arrives within `timeout`.
    pub fn block(&self, timeout: Duration) -> Result<Option<T>, FluxError> {
        block_last(self.publisher.as_ref(), timeout)
    }

    pub fn map<R, F>(self, mapper: F) -> Mono<R>
    where
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        Mono::from_publisher(Map::new(self.publisher, "map", move |item| Ok(mapper(item))))
    }

    pub fn subscribe_on(self, scheduler: Arc<dyn Scheduler>) -> Self {
        Self::from_publisher(SubscribeOn::new(self.publisher, scheduler))
    }

    pub fn flux(self) -> Flux<T> {
        self.into()
    }
}

impl<T: Clone + Send + Sync + 'static> Mono<T> {
    /// Emits `value`, then completes.
    pub fn just(value: T) -> Self {
        Self::from_publisher(SupplierSource::new("just", move || Ok(Some(value.clone()))))
    }
}

impl<T: Debug + Send + 'static> Mono<T> {
    /// Records every signal as a `tracing` event under `category`.
    pub fn log(self, category: &str) -> Self {
        Self::from_publisher(Log::new(self.publisher, category))
    }
}
