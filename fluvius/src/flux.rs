//! Multi-value sequences.

use crate::config::{DEFAULT_CONCURRENCY, DEFAULT_PREFETCH};
use crate::core::{Publisher, Subscriber};
use crate::error::FluxError;
use crate::mono::Mono;
use crate::operator::aggregate::Collect;
use crate::operator::buffer::Buffer;
use crate::operator::delay::DelayElements;
use crate::operator::distinct::Distinct;
use crate::operator::filter::Filter;
use crate::operator::flat_map::FlatMap;
use crate::operator::log::Log;
use crate::operator::map::Map;
use crate::operator::quantifier::{Quantifier, Quantify};
use crate::operator::schedule::{PublishOn, SubscribeOn};
use crate::operator::skip::{Skip, SkipFor};
use crate::operator::take::{Take, TakeFor};
use crate::scheduler::Scheduler;
use crate::source::{BoxIter, ErrorSource, IntervalSource, IterSource};
use crate::subscriber::{Disposable, LambdaSubscriber, OnComplete, OnError, block_last};
use crate::time::Clock;

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

/// A sequence of `0..N` elements followed by completion or an error.
///
/// A `Flux` is a description: building one runs nothing. Every
/// [`subscribe`](Self::subscribe) starts an independent run of the whole
/// pipeline for that subscriber, driven by the subscriber's demand.
///
/// Operators consume the `Flux` and return a new one wrapping it; clone
/// first to branch a pipeline.
///
/// # Examples
///
/// ```rust,ignore
/// let words = Flux::just(["dog", "cat", "bird", "dog"])
///     .distinct()
///     .map(str::len)
///     .collect_list()
///     .block(Duration::from_secs(1));
///
/// assert_eq!(words, Ok(Some(vec![3, 3, 4])));
/// ```
pub struct Flux<T> {
    publisher: Arc<dyn Publisher<T>>,
}

impl<T> Clone for Flux<T> {
    fn clone(&self) -> Self {
        Self {
            publisher: self.publisher.clone(),
        }
    }
}

impl<T: Send + 'static> Flux<T> {
    /// Wraps any publisher.
    pub fn from_publisher(publisher: impl Publisher<T> + 'static) -> Self {
        Self {
            publisher: Arc::new(publisher),
        }
    }

    pub(crate) fn from_arc(publisher: Arc<dyn Publisher<T>>) -> Self {
        Self { publisher }
    }

    pub(crate) fn into_publisher(self) -> Arc<dyn Publisher<T>> {
        self.publisher
    }

    /// Completes without emitting anything.
    pub fn empty() -> Self {
        Self::from_publisher(IterSource::new(|| {
            Ok(Box::new(std::iter::empty()) as BoxIter<T>)
        }))
    }

    /// Fails every subscriber with `error`.
    pub fn error(error: FluxError) -> Self {
        Self::from_publisher(ErrorSource::new(error))
    }

    /// Emits the elements of a single-use iterator.
    ///
    /// Only the first subscriber gets the elements; later ones receive
    /// [`FluxError::SourceConsumed`].
    pub fn from_stream<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T> + 'static,
        I::IntoIter: Send + 'static,
    {
        let slot = Mutex::new(Some(iter.into_iter()));

        Self::from_publisher(IterSource::new(move || match slot.lock().take() {
            Some(iter) => Ok(Box::new(iter.map(Ok)) as BoxIter<T>),
            None => Err(FluxError::SourceConsumed),
        }))
    }

    /// Emits the `Ok` elements of a single-use iterator.
    ///
    /// The first `Err` terminates the sequence with an upstream error.
    pub fn try_from_iter<I, E>(iter: I) -> Self
    where
        I: IntoIterator<Item = Result<T, E>> + 'static,
        I::IntoIter: Send + 'static,
        E: Display + 'static,
    {
        let slot = Mutex::new(Some(iter.into_iter()));

        Self::from_publisher(IterSource::new(move || match slot.lock().take() {
            Some(iter) => Ok(Box::new(iter.map(|item| {
                item.map_err(|error| FluxError::upstream(error.to_string()))
            })) as BoxIter<T>),
            None => Err(FluxError::SourceConsumed),
        }))
    }

    /// Subscribes `subscriber`, starting a new run of the pipeline.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        self.publisher.subscribe(subscriber);
    }

    /// Subscribes with an element callback and unbounded demand.
    ///
    /// Errors are reported through `tracing`.
    pub fn subscribe_with<N>(&self, on_next: N) -> Disposable
    where
        N: Fn(T) + Send + Sync + 'static,
    {
        LambdaSubscriber::new(Box::new(on_next), None, None).attach(self.publisher.as_ref())
    }

    /// Subscribes with callbacks for every signal and unbounded demand.
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

    /// Blocks until the sequence terminates and returns its last element.
    ///
    /// Returns [`FluxError::Timeout`] (and cancels) if nothing terminal
    /// arrives within `timeout`.
    pub fn block_last(&self, timeout: Duration) -> Result<Option<T>, FluxError> {
        block_last(self.publisher.as_ref(), timeout)
    }

    pub fn filter<P>(self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self::from_publisher(Filter::new(self.publisher, predicate))
    }

    pub fn skip(self, count: u64) -> Self {
        Self::from_publisher(Skip::new(self.publisher, count))
    }

    /// Drops elements arriving before `duration` has elapsed on `clock`.
    pub fn skip_for(self, duration: Duration, clock: Arc<dyn Clock>) -> Self {
        Self::from_publisher(SkipFor::new(self.publisher, duration, clock))
    }

    /// Forwards the first `count` elements, then completes and cancels
    /// upstream.
    pub fn take(self, count: u64) -> Self {
        Self::from_publisher(Take::new(self.publisher, count))
    }

    /// Forwards elements until `duration` has elapsed on `clock`, then
    /// completes and cancels upstream.
    pub fn take_for(self, duration: Duration, clock: Arc<dyn Clock>) -> Self {
        Self::from_publisher(TakeFor::new(self.publisher, duration, clock))
    }

    /// Forwards the first element for each key.
    pub fn distinct_by<K, F>(self, key: F) -> Self
    where
        K: Eq + Hash + Send + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        Self::from_publisher(Distinct::new(self.publisher, key))
    }

    pub fn map<R, F>(self, mapper: F) -> Flux<R>
    where
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        Flux::from_publisher(Map::new(self.publisher, "map", move |item| Ok(mapper(item))))
    }

    /// Like [`map`](Self::map), failing the sequence on `Err`.
    pub fn try_map<R, E, F>(self, mapper: F) -> Flux<R>
    where
        R: Send + 'static,
        E: Display + 'static,
        F: Fn(T) -> Result<R, E> + Send + Sync + 'static,
    {
        Flux::from_publisher(Map::new(self.publisher, "try_map", move |item| {
            mapper(item).map_err(|error| FluxError::operator("try_map", error.to_string()))
        }))
    }

    /// Groups elements into vectors of `size`; the last one may be shorter.
    pub fn buffer(self, size: usize) -> Flux<Vec<T>> {
        Flux::from_publisher(Buffer::new(self.publisher, size))
    }

    /// Shifts every element by `delay` on `clock`.
    pub fn delay_elements(self, delay: Duration, clock: Arc<dyn Clock>) -> Self {
        Self::from_publisher(DelayElements::new(self.publisher, delay, clock))
    }

    /// Maps every element to a sequence and merges the results.
    ///
    /// Uses [`DEFAULT_CONCURRENCY`] and [`DEFAULT_PREFETCH`].
    pub fn flat_map<R, P, F>(self, mapper: F) -> Flux<R>
    where
        R: Send + 'static,
        P: Into<Flux<R>> + 'static,
        F: Fn(T) -> P + Send + Sync + 'static,
    {
        self.flat_map_with(mapper, DEFAULT_CONCURRENCY, DEFAULT_PREFETCH)
    }

    /// [`flat_map`](Self::flat_map) with explicit limits.
    ///
    /// At most `concurrency` inner sequences run at once, each asked for
    /// `prefetch` elements ahead of the downstream.
    pub fn flat_map_with<R, P, F>(self, mapper: F, concurrency: usize, prefetch: u64) -> Flux<R>
    where
        R: Send + 'static,
        P: Into<Flux<R>> + 'static,
        F: Fn(T) -> P + Send + Sync + 'static,
    {
        Flux::from_publisher(FlatMap::new(
            self.publisher,
            move |item| mapper(item).into().into_publisher(),
            concurrency,
            prefetch,
        ))
    }

    /// Subscribes to this sequence from `scheduler`.
    pub fn subscribe_on(self, scheduler: Arc<dyn Scheduler>) -> Self {
        Self::from_publisher(SubscribeOn::new(self.publisher, scheduler))
    }

    /// Delivers the signals of this sequence from `scheduler`.
    pub fn publish_on(self, scheduler: Arc<dyn Scheduler>) -> Self {
        Self::from_publisher(PublishOn::new(self.publisher, scheduler))
    }

    /// Collects every element into a vector.
    pub fn collect_list(self) -> Mono<Vec<T>> {
        Mono::from_publisher(Collect::new(
            self.publisher,
            "collect_list",
            Vec::new,
            |list: &mut Vec<T>, item| list.push(item),
        ))
    }

    /// Collects every element into a map keyed by `key`.
    ///
    /// On a key collision the later element replaces the earlier one.
    pub fn collect_map<K, F>(self, key: F) -> Mono<HashMap<K, T>>
    where
        K: Eq + Hash + Send + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.collect_map_with(key, |item| item)
    }

    /// Like [`collect_map`](Self::collect_map), storing `value(element)`.
    pub fn collect_map_with<K, V, F, G>(self, key: F, value: G) -> Mono<HashMap<K, V>>
    where
        K: Eq + Hash + Send + 'static,
        V: Send + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
        G: Fn(T) -> V + Send + Sync + 'static,
    {
        Mono::from_publisher(Collect::new(
            self.publisher,
            "collect_map",
            HashMap::new,
            move |map: &mut HashMap<K, V>, item| {
                map.insert(key(&item), value(item));
            },
        ))
    }

    /// Emits `true` if every element matches, stopping at the first
    /// mismatch. An empty sequence yields `true`.
    pub fn all<P>(self, predicate: P) -> Mono<bool>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Mono::from_publisher(Quantifier::new(self.publisher, Quantify::All, predicate))
    }

    /// Emits `true` at the first matching element. An empty sequence
    /// yields `false`.
    pub fn any<P>(self, predicate: P) -> Mono<bool>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Mono::from_publisher(Quantifier::new(self.publisher, Quantify::Any, predicate))
    }
}

impl<T: Clone + Send + Sync + 'static> Flux<T> {
    /// Emits `values` in order, then completes.
    pub fn just(values: impl IntoIterator<Item = T>) -> Self {
        Self::from_iterable(values.into_iter().collect::<Vec<_>>())
    }

    pub fn from_array<const N: usize>(values: [T; N]) -> Self {
        Self::just(values)
    }

    /// Emits the elements of `iterable`, iterating a fresh clone of it for
    /// every subscriber.
    pub fn from_iterable<I>(iterable: I) -> Self
    where
        I: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
        I::IntoIter: Send + 'static,
    {
        Self::from_publisher(IterSource::new(move || {
            Ok(Box::new(iterable.clone().into_iter().map(Ok)) as BoxIter<T>)
        }))
    }
}

impl<T: Eq + Hash + Clone + Send + 'static> Flux<T> {
    /// Forwards the first occurrence of every element.
    pub fn distinct(self) -> Self {
        self.distinct_by(T::clone)
    }
}

impl<T: Debug + Send + 'static> Flux<T> {
    /// Records every signal as a `tracing` event under `category`.
    pub fn log(self, category: &str) -> Self {
        Self::from_publisher(Log::new(self.publisher, category))
    }
}

impl Flux<i64> {
    /// Emits `count` consecutive integers starting at `start`.
    ///
    /// Fails with [`FluxError::InvalidArgument`] if the range overflows
    /// `i64`.
    pub fn range(start: i64, count: u64) -> Self {
        if count > 0 && start.checked_add_unsigned(count - 1).is_none() {
            return Self::error(FluxError::InvalidArgument(format!(
                "range({start}, {count}) overflows i64"
            )));
        }

        Self::from_publisher(IterSource::new(move || {
            let values = (0..count).map(move |offset| Ok(start.wrapping_add_unsigned(offset)));
            Ok(Box::new(values) as BoxIter<i64>)
        }))
    }
}

impl Flux<u64> {
    /// Emits `0, 1, 2, ...` every `period` on `clock`, starting one
    /// period after subscription. Never completes.
    ///
    /// Ticks that find no demand are kept and emitted once demand
    /// arrives.
    pub fn interval(period: Duration, clock: Arc<dyn Clock>) -> Self {
        Self::interval_with_delay(period, period, clock)
    }

    /// Like [`interval`](Self::interval) with the first tick after `delay`.
    pub fn interval_with_delay(delay: Duration, period: Duration, clock: Arc<dyn Clock>) -> Self {
        Self::from_publisher(IntervalSource::new(delay, period, clock))
    }
}

impl<T: Send + 'static> From<Mono<T>> for Flux<T> {
    fn from(mono: Mono<T>) -> Self {
        Flux::from_arc(mono.into_publisher())
    }
}
