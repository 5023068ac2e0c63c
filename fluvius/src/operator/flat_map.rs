use super::{Source, StageLink};
use crate::core::demand::{Demand, UNBOUNDED, Wip};
use crate::core::upstream::UpstreamSlot;
use crate::core::{Publisher, Subscriber, Subscription, reject};
use crate::error::{FluxError, catch_fault};
use crate::utils::Slab;

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Maps every element to an inner sequence and merges the inner sequences.
///
/// At most `concurrency` inner sequences run at once; each one is asked for
/// `prefetch` elements up front and topped up one element at a time as its
/// elements reach the downstream. Elements of different inner sequences
/// interleave in arrival order.
pub(crate) struct FlatMap<T, R, F> {
    source: Source<T>,
    mapper: Arc<F>,
    concurrency: usize,
    prefetch: u64,
    _marker: std::marker::PhantomData<fn() -> R>,
}

impl<T, R, F> FlatMap<T, R, F>
where
    F: Fn(T) -> Source<R>,
{
    pub(crate) fn new(source: Source<T>, mapper: F, concurrency: usize, prefetch: u64) -> Self {
        Self {
            source,
            mapper: Arc::new(mapper),
            concurrency,
            prefetch,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T, R, F> Publisher<R> for FlatMap<T, R, F>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Source<R> + Send + Sync + 'static,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<R>>) {
        if self.concurrency == 0 || self.prefetch == 0 {
            reject(
                subscriber,
                FluxError::InvalidArgument(format!(
                    "flat_map needs a positive concurrency and prefetch, got {} and {}",
                    self.concurrency, self.prefetch
                )),
            );
            return;
        }

        self.source.subscribe(Arc::new_cyclic(|me| MergeCore {
            me: me.clone(),
            downstream: subscriber,
            link: StageLink::new(),
            mapper: self.mapper.clone(),
            concurrency: self.concurrency,
            prefetch: self.prefetch,
            demand: Demand::new(),
            wip: Wip::new(),
            state: Mutex::new(MergeState {
                queue: VecDeque::new(),
                inners: Slab::new(self.concurrency.min(64)),
                upstream_done: false,
                failed: false,
                error: None,
            }),
        }));
    }
}

struct MergeState<T, R, F> {
    queue: VecDeque<(Weak<InnerSubscriber<T, R, F>>, R)>,
    inners: Slab<Arc<InnerSubscriber<T, R, F>>>,
    upstream_done: bool,
    /// Set with the first error and never cleared, even once the drain
    /// loop has taken `error` to deliver it.
    failed: bool,
    /// First error seen; later ones are dropped.
    error: Option<FluxError>,
}

enum Step<T, R, F> {
    Next(Weak<InnerSubscriber<T, R, F>>, R),
    Error(FluxError),
    Complete,
    Idle,
}

/// Merge point of a `flat_map`.
///
/// Subscribes upstream as the outer subscriber and acts as the downstream
/// subscription. All inner elements go through one queue, drained by a
/// single thread at a time.
struct MergeCore<T, R, F> {
    me: Weak<MergeCore<T, R, F>>,
    downstream: Arc<dyn Subscriber<R>>,
    link: StageLink,
    mapper: Arc<F>,
    concurrency: usize,
    prefetch: u64,
    demand: Demand,
    wip: Wip,
    state: Mutex<MergeState<T, R, F>>,
}

impl<T, R, F> MergeCore<T, R, F>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Source<R> + Send + Sync + 'static,
{
    fn spawn_inner(&self, publisher: Source<R>) {
        let inner = {
            let mut state = self.state.lock();

            if state.failed || self.link.is_done() {
                return;
            }

            let inner = Arc::new_cyclic(|me| InnerSubscriber {
                me: me.clone(),
                parent: self.me.clone(),
                key: state.inners.vacant_key(),
                upstream: UpstreamSlot::new(),
                prefetch: self.prefetch,
                done: AtomicBool::new(false),
            });

            state.inners.insert(inner.clone());
            tracing::trace!(active = state.inners.len(), "flat_map inner subscribed");
            inner
        };

        publisher.subscribe(inner);
    }

    fn inner_next(&self, inner: Weak<InnerSubscriber<T, R, F>>, item: R) {
        self.state.lock().queue.push_back((inner, item));
        self.drain();
    }

    fn inner_complete(&self, key: usize) {
        let replenish = {
            let mut state = self.state.lock();
            state.inners.remove(key);
            !state.upstream_done && !state.failed
        };

        if replenish && self.concurrency != usize::MAX {
            self.link.upstream.request(1);
        }

        self.drain();
    }

    /// Records `error` if it is the first one, then cancels upstream and
    /// every inner sequence.
    fn record_error(&self, error: FluxError) {
        let inners = {
            let mut state = self.state.lock();

            if state.failed || self.link.is_done() {
                tracing::debug!(%error, "flat_map dropped a later error");
                return;
            }

            tracing::debug!(%error, "flat_map failed, cancelling upstream and inners");
            state.failed = true;
            state.error = Some(error);
            state.queue.clear();
            state.inners.drain()
        };

        self.link.upstream.cancel();

        for inner in inners {
            inner.cancel();
        }

        self.drain();
    }

    fn cancel_all(&self) {
        let inners = {
            let mut state = self.state.lock();
            state.queue.clear();
            state.inners.drain()
        };

        self.link.upstream.cancel();

        for inner in inners {
            inner.cancel();
        }
    }

    fn drain(&self) {
        if !self.wip.enter() {
            return;
        }

        let mut missed = 1;

        loop {
            let requested = self.demand.get();
            let mut emitted = 0u64;

            loop {
                if self.link.lifecycle.is_terminated() {
                    self.cancel_all();
                    return;
                }

                match self.step(emitted < requested) {
                    Step::Next(inner, item) => {
                        self.downstream.on_next(item);
                        emitted += 1;

                        if let Some(inner) = inner.upgrade() {
                            inner.upstream.request(1);
                        }
                    }
                    Step::Error(error) => {
                        if self.link.lifecycle.error() {
                            self.downstream.on_error(error);
                        }
                        return;
                    }
                    Step::Complete => {
                        if self.link.lifecycle.complete() {
                            self.downstream.on_complete();
                        }
                        return;
                    }
                    Step::Idle => break,
                }
            }

            if emitted > 0 {
                self.demand.produced(emitted);
            }

            missed = self.wip.leave(missed);

            if missed == 0 {
                break;
            }
        }
    }

    fn step(&self, can_emit: bool) -> Step<T, R, F> {
        let mut state = self.state.lock();

        if let Some(error) = state.error.take() {
            return Step::Error(error);
        }

        if can_emit {
            if let Some((inner, item)) = state.queue.pop_front() {
                return Step::Next(inner, item);
            }
        }

        if state.upstream_done && state.queue.is_empty() && state.inners.is_empty() {
            Step::Complete
        } else {
            Step::Idle
        }
    }
}

impl<T, R, F> Subscriber<T> for MergeCore<T, R, F>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Source<R> + Send + Sync + 'static,
{
    fn on_subscribe(self: Arc<Self>, subscription: Arc<dyn Subscription>) {
        if !self.link.attach(subscription) {
            return;
        }

        self.downstream.clone().on_subscribe(self.clone());

        let initial = u64::try_from(self.concurrency).unwrap_or(UNBOUNDED);
        self.link.upstream.request(initial);
    }

    fn on_next(&self, item: T) {
        if self.link.is_done() {
            return;
        }

        match catch_fault("flat_map", || (self.mapper)(item)) {
            Ok(publisher) => self.spawn_inner(publisher),
            Err(error) => self.record_error(error),
        }
    }

    fn on_error(&self, error: FluxError) {
        self.link.upstream.release();
        self.record_error(error);
    }

    fn on_complete(&self) {
        self.state.lock().upstream_done = true;
        self.link.upstream.release();
        self.drain();
    }
}

impl<T, R, F> Subscription for MergeCore<T, R, F>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Source<R> + Send + Sync + 'static,
{
    fn request(&self, n: u64) {
        if n == 0 {
            self.record_error(FluxError::InvalidDemand(0));
            return;
        }

        self.demand.add(n);
        self.drain();
    }

    fn cancel(&self) {
        if self.link.lifecycle.cancel() {
            tracing::trace!("flat_map cancelled");
        }

        self.cancel_all();
    }
}

/// Subscriber of one inner sequence.
struct InnerSubscriber<T, R, F> {
    me: Weak<InnerSubscriber<T, R, F>>,
    parent: Weak<MergeCore<T, R, F>>,
    key: usize,
    upstream: UpstreamSlot,
    prefetch: u64,
    done: AtomicBool,
}

impl<T, R, F> InnerSubscriber<T, R, F> {
    fn cancel(&self) {
        self.done.store(true, Ordering::Release);
        self.upstream.cancel();
    }
}

impl<T, R, F> Subscriber<R> for InnerSubscriber<T, R, F>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Source<R> + Send + Sync + 'static,
{
    fn on_subscribe(self: Arc<Self>, subscription: Arc<dyn Subscription>) {
        if self.upstream.set(subscription) {
            self.upstream.request(self.prefetch);
        }
    }

    fn on_next(&self, item: R) {
        if self.done.load(Ordering::Acquire) {
            return;
        }

        if let Some(parent) = self.parent.upgrade() {
            parent.inner_next(self.me.clone(), item);
        }
    }

    fn on_error(&self, error: FluxError) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }

        self.upstream.release();

        if let Some(parent) = self.parent.upgrade() {
            parent.record_error(error);
        }
    }

    fn on_complete(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }

        self.upstream.release();

        if let Some(parent) = self.parent.upgrade() {
            parent.inner_complete(self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Flux;
    use crate::testing::TestSubscriber;
    use crate::time::VirtualClock;

    use std::time::Duration;

    #[test]
    fn no_inner_starts_while_the_error_is_being_delivered() {
        let clock = VirtualClock::new();
        let downstream = TestSubscriber::<u64>::new();

        let core = Arc::new_cyclic(|me| MergeCore {
            me: me.clone(),
            downstream: downstream.clone(),
            link: StageLink::new(),
            mapper: Arc::new(|tick: u64| Flux::just([tick]).into_publisher()),
            concurrency: 4,
            prefetch: 1,
            demand: Demand::new(),
            wip: Wip::new(),
            state: Mutex::new(MergeState {
                queue: VecDeque::new(),
                inners: Slab::new(4),
                upstream_done: false,
                failed: true,
                error: Some(FluxError::upstream("inner failed")),
            }),
        });

        // The drain loop has taken the error but not yet moved the
        // lifecycle to its terminal state.
        assert!(matches!(core.step(true), Step::Error(_)));
        assert!(!core.link.is_done());

        core.spawn_inner(Flux::interval(Duration::from_secs(1), clock.clone()).into_publisher());

        assert!(core.state.lock().inners.is_empty());
        assert_eq!(clock.pending(), 0);
    }
}
