use crate::core::demand::{Demand, Wip};
use crate::core::state::Lifecycle;
use crate::core::{Publisher, Subscriber, Subscription, reject};
use crate::error::{FluxError, catch_fault};

use parking_lot::Mutex;
use std::iter::Peekable;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Iterator driving one subscription of an [`IterSource`].
pub(crate) type BoxIter<T> = Box<dyn Iterator<Item = Result<T, FluxError>> + Send>;

type Factory<T> = dyn Fn() -> Result<BoxIter<T>, FluxError> + Send + Sync;

/// Source emitting the elements of an iterator.
///
/// Every subscription asks the factory for a fresh iterator, so sources
/// built over collections can be subscribed any number of times while
/// single-use sources fail the second subscription from the factory.
pub(crate) struct IterSource<T> {
    factory: Box<Factory<T>>,
}

impl<T: Send + 'static> IterSource<T> {
    pub(crate) fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<BoxIter<T>, FluxError> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
        }
    }
}

impl<T: Send + 'static> Publisher<T> for IterSource<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let iter = match (self.factory)() {
            Ok(iter) => iter,
            Err(error) => {
                reject(subscriber, error);
                return;
            }
        };

        let subscription = Arc::new(IterSubscription {
            iter: Mutex::new(iter.peekable()),
            downstream: subscriber.clone(),
            demand: Demand::new(),
            wip: Wip::new(),
            lifecycle: Lifecycle::new(),
            invalid_request: AtomicBool::new(false),
        });

        subscription.lifecycle.activate();
        subscriber.on_subscribe(subscription.clone());

        // Completes an empty source without waiting for demand.
        subscription.drain();
    }
}

enum Step<T> {
    Item(T),
    Failed(FluxError),
    Exhausted,
    Wait,
}

struct IterSubscription<T> {
    iter: Mutex<Peekable<BoxIter<T>>>,
    downstream: Arc<dyn Subscriber<T>>,
    demand: Demand,
    wip: Wip,
    lifecycle: Lifecycle,
    invalid_request: AtomicBool,
}

impl<T: Send + 'static> IterSubscription<T> {
    fn drain(&self) {
        if !self.wip.enter() {
            return;
        }

        let mut missed = 1;

        loop {
            let requested = self.demand.get();
            let mut emitted = 0u64;

            loop {
                if self.lifecycle.is_terminated() {
                    return;
                }

                if self.invalid_request.load(Ordering::Acquire) {
                    self.fail(FluxError::InvalidDemand(0));
                    return;
                }

                match self.step(emitted < requested) {
                    Step::Item(item) => {
                        self.downstream.on_next(item);
                        emitted += 1;
                    }
                    Step::Failed(error) => {
                        self.fail(error);
                        return;
                    }
                    Step::Exhausted => {
                        if self.lifecycle.complete() {
                            self.downstream.on_complete();
                        }
                        return;
                    }
                    Step::Wait => break,
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

    /// Looks at the next element and takes it if it may be emitted.
    ///
    /// Errors and exhaustion are reported regardless of demand.
    fn step(&self, can_emit: bool) -> Step<T> {
        let mut iter = self.iter.lock();

        let peeked = catch_fault("iterator", || match iter.peek() {
            None => Peeked::End,
            Some(Err(_)) => Peeked::Failure,
            Some(Ok(_)) => Peeked::Element,
        });

        match peeked {
            Err(fault) => Step::Failed(FluxError::upstream(fault.to_string())),
            Ok(Peeked::End) => Step::Exhausted,
            Ok(Peeked::Element) if !can_emit => Step::Wait,
            Ok(_) => match iter.next() {
                Some(Ok(item)) => Step::Item(item),
                Some(Err(error)) => Step::Failed(error),
                None => Step::Exhausted,
            },
        }
    }

    fn fail(&self, error: FluxError) {
        if self.lifecycle.error() {
            self.downstream.on_error(error);
        }
    }
}

enum Peeked {
    End,
    Failure,
    Element,
}

impl<T: Send + 'static> Subscription for IterSubscription<T> {
    fn request(&self, n: u64) {
        if n == 0 {
            self.invalid_request.store(true, Ordering::Release);
        } else {
            self.demand.add(n);
        }

        self.drain();
    }

    fn cancel(&self) {
        self.lifecycle.cancel();
    }
}
