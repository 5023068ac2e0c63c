//! Terminal subscribers.
//!
//! These sit at the end of a pipeline: callback subscribers returning a
//! [`Disposable`], and the blocking bridge behind `Mono::block` and
//! `Flux::block_last`.

use crate::core::demand::UNBOUNDED;
use crate::core::upstream::UpstreamSlot;
use crate::core::{Publisher, Subscriber, Subscription};
use crate::error::{FluxError, catch_fault};

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::time::Duration;

/// Cancels the subscription it was returned for.
#[derive(Clone)]
pub struct Disposable {
    upstream: Arc<UpstreamSlot>,
}

impl Disposable {
    /// Cancels the sequence. Idempotent.
    pub fn dispose(&self) {
        self.upstream.cancel();
    }

    /// Returns `true` once disposed or terminated.
    pub fn is_disposed(&self) -> bool {
        self.upstream.is_cancelled()
    }
}

pub(crate) type OnNext<T> = Box<dyn Fn(T) + Send + Sync>;
pub(crate) type OnError = Box<dyn Fn(FluxError) + Send + Sync>;
pub(crate) type OnComplete = Box<dyn Fn() + Send + Sync>;

/// Subscriber built from callbacks, requesting without bound.
pub(crate) struct LambdaSubscriber<T> {
    upstream: Arc<UpstreamSlot>,
    next_fn: OnNext<T>,
    error_fn: Option<OnError>,
    complete_fn: Option<OnComplete>,
    done: AtomicBool,
}

impl<T: Send + 'static> LambdaSubscriber<T> {
    pub(crate) fn new(
        on_next: OnNext<T>,
        on_error: Option<OnError>,
        on_complete: Option<OnComplete>,
    ) -> Self {
        Self {
            upstream: Arc::new(UpstreamSlot::new()),
            next_fn: on_next,
            error_fn: on_error,
            complete_fn: on_complete,
            done: AtomicBool::new(false),
        }
    }

    /// Subscribes to `publisher` and returns the handle cancelling it.
    pub(crate) fn attach(self, publisher: &dyn Publisher<T>) -> Disposable {
        let disposable = Disposable {
            upstream: self.upstream.clone(),
        };

        publisher.subscribe(Arc::new(self));
        disposable
    }
}

impl<T: Send + 'static> Subscriber<T> for LambdaSubscriber<T> {
    fn on_subscribe(self: Arc<Self>, subscription: Arc<dyn Subscription>) {
        if self.upstream.set(subscription) {
            self.upstream.request(UNBOUNDED);
        }
    }

    fn on_next(&self, item: T) {
        if self.done.load(Ordering::Acquire) {
            return;
        }

        if let Err(error) = catch_fault("subscribe", || (self.next_fn)(item)) {
            self.upstream.cancel();
            self.on_error(error);
        }
    }

    fn on_error(&self, error: FluxError) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }

        self.upstream.release();

        match &self.error_fn {
            Some(callback) => callback(error),
            None => tracing::error!(%error, "sequence failed with no error callback"),
        }
    }

    fn on_complete(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }

        self.upstream.release();

        if let Some(callback) = &self.complete_fn {
            callback();
        }
    }
}

type Outcome<T> = Result<Option<T>, FluxError>;

/// Subscriber handing the last element (or the error) to a waiting thread.
struct BlockingSubscriber<T> {
    upstream: UpstreamSlot,
    last: Mutex<Option<T>>,
    transmitter: Mutex<Option<mpsc::Sender<Outcome<T>>>>,
}

impl<T: Send + 'static> BlockingSubscriber<T> {
    fn send(&self, outcome: Outcome<T>) {
        if let Some(transmitter) = self.transmitter.lock().take() {
            let _ = transmitter.send(outcome);
        }
    }
}

impl<T: Send + 'static> Subscriber<T> for BlockingSubscriber<T> {
    fn on_subscribe(self: Arc<Self>, subscription: Arc<dyn Subscription>) {
        if self.upstream.set(subscription) {
            self.upstream.request(UNBOUNDED);
        }
    }

    fn on_next(&self, item: T) {
        *self.last.lock() = Some(item);
    }

    fn on_error(&self, error: FluxError) {
        self.upstream.release();
        self.send(Err(error));
    }

    fn on_complete(&self) {
        self.upstream.release();
        let last = self.last.lock().take();
        self.send(Ok(last));
    }
}

/// Subscribes to `publisher` and waits up to `timeout` for it to terminate.
///
/// Returns the last element, `None` for an empty sequence, or the error.
/// On timeout the subscription is cancelled.
pub(crate) fn block_last<T: Send + 'static>(
    publisher: &dyn Publisher<T>,
    timeout: Duration,
) -> Result<Option<T>, FluxError> {
    let (transmitter, receiver) = mpsc::channel();

    let subscriber = Arc::new(BlockingSubscriber {
        upstream: UpstreamSlot::new(),
        last: Mutex::new(None),
        transmitter: Mutex::new(Some(transmitter)),
    });

    publisher.subscribe(subscriber.clone());

    match receiver.recv_timeout(timeout) {
        Ok(outcome) => outcome,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            subscriber.upstream.cancel();
            Err(FluxError::Timeout(timeout))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(FluxError::upstream(
            "sequence was dropped without terminating",
        )),
    }
}
