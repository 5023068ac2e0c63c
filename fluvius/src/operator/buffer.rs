use super::{Source, StageLink};
use crate::core::{Publisher, Subscriber, Subscription, reject};
use crate::error::FluxError;

use parking_lot::Mutex;
use std::sync::Arc;

/// Groups elements into windows of `size`.
///
/// A request for `k` windows becomes a request for `k * size` elements.
/// The last window may be shorter; an empty one is never emitted.
pub(crate) struct Buffer<T> {
    source: Source<T>,
    size: usize,
}

impl<T> Buffer<T> {
    pub(crate) fn new(source: Source<T>, size: usize) -> Self {
        Self { source, size }
    }
}

impl<T: Send + 'static> Publisher<Vec<T>> for Buffer<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<Vec<T>>>) {
        if self.size == 0 {
            reject(
                subscriber,
                FluxError::InvalidArgument("buffer size must be positive".to_owned()),
            );
            return;
        }

        self.source.subscribe(Arc::new(BufferSubscriber {
            downstream: subscriber,
            link: StageLink::new(),
            size: self.size,
            window: Mutex::new(Vec::with_capacity(self.size)),
        }));
    }
}

struct BufferSubscriber<T> {
    downstream: Arc<dyn Subscriber<Vec<T>>>,
    link: StageLink,
    size: usize,
    window: Mutex<Vec<T>>,
}

impl<T: Send + 'static> Subscriber<T> for BufferSubscriber<T> {
    fn on_subscribe(self: Arc<Self>, subscription: Arc<dyn Subscription>) {
        if self.link.attach(subscription) {
            self.downstream.clone().on_subscribe(self);
        }
    }

    fn on_next(&self, item: T) {
        if self.link.is_done() {
            return;
        }

        let full = {
            let mut window = self.window.lock();
            window.push(item);

            if window.len() < self.size {
                return;
            }

            std::mem::replace(&mut *window, Vec::with_capacity(self.size))
        };

        self.downstream.on_next(full);
    }

    fn on_error(&self, error: FluxError) {
        self.window.lock().clear();
        self.link.forward_error(self.downstream.as_ref(), error);
    }

    fn on_complete(&self) {
        if self.link.is_done() {
            return;
        }

        let rest = std::mem::take(&mut *self.window.lock());

        if !rest.is_empty() {
            self.downstream.on_next(rest);
        }

        self.link.forward_complete(self.downstream.as_ref());
    }
}

impl<T: Send + 'static> Subscription for BufferSubscriber<T> {
    fn request(&self, n: u64) {
        let size = u64::try_from(self.size).unwrap_or(u64::MAX);
        self.link.request(self.downstream.as_ref(), n.saturating_mul(size));
    }

    fn cancel(&self) {
        self.link.cancel();
        self.window.lock().clear();
    }
}
