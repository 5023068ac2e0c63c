use super::{Source, StageLink};
use crate::core::{Publisher, Subscriber, Subscription};
use crate::error::FluxError;

use std::fmt::Debug;
use std::sync::Arc;

/// Passes every signal through unchanged, recording it as a `tracing`
/// event under the `fluvius::log` target.
pub(crate) struct Log<T> {
    source: Source<T>,
    category: Arc<str>,
}

impl<T> Log<T> {
    pub(crate) fn new(source: Source<T>, category: &str) -> Self {
        Self {
            source,
            category: Arc::from(category),
        }
    }
}

impl<T: Debug + Send + 'static> Publisher<T> for Log<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        self.source.subscribe(Arc::new(LogSubscriber {
            downstream: subscriber,
            link: StageLink::new(),
            category: self.category.clone(),
        }));
    }
}

struct LogSubscriber<T> {
    downstream: Arc<dyn Subscriber<T>>,
    link: StageLink,
    category: Arc<str>,
}

impl<T: Debug + Send + 'static> Subscriber<T> for LogSubscriber<T> {
    fn on_subscribe(self: Arc<Self>, subscription: Arc<dyn Subscription>) {
        tracing::info!(target: "fluvius::log", category = %self.category, "on_subscribe");

        if self.link.attach(subscription) {
            self.downstream.clone().on_subscribe(self);
        }
    }

    fn on_next(&self, item: T) {
        tracing::info!(target: "fluvius::log", category = %self.category, ?item, "on_next");
        self.downstream.on_next(item);
    }

    fn on_error(&self, error: FluxError) {
        tracing::info!(target: "fluvius::log", category = %self.category, %error, "on_error");
        self.link.forward_error(self.downstream.as_ref(), error);
    }

    fn on_complete(&self) {
        tracing::info!(target: "fluvius::log", category = %self.category, "on_complete");
        self.link.forward_complete(self.downstream.as_ref());
    }
}

impl<T: Debug + Send + 'static> Subscription for LogSubscriber<T> {
    fn request(&self, n: u64) {
        tracing::info!(target: "fluvius::log", category = %self.category, n, "request");
        self.link.request(self.downstream.as_ref(), n);
    }

    fn cancel(&self) {
        tracing::info!(target: "fluvius::log", category = %self.category, "cancel");
        self.link.cancel();
    }
}
