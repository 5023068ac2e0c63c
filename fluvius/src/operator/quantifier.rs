use super::{Source, StageLink};
use crate::core::demand::UNBOUNDED;
use crate::core::scalar::DeferredScalar;
use crate::core::{Publisher, Subscriber, Subscription};
use crate::error::{FluxError, catch_fault};

use std::sync::Arc;

/// Which quantifier a [`Quantifier`] evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Quantify {
    All,
    Any,
}

impl Quantify {
    fn operator(self) -> &'static str {
        match self {
            Quantify::All => "all",
            Quantify::Any => "any",
        }
    }

    /// The predicate outcome that decides the result early.
    fn decisive(self) -> bool {
        matches!(self, Quantify::Any)
    }
}

/// `all` and `any`.
///
/// The first decisive element produces the result and cancels upstream,
/// so the predicate is not evaluated for the rest of the sequence.
pub(crate) struct Quantifier<T, P> {
    source: Source<T>,
    kind: Quantify,
    predicate: Arc<P>,
}

impl<T, P> Quantifier<T, P> {
    pub(crate) fn new(source: Source<T>, kind: Quantify, predicate: P) -> Self {
        Self {
            source,
            kind,
            predicate: Arc::new(predicate),
        }
    }
}

impl<T, P> Publisher<bool> for Quantifier<T, P>
where
    T: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<bool>>) {
        self.source.subscribe(Arc::new(QuantifierSubscriber {
            scalar: DeferredScalar::new(subscriber),
            link: StageLink::new(),
            kind: self.kind,
            predicate: self.predicate.clone(),
            _marker: std::marker::PhantomData,
        }));
    }
}

struct QuantifierSubscriber<T, P> {
    scalar: DeferredScalar<bool>,
    link: StageLink,
    kind: Quantify,
    predicate: Arc<P>,
    _marker: std::marker::PhantomData<fn(T)>,
}

impl<T, P> Subscriber<T> for QuantifierSubscriber<T, P>
where
    T: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
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

        match catch_fault(self.kind.operator(), || (self.predicate)(&item)) {
            Ok(outcome) if outcome == self.kind.decisive() => {
                if self.link.lifecycle.complete() {
                    tracing::trace!(operator = self.kind.operator(), "short-circuit");
                    self.link.upstream.cancel();
                    self.scalar.complete_with(outcome);
                }
            }
            Ok(_) => {}
            Err(error) => {
                if self.link.lifecycle.error() {
                    self.link.upstream.cancel();
                    self.scalar.error(error);
                }
            }
        }
    }

    fn on_error(&self, error: FluxError) {
        if self.link.lifecycle.error() {
            self.link.upstream.release();
            self.scalar.error(error);
        }
    }

    fn on_complete(&self) {
        if self.link.lifecycle.complete() {
            self.link.upstream.release();
            self.scalar.complete_with(!self.kind.decisive());
        }
    }
}

impl<T, P> Subscription for QuantifierSubscriber<T, P>
where
    T: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    fn request(&self, n: u64) {
        if n == 0 {
            self.link.lifecycle.error();
            self.link.upstream.cancel();
            self.scalar.error(FluxError::InvalidDemand(0));
        } else {
            self.scalar.on_request();
        }
    }

    fn cancel(&self) {
        Subscription::cancel(&self.scalar);
        self.link.cancel();
    }
}
