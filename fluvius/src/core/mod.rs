//! The publisher/subscriber contract.
//!
//! This module defines the three roles every stage of a pipeline plays:
//!
//! - a [`Publisher`] produces a sequence for each subscriber that attaches,
//! - a [`Subscriber`] consumes it,
//! - a [`Subscription`] carries demand upstream and cancellation.
//!
//! Values, completion and errors flow downstream through the subscriber
//! callbacks; demand flows upstream through [`Subscription::request`].
//! A publisher never emits more elements than were requested, and a
//! terminated sequence never signals again.
//!
//! The remaining submodules are the building blocks stages share:
//! demand accounting, the lifecycle state machine, the upstream slot,
//! the serializing wrapper and the deferred scalar emitter.

pub(crate) mod demand;
pub(crate) mod scalar;
pub(crate) mod serialized;
pub(crate) mod state;
pub(crate) mod upstream;

use crate::error::FluxError;

use std::sync::Arc;

pub use demand::UNBOUNDED;

/// Source of a sequence.
///
/// Publishers are cold: every call to [`subscribe`](Self::subscribe)
/// starts an independent sequence for that subscriber.
pub trait Publisher<T>: Send + Sync {
    /// Attaches `subscriber` and starts its sequence.
    ///
    /// The publisher calls [`Subscriber::on_subscribe`] exactly once,
    /// then signals elements only as demand allows.
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>);
}

/// Consumer of a sequence.
///
/// Signals for one subscription are never delivered concurrently.
pub trait Subscriber<T>: Send + Sync {
    /// Receives the subscription that controls this sequence.
    fn on_subscribe(self: Arc<Self>, subscription: Arc<dyn Subscription>);

    /// Receives the next element.
    fn on_next(&self, item: T);

    /// Receives the terminal error.
    fn on_error(&self, error: FluxError);

    /// Receives the terminal completion.
    fn on_complete(&self);
}

/// Demand and cancellation channel between one publisher and one subscriber.
pub trait Subscription: Send + Sync {
    /// Adds `n` to the outstanding demand.
    ///
    /// Demand saturates at [`UNBOUNDED`]. `request(0)` is a protocol
    /// violation and terminates the sequence with
    /// [`FluxError::InvalidDemand`].
    fn request(&self, n: u64);

    /// Stops the sequence and releases its resources.
    ///
    /// Idempotent; no signal is delivered once `cancel` has returned,
    /// except for emissions that were already in flight.
    fn cancel(&self);
}

/// A signal travelling downstream.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal<T> {
    Next(T),
    Error(FluxError),
    Complete,
}

impl<T> Signal<T> {
    /// Returns `true` for completion and error.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Signal::Next(_))
    }

    /// Delivers this signal to `subscriber`.
    pub(crate) fn deliver(self, subscriber: &dyn Subscriber<T>) {
        match self {
            Signal::Next(item) => subscriber.on_next(item),
            Signal::Error(error) => subscriber.on_error(error),
            Signal::Complete => subscriber.on_complete(),
        }
    }
}

/// Subscription of a sequence that terminated before it started.
pub(crate) struct EmptySubscription;

impl Subscription for EmptySubscription {
    fn request(&self, _n: u64) {}

    fn cancel(&self) {}
}

/// Signals `error` to a subscriber that has not been subscribed yet.
pub(crate) fn reject<T>(subscriber: Arc<dyn Subscriber<T>>, error: FluxError) {
    subscriber.clone().on_subscribe(Arc::new(EmptySubscription));
    subscriber.on_error(error);
}
