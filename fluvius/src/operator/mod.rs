//! Operator stages.
//!
//! Each operator is a publisher wrapping the previous stage. Subscribing to
//! it subscribes an operator-specific subscriber upstream, which in turn
//! hands itself downstream as the subscription. Demand therefore travels
//! through every stage on its way to the source, and every stage can
//! cancel the part of the pipeline above it.

pub(crate) mod aggregate;
pub(crate) mod buffer;
pub(crate) mod delay;
pub(crate) mod distinct;
pub(crate) mod filter;
pub(crate) mod flat_map;
pub(crate) mod log;
pub(crate) mod map;
pub(crate) mod quantifier;
pub(crate) mod schedule;
pub(crate) mod skip;
pub(crate) mod take;

use crate::core::state::Lifecycle;
use crate::core::upstream::UpstreamSlot;
use crate::core::{Publisher, Subscriber, Subscription};
use crate::error::FluxError;

use std::sync::Arc;

/// The stage an operator subscribes to.
pub(crate) type Source<T> = Arc<dyn Publisher<T>>;

/// Upstream side of a stage: its subscription and its lifecycle.
///
/// Every terminal path goes through the lifecycle first, so a stage
/// signals at most one terminal event downstream whatever thread races it.
pub(crate) struct StageLink {
    pub(crate) upstream: UpstreamSlot,
    pub(crate) lifecycle: Lifecycle,
}

impl StageLink {
    pub(crate) fn new() -> Self {
        Self {
            upstream: UpstreamSlot::new(),
            lifecycle: Lifecycle::new(),
        }
    }

    /// Stores the upstream subscription. `false` means the stage must not
    /// subscribe downstream.
    pub(crate) fn attach(&self, subscription: Arc<dyn Subscription>) -> bool {
        if self.upstream.set(subscription) {
            self.lifecycle.activate();
            true
        } else {
            false
        }
    }

    pub(crate) fn is_done(&self) -> bool {
        self.lifecycle.is_terminated()
    }

    /// Fails the stage: cancels upstream and signals `error`.
    pub(crate) fn fail<T>(&self, downstream: &dyn Subscriber<T>, error: FluxError) {
        if self.lifecycle.error() {
            tracing::debug!(%error, "stage failed, cancelling upstream");
            self.upstream.cancel();
            downstream.on_error(error);
        }
    }

    /// Relays an error received from upstream.
    pub(crate) fn forward_error<T>(&self, downstream: &dyn Subscriber<T>, error: FluxError) {
        if self.lifecycle.error() {
            self.upstream.release();
            downstream.on_error(error);
        }
    }

    /// Relays completion received from upstream.
    pub(crate) fn forward_complete<T>(&self, downstream: &dyn Subscriber<T>) {
        if self.lifecycle.complete() {
            self.upstream.release();
            downstream.on_complete();
        }
    }

    /// Completes before upstream did, cancelling it.
    pub(crate) fn complete_early<T>(&self, downstream: &dyn Subscriber<T>) {
        if self.lifecycle.complete() {
            self.upstream.cancel();
            downstream.on_complete();
        }
    }

    /// Forwards downstream demand, rejecting `request(0)`.
    pub(crate) fn request<T>(&self, downstream: &dyn Subscriber<T>, n: u64) {
        if n == 0 {
            self.fail(downstream, FluxError::InvalidDemand(0));
        } else if !self.is_done() {
            self.upstream.request(n);
        }
    }

    pub(crate) fn cancel(&self) {
        if self.lifecycle.cancel() {
            tracing::trace!("stage cancelled");
        }

        self.upstream.cancel();
    }
}
