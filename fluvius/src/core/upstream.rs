use super::Subscription;

use parking_lot::Mutex;
use std::sync::Arc;

/// Holder of a stage's upstream subscription.
///
/// Requests made before the subscription arrives are accumulated and
/// forwarded once it is set. A subscription arriving after `cancel` is
/// cancelled on the spot, as is a second subscription.
pub(crate) struct UpstreamSlot {
    inner: Mutex<SlotState>,
}

struct SlotState {
    subscription: Option<Arc<dyn Subscription>>,
    pending: u64,
    cancelled: bool,
}

impl UpstreamSlot {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(SlotState {
                subscription: None,
                pending: 0,
                cancelled: false,
            }),
        }
    }

    /// Stores the upstream subscription. Returns `false` if it was rejected.
    pub(crate) fn set(&self, subscription: Arc<dyn Subscription>) -> bool {
        let mut state = self.inner.lock();

        if state.cancelled || state.subscription.is_some() {
            drop(state);
            subscription.cancel();
            return false;
        }

        state.subscription = Some(subscription.clone());
        let pending = std::mem::take(&mut state.pending);
        drop(state);

        if pending > 0 {
            subscription.request(pending);
        }

        true
    }

    pub(crate) fn request(&self, n: u64) {
        let mut state = self.inner.lock();

        if state.cancelled {
            return;
        }

        match state.subscription.clone() {
            Some(subscription) => {
                drop(state);
                subscription.request(n);
            }
            None => {
                state.pending = state.pending.saturating_add(n);
            }
        }
    }

    pub(crate) fn cancel(&self) {
        let subscription = {
            let mut state = self.inner.lock();
            state.cancelled = true;
            state.subscription.take()
        };

        if let Some(subscription) = subscription {
            subscription.cancel();
        }
    }

    /// `true` once cancelled or released.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.inner.lock().cancelled
    }

    /// Forgets the subscription without cancelling it (upstream terminated).
    pub(crate) fn release(&self) {
        let mut state = self.inner.lock();
        state.cancelled = true;
        state.subscription = None;
    }
}
