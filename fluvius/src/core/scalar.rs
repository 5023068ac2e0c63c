use super::{Subscriber, Subscription};
use crate::error::FluxError;

use parking_lot::Mutex;
use std::sync::Arc;

/// Emitter of a single result that may be ready before it is requested.
///
/// Whichever of "value ready" and "demand arrived" happens second
/// delivers the value followed by completion.
pub(crate) struct DeferredScalar<T> {
    downstream: Arc<dyn Subscriber<T>>,
    inner: Mutex<ScalarState<T>>,
}

struct ScalarState<T> {
    requested: bool,
    value: Option<T>,
    done: bool,
}

impl<T> DeferredScalar<T> {
    pub(crate) fn new(downstream: Arc<dyn Subscriber<T>>) -> Self {
        Self {
            downstream,
            inner: Mutex::new(ScalarState {
                requested: false,
                value: None,
                done: false,
            }),
        }
    }

    pub(crate) fn downstream(&self) -> &Arc<dyn Subscriber<T>> {
        &self.downstream
    }

    /// Records that the downstream asked for the value.
    pub(crate) fn on_request(&self) {
        let value = {
            let mut state = self.inner.lock();

            if state.done {
                return;
            }

            state.requested = true;

            match state.value.take() {
                Some(value) => {
                    state.done = true;
                    value
                }
                None => return,
            }
        };

        self.downstream.on_next(value);
        self.downstream.on_complete();
    }

    pub(crate) fn complete_with(&self, value: T) {
        {
            let mut state = self.inner.lock();

            if state.done || state.value.is_some() {
                return;
            }

            if !state.requested {
                state.value = Some(value);
                return;
            }

            state.done = true;
        }

        self.downstream.on_next(value);
        self.downstream.on_complete();
    }

    pub(crate) fn complete_empty(&self) {
        if self.finish() {
            self.downstream.on_complete();
        }
    }

    pub(crate) fn error(&self, error: FluxError) {
        if self.finish() {
            self.downstream.on_error(error);
        }
    }

    pub(crate) fn is_done(&self) -> bool {
        let state = self.inner.lock();
        state.done || state.value.is_some()
    }

    fn finish(&self) -> bool {
        let mut state = self.inner.lock();

        if state.done {
            return false;
        }

        state.done = true;
        state.value = None;
        true
    }
}

impl<T: Send> Subscription for DeferredScalar<T> {
    fn request(&self, n: u64) {
        if n == 0 {
            self.error(FluxError::InvalidDemand(0));
        } else {
            self.on_request();
        }
    }

    fn cancel(&self) {
        self.finish();
    }
}
