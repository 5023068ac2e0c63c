//! Recording subscriber for tests.
//!
//! [`TestSubscriber`] records every signal it receives and checks the
//! protocol as it goes: no signal after a terminal one, no element beyond
//! the demand it issued, a single `on_subscribe`.
//!
//! ```rust,ignore
//! let probe = TestSubscriber::new();
//! Flux::range(1, 3).subscribe(probe.clone());
//!
//! assert_eq!(probe.values(), vec![1, 2, 3]);
//! assert!(probe.is_complete());
//! ```

use crate::core::demand::UNBOUNDED;
use crate::core::upstream::UpstreamSlot;
use crate::core::{Subscriber, Subscription};
use crate::error::FluxError;

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A subscriber recording what it receives.
pub struct TestSubscriber<T> {
    upstream: UpstreamSlot,
    initial_demand: u64,
    state: Mutex<Recorded<T>>,
    changed: Condvar,
}

struct Recorded<T> {
    values: Vec<T>,
    error: Option<FluxError>,
    complete: bool,
    subscribed: usize,
    requested: u64,
    signals: usize,
    violations: Vec<String>,
}

impl<T: Send + 'static> TestSubscriber<T> {
    /// Creates a subscriber requesting without bound on subscription.
    pub fn new() -> Arc<Self> {
        Self::with_demand(UNBOUNDED)
    }

    /// Creates a subscriber requesting `initial` elements on subscription.
    ///
    /// With `0` nothing is requested until [`request`](Self::request).
    pub fn with_demand(initial: u64) -> Arc<Self> {
        Arc::new(Self {
            upstream: UpstreamSlot::new(),
            initial_demand: initial,
            state: Mutex::new(Recorded {
                values: Vec::new(),
                error: None,
                complete: false,
                subscribed: 0,
                requested: 0,
                signals: 0,
                violations: Vec::new(),
            }),
            changed: Condvar::new(),
        })
    }

    /// Requests `n` more elements.
    pub fn request(&self, n: u64) {
        {
            let mut state = self.state.lock();
            state.requested = state.requested.saturating_add(n);
        }

        self.upstream.request(n);
    }

    pub fn cancel(&self) {
        self.upstream.cancel();
    }

    /// Waits until the sequence terminates. Returns `false` on timeout.
    pub fn await_terminal(&self, timeout: Duration) -> bool {
        self.await_until(timeout, |state| state.complete || state.error.is_some())
    }

    /// Waits until at least `count` elements arrived or the sequence
    /// terminated. Returns `false` on timeout.
    pub fn await_count(&self, count: usize, timeout: Duration) -> bool {
        self.await_until(timeout, |state| {
            state.values.len() >= count || state.complete || state.error.is_some()
        })
    }

    pub fn is_complete(&self) -> bool {
        self.state.lock().complete
    }

    pub fn is_terminated(&self) -> bool {
        let state = self.state.lock();
        state.complete || state.error.is_some()
    }

    pub fn error(&self) -> Option<FluxError> {
        self.state.lock().error.clone()
    }

    pub fn value_count(&self) -> usize {
        self.state.lock().values.len()
    }

    /// Total signals received, `on_subscribe` excluded.
    pub fn signal_count(&self) -> usize {
        self.state.lock().signals
    }

    /// Protocol violations observed so far.
    pub fn violations(&self) -> Vec<String> {
        self.state.lock().violations.clone()
    }

    fn await_until(&self, timeout: Duration, done: impl Fn(&Recorded<T>) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();

        while !done(&state) {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                return done(&state);
            }
        }

        true
    }

    fn record(&self, name: &str, apply: impl FnOnce(&mut Recorded<T>)) {
        let mut state = self.state.lock();

        if state.complete || state.error.is_some() {
            state.violations.push(format!("{name} after a terminal signal"));
        }

        state.signals += 1;
        apply(&mut state);
        drop(state);

        self.changed.notify_all();
    }
}

impl<T: Clone + Send + 'static> TestSubscriber<T> {
    /// Elements received so far.
    pub fn values(&self) -> Vec<T> {
        self.state.lock().values.clone()
    }
}

impl<T: Send + 'static> Subscriber<T> for TestSubscriber<T> {
    fn on_subscribe(self: Arc<Self>, subscription: Arc<dyn Subscription>) {
        {
            let mut state = self.state.lock();
            state.subscribed += 1;

            if state.subscribed > 1 {
                state.violations.push("on_subscribe called twice".to_owned());
            }
        }

        if self.upstream.set(subscription) && self.initial_demand > 0 {
            self.request(self.initial_demand);
        }
    }

    fn on_next(&self, item: T) {
        self.record("on_next", |state| {
            let received = u64::try_from(state.values.len()).unwrap_or(u64::MAX);

            if state.requested != UNBOUNDED && received >= state.requested {
                state.violations.push(format!(
                    "on_next beyond demand: {} requested",
                    state.requested
                ));
            }

            state.values.push(item);
        });
    }

    fn on_error(&self, error: FluxError) {
        self.record("on_error", |state| state.error = Some(error));
    }

    fn on_complete(&self) {
        self.record("on_complete", |state| state.complete = true);
    }
}
