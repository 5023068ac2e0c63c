//! Error signals carried by a sequence.
//!
//! Every failure that terminates a sequence is represented by a
//! [`FluxError`]. Errors fall into two families:
//!
//! - **upstream** errors, raised by a source (an iterator yielding `Err`,
//!   a single-use source subscribed twice),
//! - **operator** errors, raised by a user function while a stage
//!   processes an element (a mapper or predicate that fails or panics).
//!
//! Both families travel the same way: upstream is cancelled, the error is
//! delivered downstream exactly once, and nothing follows it.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use thiserror::Error;

/// Terminal error of a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FluxError {
    /// A source failed to produce its next element.
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// A user function failed while an operator processed an element.
    #[error("operator `{operator}` failed: {message}")]
    Operator {
        /// Name of the stage that ran the function.
        operator: &'static str,
        /// Failure description.
        message: String,
    },

    /// A single-use source was subscribed more than once.
    #[error("source can only be subscribed once")]
    SourceConsumed,

    /// `request` was called with a non-positive amount.
    #[error("request({0}) is invalid: demand must be positive")]
    InvalidDemand(u64),

    /// An operator was built with an argument it cannot honour.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A blocking bridge gave up waiting.
    #[error("no terminal signal within {0:?}")]
    Timeout(Duration),

    /// Work was submitted to a scheduler that already shut down.
    #[error("scheduler `{0}` is shut down")]
    SchedulerShutdown(String),
}

impl FluxError {
    /// Builds an [`Upstream`](Self::Upstream) error.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    /// Builds an [`Operator`](Self::Operator) error.
    pub fn operator(operator: &'static str, message: impl Into<String>) -> Self {
        Self::Operator {
            operator,
            message: message.into(),
        }
    }

    /// Returns `true` for failures raised by a source.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream(_) | Self::SourceConsumed)
    }

    /// Returns `true` for failures raised by a user function.
    pub fn is_operator(&self) -> bool {
        matches!(self, Self::Operator { .. })
    }
}

/// Runs a user function, turning a panic into an operator error.
pub(crate) fn catch_fault<R>(operator: &'static str, f: impl FnOnce() -> R) -> Result<R, FluxError> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .map_err(|payload| FluxError::operator(operator, panic_message(payload.as_ref())))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panicked".to_owned()
    }
}
