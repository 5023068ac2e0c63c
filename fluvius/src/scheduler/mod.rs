//! Execution contexts.
//!
//! A [`Scheduler`] runs work items on some execution context. Operators
//! such as `subscribe_on` and `publish_on` use one to move part of a
//! pipeline off the calling thread.
//!
//! It includes:
//! - [`ImmediateScheduler`], which runs work inline,
//! - [`ParallelScheduler`], a bounded work-stealing worker pool built with
//!   [`SchedulerBuilder`],
//! - [`SchedulerRegistry`], which resolves contexts by name.
//!
//! Schedulers are plain values handed to the operators that need them;
//! there is no process-wide default pool.

mod builder;
mod context;
mod executor;
mod registry;
mod work_stealing;

pub use builder::SchedulerBuilder;
pub use executor::core::ParallelScheduler;
pub use registry::{BOUNDED_PARALLEL, IMMEDIATE, SchedulerRegistry};

use crate::error::FluxError;

/// A unit of work submitted to a scheduler.
pub type Work = Box<dyn FnOnce() + Send>;

/// A named execution context.
pub trait Scheduler: Send + Sync {
    /// Name under which the context is known.
    fn name(&self) -> &str;

    /// Submits `work` for execution.
    ///
    /// Returns [`FluxError::SchedulerShutdown`] if the context no longer
    /// accepts work.
    fn schedule(&self, work: Work) -> Result<(), FluxError>;

    /// Returns `true` when called from a thread owned by this context.
    fn is_current(&self) -> bool {
        false
    }
}

/// Runs every work item inline, on the submitting thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
    fn name(&self) -> &str {
        IMMEDIATE
    }

    fn schedule(&self, work: Work) -> Result<(), FluxError> {
        work();
        Ok(())
    }

    fn is_current(&self) -> bool {
        true
    }
}
