//! Work-stealing queues of the parallel scheduler.
//!
//! It consists of:
//! - [`injector`]: a global queue for work submitted from outside the pool,
//! - [`queue`]: per-worker local queues used for fast local execution and
//!   stealing.

pub(crate) mod injector;
pub(crate) mod queue;
