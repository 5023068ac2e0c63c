//! The bounded-parallel scheduler.
//!
//! It is composed of:
//! - [`core`]: the pool itself and its lifecycle,
//! - [`worker`]: worker threads running work with stealing.

pub(crate) mod core;
pub(crate) mod worker;
