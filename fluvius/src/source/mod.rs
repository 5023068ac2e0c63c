//! Source publishers.
//!
//! Sources sit at the head of a pipeline. They are reached through the
//! `Flux` and `Mono` constructors rather than used directly.

mod interval;
mod iter;
mod scalar;

pub(crate) use interval::IntervalSource;
pub(crate) use iter::{BoxIter, IterSource};
pub(crate) use scalar::{ErrorSource, SupplierSource};
