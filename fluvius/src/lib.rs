//! # Fluvius
//!
//! **Fluvius** is a backpressure-aware reactive-stream engine for Rust, the
//! stream processing layer of the **Nebula** ecosystem.
//!
//! A pipeline is built from a source ([`Flux`] for `0..N` elements, [`Mono`]
//! for at most one) and a chain of operators. Nothing runs until a
//! subscriber attaches; from then on the subscriber drives the pipeline by
//! requesting elements, and no stage ever emits more than was requested.
//!
//! Fluvius offers:
//!
//! - A **demand protocol** with saturating, lock-free accounting and
//!   exactly-once terminal signals
//! - **Sources** over collections, single-use iterators, ranges and timers
//! - **Operators** for filtering, transforming, merging (`flat_map`),
//!   windowing, time shifting and aggregation
//! - **Schedulers**, from inline execution to a bounded work-stealing pool
//! - **Clocks**, real or virtual, so timed operators are testable
//!   deterministically
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fluvius::Flux;
//! use std::time::Duration;
//!
//! fn main() {
//!     let total = Flux::range(1, 10)
//!         .filter(|n| n % 2 == 0)
//!         .map(|n| n * n)
//!         .collect_list()
//!         .block(Duration::from_secs(1));
//!
//!     assert_eq!(total, Ok(Some(vec![4, 16, 36, 64, 100])));
//! }
//! ```
//!
//! ## Modules
//!
//! - [`core`] — Publisher, subscriber and subscription contract
//! - [`scheduler`] — Execution contexts and the scheduler registry
//! - [`time`] — Clocks, timers and periodic scheduling
//! - [`testing`] — A recording subscriber for tests
//! - [`config`] — Operator defaults
//!
//! ## Getting Started
//!
//! Add Fluvius to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! fluvius = { git = "https://github.com/Nebula-ecosystem/Fluvius", package = "fluvius" }
//! ```

mod flux;
mod mono;
mod operator;
mod source;
mod subscriber;
mod utils;

pub mod config;
pub mod core;
pub mod error;
pub mod scheduler;
pub mod testing;
pub mod time;

pub use crate::core::{Publisher, Signal, Subscriber, Subscription, UNBOUNDED};
pub use error::FluxError;
pub use flux::Flux;
pub use mono::Mono;
pub use subscriber::Disposable;
