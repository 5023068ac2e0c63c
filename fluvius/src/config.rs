//! Operator defaults.
//!
//! Scheduler configuration lives in [`SchedulerBuilder`](crate::scheduler::SchedulerBuilder);
//! the constants here are what operators fall back to when called without
//! explicit tuning.

/// Inner sequences a `flat_map` runs at once.
pub const DEFAULT_CONCURRENCY: usize = 256;

/// Elements requested up front from each `flat_map` inner sequence.
pub const DEFAULT_PREFETCH: u64 = 32;
