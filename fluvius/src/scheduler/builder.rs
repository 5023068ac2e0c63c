use super::executor::core::ParallelScheduler;

use std::sync::Arc;
use std::thread;

/// Builder for a [`ParallelScheduler`].
///
/// # Examples
///
/// ```rust,ignore
/// let parallel = SchedulerBuilder::new()
///     .worker_threads(4)
///     .name("parallel")
///     .build();
/// ```
pub struct SchedulerBuilder {
    /// Number of worker threads.
    worker_threads: usize,

    /// Prefix of the worker thread names.
    name: String,
}

impl SchedulerBuilder {
    /// Creates a builder with default configuration.
    ///
    /// By default, the number of worker threads is set to the number
    /// of available logical CPUs, falling back to `1` if unavailable.
    pub fn new() -> Self {
        let worker_threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            worker_threads,
            name: "parallel".to_owned(),
        }
    }

    /// Sets the number of worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn worker_threads(mut self, n: usize) -> Self {
        assert!(n > 0, "worker_threads must be > 0");

        self.worker_threads = n;
        self
    }

    /// Sets the scheduler name, also used as worker thread name prefix.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Spawns the workers.
    pub fn build(self) -> Arc<ParallelScheduler> {
        Arc::new(ParallelScheduler::new(self.name, self.worker_threads))
    }
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
