use super::builder::SchedulerBuilder;
use super::{ImmediateScheduler, Scheduler};

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Name of the inline context.
pub const IMMEDIATE: &str = "immediate";

/// Name of the bounded worker pool context.
pub const BOUNDED_PARALLEL: &str = "bounded-parallel";

/// Named execution contexts.
///
/// The registry is an ordinary value: build one, pass it (or the
/// schedulers it hands out) to the code that needs them.
///
/// # Examples
///
/// ```rust,ignore
/// let registry = SchedulerRegistry::with_defaults(4);
/// let parallel = registry.get(BOUNDED_PARALLEL).unwrap();
///
/// Flux::just(["a", "b"]).subscribe_on(parallel);
/// ```
pub struct SchedulerRegistry {
    contexts: RwLock<HashMap<String, Arc<dyn Scheduler>>>,
}

impl SchedulerRegistry {
    /// Creates a registry holding only [`IMMEDIATE`].
    pub fn new() -> Self {
        let mut contexts: HashMap<String, Arc<dyn Scheduler>> = HashMap::new();
        contexts.insert(IMMEDIATE.to_owned(), Arc::new(ImmediateScheduler));

        Self {
            contexts: RwLock::new(contexts),
        }
    }

    /// Creates a registry holding [`IMMEDIATE`] and a [`BOUNDED_PARALLEL`]
    /// pool of `worker_threads` workers.
    ///
    /// # Panics
    ///
    /// Panics if `worker_threads == 0`.
    pub fn with_defaults(worker_threads: usize) -> Self {
        let registry = Self::new();

        let parallel = SchedulerBuilder::new()
            .worker_threads(worker_threads)
            .name(BOUNDED_PARALLEL)
            .build();

        registry.register(BOUNDED_PARALLEL, parallel);
        registry
    }

    /// Registers `scheduler` under `name`, returning the context it replaced.
    pub fn register(
        &self,
        name: impl Into<String>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Option<Arc<dyn Scheduler>> {
        self.contexts.write().insert(name.into(), scheduler)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Scheduler>> {
        self.contexts.read().get(name).cloned()
    }

    /// Names of all registered contexts, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.contexts.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for SchedulerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
