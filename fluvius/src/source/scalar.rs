use crate::core::scalar::DeferredScalar;
use crate::core::{Publisher, Subscriber, reject};
use crate::error::{FluxError, catch_fault};

use std::sync::Arc;

type Supplier<T> = dyn Fn() -> Result<Option<T>, FluxError> + Send + Sync;

/// Source of at most one value, computed per subscription.
///
/// The supplier runs once the subscriber holds its subscription. A value
/// ready before demand arrives is held until it is requested.
pub(crate) struct SupplierSource<T> {
    operator: &'static str,
    supplier: Box<Supplier<T>>,
}

impl<T: Send + 'static> SupplierSource<T> {
    pub(crate) fn new<F>(operator: &'static str, supplier: F) -> Self
    where
        F: Fn() -> Result<Option<T>, FluxError> + Send + Sync + 'static,
    {
        Self {
            operator,
            supplier: Box::new(supplier),
        }
    }
}

impl<T: Send + 'static> Publisher<T> for SupplierSource<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let scalar = Arc::new(DeferredScalar::new(subscriber.clone()));
        subscriber.on_subscribe(scalar.clone());

        if scalar.is_done() {
            return;
        }

        match catch_fault(self.operator, || (self.supplier)()) {
            Ok(Ok(Some(value))) => scalar.complete_with(value),
            Ok(Ok(None)) => scalar.complete_empty(),
            Ok(Err(error)) | Err(error) => scalar.error(error),
        }
    }
}

/// Source failing every subscriber with the same error.
pub(crate) struct ErrorSource {
    error: FluxError,
}

impl ErrorSource {
    pub(crate) fn new(error: FluxError) -> Self {
        Self { error }
    }
}

impl<T> Publisher<T> for ErrorSource {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        reject(subscriber, self.error.clone());
    }
}
