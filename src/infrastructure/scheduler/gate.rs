//! Concurrency Gate
//! Caps how many job bodies run at once, process wide.
//! Units are handed out as `GatePermit`s and go back to the gate when the permit is dropped,
//! so a unit is returned exactly once on every exit path.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::domain::theme_sync::custom_errors::GateError;

#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl GatePermit {
    /// Gives the unit back. Same as dropping the permit.
    pub fn release(self) {}
}

impl ConcurrencyGate {
    pub fn new(capacity: usize) -> Result<Self, GateError> {
        if capacity == 0 || capacity > Semaphore::MAX_PERMITS {
            return Err(GateError::InvalidCapacity(capacity));
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    /// Waits (FIFO) until a unit is free. Fails only once the gate is closed.
    pub async fn acquire(&self) -> Result<GatePermit, GateError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| GateError::Closed)?;
        Ok(GatePermit { _permit: permit })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn in_use(&self) -> usize {
        self.capacity - self.available()
    }

    /// Wakes every waiter with `GateError::Closed`; held permits stay valid
    pub fn close(&self) {
        self.semaphore.close();
    }
}
