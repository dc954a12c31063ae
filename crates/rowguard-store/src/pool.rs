//! Connection slots.
//!
//! A unit of work holds one slot for its whole lifetime. Slots carry no
//! session state, so reuse cannot leak a tenant binding.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use rowguard_core::error::{Result, RowGuardError};

use crate::config::PoolSection;

#[derive(Debug)]
pub struct SlotPool {
    sem: Arc<Semaphore>,
    capacity: usize,
    acquire_timeout: Duration,
}

/// Held slot; released on drop.
#[derive(Debug)]
pub struct Slot {
    _permit: OwnedSemaphorePermit,
}

impl SlotPool {
    pub fn new(cfg: &PoolSection) -> Self {
        let capacity = cfg.capacity();
        Self {
            sem: Arc::new(Semaphore::new(capacity)),
            capacity,
            acquire_timeout: cfg.acquire_timeout(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.sem.available_permits()
    }

    pub async fn acquire(&self) -> Result<Slot> {
        let fut = Arc::clone(&self.sem).acquire_owned();
        match tokio::time::timeout(self.acquire_timeout, fut).await {
            Ok(Ok(permit)) => Ok(Slot { _permit: permit }),
            Ok(Err(_)) => Err(RowGuardError::Internal("connection pool closed".into())),
            Err(_) => {
                tracing::warn!(capacity = self.capacity, "connection slot acquire timed out");
                Err(RowGuardError::PoolTimeout)
            }
        }
    }
}
