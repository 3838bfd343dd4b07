//! Shared medium handle
//!
//! The store itself does no locking. When a medium has to be reachable from
//! more than one place (several stores over disjoint partitions of one chip,
//! or a store plus a diagnostics path), wrap it in a [`SharedMedium`] and hand
//! out clones. Every primitive call takes the lock for its own duration only.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::{Medium, MediumError};

/// Cloneable, lock-protected handle to a medium
pub struct SharedMedium<M> {
    inner: Arc<Mutex<M>>,
    /// Cached at construction so `erase_size()` does not need the lock
    erase_size: Option<u32>,
    write_granularity: u32,
}

impl<M: Medium> SharedMedium<M> {
    pub fn new(medium: M) -> Self {
        let erase_size = medium.erase_size();
        let write_granularity = medium.write_granularity();
        Self {
            inner: Arc::new(Mutex::new(medium)),
            erase_size,
            write_granularity,
        }
    }

    /// Lock the underlying medium for direct inspection
    pub fn lock(&self) -> MutexGuard<'_, M> {
        self.inner.lock()
    }
}

impl<M> Clone for SharedMedium<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            erase_size: self.erase_size,
            write_granularity: self.write_granularity,
        }
    }
}

impl<M: Medium> Medium for SharedMedium<M> {
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), MediumError> {
        self.inner.lock().read(address, buf)
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), MediumError> {
        self.inner.lock().write(address, data)
    }

    fn erase(&mut self, address: u32) -> Result<(), MediumError> {
        self.inner.lock().erase(address)
    }

    fn erase_size(&self) -> Option<u32> {
        self.erase_size
    }

    fn write_granularity(&self) -> u32 {
        self.write_granularity
    }
}
