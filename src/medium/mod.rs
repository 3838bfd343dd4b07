//! Medium Module
//!
//! The raw block-erasable storage the store is built on.
//!
//! ## Contract
//! - `read` returns exactly `buf.len()` bytes starting at `address`
//! - `write` programs `data` at `address`; the caller guarantees the target
//!   bytes were erased and that slots within a region are written in order
//! - `erase` clears exactly one region starting at a region-aligned `address`
//!   to [`ERASED_BYTE`]
//!
//! Addresses are physical: the store never subtracts a base before calling
//! into the medium.
//!
//! ## Provided Media
//! - [`MemFlash`]: in-memory NOR flash simulator with fault injection
//! - [`FileFlash`]: flash image backed by a regular file
//! - [`SharedMedium`]: lock-protected handle for media shared across contexts

mod file;
mod memory;
mod shared;

use thiserror::Error;

pub use file::{FileFlash, SyncStrategy};
pub use memory::{Fault, MemFlash, MediumStats};
pub use shared::SharedMedium;

/// Byte value of an erased cell
pub const ERASED_BYTE: u8 = 0xFF;

/// Errors reported by a medium
#[derive(Debug, Error)]
pub enum MediumError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Access out of bounds: address {address:#010x}, len {len}")]
    OutOfBounds { address: u32, len: usize },

    #[error("Erase address {0:#010x} is not aligned to the erase size")]
    Misaligned(u32),

    #[error("Write to non-erased byte at {0:#010x}")]
    NotErased(u32),

    #[error("Injected fault: {0}")]
    Fault(String),
}

/// Block-erasable storage primitives consumed by the store
pub trait Medium {
    /// Read `buf.len()` bytes starting at `address`
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), MediumError>;

    /// Program `data` starting at `address`
    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), MediumError>;

    /// Erase the region starting at `address`
    fn erase(&mut self, address: u32) -> Result<(), MediumError>;

    /// Erase granularity, when the medium knows it
    fn erase_size(&self) -> Option<u32> {
        None
    }

    /// Minimum program unit in bytes
    fn write_granularity(&self) -> u32 {
        1
    }
}

impl<M: Medium + ?Sized> Medium for &mut M {
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), MediumError> {
        (**self).read(address, buf)
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), MediumError> {
        (**self).write(address, data)
    }

    fn erase(&mut self, address: u32) -> Result<(), MediumError> {
        (**self).erase(address)
    }

    fn erase_size(&self) -> Option<u32> {
        (**self).erase_size()
    }

    fn write_granularity(&self) -> u32 {
        (**self).write_granularity()
    }
}

impl<M: Medium + ?Sized> Medium for Box<M> {
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), MediumError> {
        (**self).read(address, buf)
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), MediumError> {
        (**self).write(address, data)
    }

    fn erase(&mut self, address: u32) -> Result<(), MediumError> {
        (**self).erase(address)
    }

    fn erase_size(&self) -> Option<u32> {
        (**self).erase_size()
    }

    fn write_granularity(&self) -> u32 {
        (**self).write_granularity()
    }
}

/// Bounds check shared by the provided media.
///
/// Returns the byte offset of `address` relative to `base`.
pub(crate) fn checked_offset(
    base: u32,
    size: u32,
    address: u32,
    len: usize,
) -> Result<usize, MediumError> {
    let out_of_bounds = MediumError::OutOfBounds { address, len };

    if address < base {
        return Err(out_of_bounds);
    }
    let offset = (address - base) as u64;
    if offset + len as u64 > size as u64 {
        return Err(out_of_bounds);
    }
    Ok(offset as usize)
}
