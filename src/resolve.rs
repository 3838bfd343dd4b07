//! Index resolution
//!
//! Maps a logical index to the physical slot holding it. Between the oldest
//! and newest boundaries the log is a gap-free run of indices laid out in
//! ring order, so the slot for index `i` is found by binary search over
//! logical offsets, translating every probe through [`Layout::advance`].
//!
//! Every slot in that run, interrupted ones included, holds index
//! `first + offset`. Interrupted headers cannot be trusted, so their index is
//! taken from the offset instead.

use crate::error::{CircError, Result};
use crate::layout::Layout;
use crate::locate::Boundary;
use crate::medium::Medium;
use crate::slot::read_header;

/// Binary search over the circular range `[first, last]`
pub struct IndexResolver<'a, M: Medium + ?Sized> {
    layout: &'a Layout,
    medium: &'a mut M,
}

impl<'a, M: Medium + ?Sized> IndexResolver<'a, M> {
    pub fn new(layout: &'a Layout, medium: &'a mut M) -> Self {
        Self { layout, medium }
    }

    /// Locate the slot holding `target`
    ///
    /// `first` and `last` are the boundaries reported by the locator.
    pub fn find_by_index(&mut self, first: Boundary, last: Boundary, target: u32) -> Result<Boundary> {
        if target < first.log_index || target > last.log_index {
            return Err(CircError::IndexOutOfRange {
                index: target,
                first: first.log_index,
                last: last.log_index,
            });
        }

        // Half-open window of logical offsets from `first`
        let mut lo: u32 = 0;
        let mut hi: u32 = (last.log_index - first.log_index)
            .checked_add(1)
            .ok_or_else(|| CircError::CorruptSlot {
                address: last.address,
                reason: format!(
                    "index span [{}, {}] exceeds the address space",
                    first.log_index, last.log_index
                ),
            })?;
        let capacity = self.layout.payload_capacity();

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let address = self.layout.advance(first.address, mid);
            let header = read_header(&mut *self.medium, address)?;

            tracing::trace!(index = target, offset = mid, address, "probe");

            if !header.is_used() {
                tracing::warn!(
                    "Unwritten slot at {:#010x} inside [{}, {}] while resolving {}",
                    address,
                    first.log_index,
                    last.log_index,
                    target
                );
                return Err(CircError::RecordNotFound(target));
            }

            // An interrupted slot still owns the index of its offset
            let valid = header.is_valid(capacity);
            let probed = if valid { header.log_index } else { first.log_index + mid };

            if probed == target && !valid {
                tracing::debug!(
                    "Index {} was lost to an interrupted append at {:#010x}",
                    target,
                    address
                );
                return Err(CircError::RecordNotFound(target));
            }

            if probed == target {
                return Ok(Boundary {
                    address,
                    log_index: target,
                });
            } else if probed < target {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        tracing::warn!("Index {} not found in [{}, {}]", target, first.log_index, last.log_index);
        Err(CircError::RecordNotFound(target))
    }
}
