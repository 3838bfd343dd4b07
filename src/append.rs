//! Appending records
//!
//! Decides where the next record goes and whether a region has to be erased
//! first. Entering a region always starts at its slot 0, so the erase check is
//! simply "is the next address region-aligned". Running off the end of the
//! ring resets the address to `flash_start` before that check, which makes
//! wraparound and eviction of the oldest region a single step.
//!
//! A failed append leaves at most one interrupted slot behind. The next
//! append either erases it together with its region or steps past it.

use crate::error::{CircError, Result};
use crate::layout::Layout;
use crate::locate::BoundaryLocator;
use crate::medium::Medium;
use crate::slot::{encode_slot, read_header};

/// Where and how the next append will happen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendPlan {
    /// Slot the record will be written to
    pub address: u32,
    /// Index the record will be assigned
    pub log_index: u32,
    /// Region to erase before writing, if any
    pub erase: Option<u32>,
    /// Whether the address wrapped back to `flash_start`
    pub wrapped: bool,
    /// Interrupted slots stepped over to reach `address`
    pub skipped: u32,
}

/// Writes new records at the head of the log
pub struct Appender<'a, M: Medium + ?Sized> {
    layout: &'a Layout,
    medium: &'a mut M,
}

impl<'a, M: Medium + ?Sized> Appender<'a, M> {
    pub fn new(layout: &'a Layout, medium: &'a mut M) -> Self {
        Self { layout, medium }
    }

    /// Work out the next slot without touching the medium beyond reads
    ///
    /// Interrupted slots after the newest record cannot be reprogrammed
    /// until their region is erased, so the plan steps over them. Each one
    /// keeps the index of its position, which leaves index and ring offset in
    /// lockstep for the resolver.
    pub fn plan(&mut self) -> Result<AppendPlan> {
        let newest = BoundaryLocator::new(self.layout, &mut *self.medium).find_newest();

        let (mut next, mut log_index) = match newest {
            Ok(last) => (
                last.address as u64 + self.layout.slot_size() as u64,
                last.log_index,
            ),
            Err(CircError::StoreEmpty) => (self.layout.flash_start() as u64, 0),
            Err(e) => return Err(e),
        };

        let mut wrapped = false;
        let mut skipped = 0;

        loop {
            log_index = log_index.checked_add(1).ok_or(CircError::IndexExhausted)?;

            if next >= self.layout.end() {
                next = self.layout.flash_start() as u64;
                wrapped = true;
            }
            let address = u32::try_from(next).map_err(|_| CircError::AddressOutOfRange {
                address: u32::MAX,
                start: self.layout.flash_start(),
                end: self.layout.end(),
            })?;

            if !self.layout.contains(address) {
                return Err(CircError::AddressOutOfRange {
                    address,
                    start: self.layout.flash_start(),
                    end: self.layout.end(),
                });
            }

            if self.layout.is_region_aligned(address) {
                return Ok(AppendPlan {
                    address,
                    log_index,
                    erase: Some(address),
                    wrapped,
                    skipped,
                });
            }

            if !read_header(&mut *self.medium, address)?.is_used() {
                return Ok(AppendPlan {
                    address,
                    log_index,
                    erase: None,
                    wrapped,
                    skipped,
                });
            }

            tracing::debug!(
                "Skipping interrupted slot at {:#010x} (index {})",
                address,
                log_index
            );
            skipped += 1;
            next = address as u64 + self.layout.slot_size() as u64;
        }
    }

    /// Append `payload` as a new record and return its index
    pub fn append(&mut self, payload: &[u8]) -> Result<u32> {
        let max = self.layout.payload_capacity();
        if payload.len() > max {
            return Err(CircError::PayloadTooLarge {
                len: payload.len(),
                max,
            });
        }

        let plan = self.plan()?;

        if let Some(region) = plan.erase {
            if plan.wrapped {
                tracing::debug!("Ring full, wrapping to {:#010x}", region);
            }
            tracing::debug!(
                "Erasing region {} at {:#010x} before index {}",
                self.layout.region_of(region),
                region,
                plan.log_index
            );
            self.medium.erase(region)?;
        }

        let slot = encode_slot(plan.log_index, payload, self.layout.slot_size() as usize);
        self.medium.write(plan.address, &slot)?;

        tracing::trace!(
            log_index = plan.log_index,
            address = plan.address,
            len = payload.len(),
            "appended"
        );

        Ok(plan.log_index)
    }
}
