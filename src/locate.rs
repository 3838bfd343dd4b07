//! Boundary location
//!
//! Finds the oldest and newest valid records by scanning slot headers.
//! Nothing is cached: every call reflects what is on the medium right now.
//!
//! Both scans rely on the region prefix property: within one erase epoch the
//! programmed slots of a region are exactly `[0, k)`. Interrupted slots count
//! as programmed for the prefix but never as a boundary.

use crate::error::{CircError, Result};
use crate::layout::Layout;
use crate::medium::Medium;
use crate::slot::read_header;

/// Position and index of a record at one end of the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    /// Physical address of the slot
    pub address: u32,
    /// Logical index stored in the slot
    pub log_index: u32,
}

/// Scans region headers for the ends of the log
pub struct BoundaryLocator<'a, M: Medium + ?Sized> {
    layout: &'a Layout,
    medium: &'a mut M,
}

impl<'a, M: Medium + ?Sized> BoundaryLocator<'a, M> {
    pub fn new(layout: &'a Layout, medium: &'a mut M) -> Self {
        Self { layout, medium }
    }

    /// Find the record with the smallest logical index
    ///
    /// Slot 0 of a written region always carries that region's smallest
    /// index, so one header read per region is enough. An interrupted slot 0
    /// defers to the first complete slot after it.
    pub fn find_oldest(&mut self) -> Result<Boundary> {
        let mut oldest: Option<Boundary> = None;

        for region in 0..self.layout.region_count() {
            let Some(found) = self.first_valid(region)? else {
                continue;
            };

            if oldest.map_or(true, |b| found.log_index < b.log_index) {
                oldest = Some(found);
            }
        }

        oldest.ok_or(CircError::StoreEmpty)
    }

    /// Find the record with the largest logical index
    ///
    /// Binary-searches the written prefix of every region and keeps the
    /// region whose last complete slot carries the largest index.
    pub fn find_newest(&mut self) -> Result<Boundary> {
        let mut newest: Option<Boundary> = None;

        for region in 0..self.layout.region_count() {
            let written = self.written_slots(region)?;
            let Some(found) = self.last_valid(region, written)? else {
                continue;
            };

            if newest.map_or(true, |b| found.log_index > b.log_index) {
                newest = Some(found);
            }
        }

        newest.ok_or(CircError::StoreEmpty)
    }

    /// Length of the programmed prefix of `region`
    pub fn written_slots(&mut self, region: u32) -> Result<u32> {
        let base = self.layout.region_base(region);
        let mut lo = 0;
        let mut hi = self.layout.slots_per_region();

        // Invariant: slots [0, lo) are written, slots [hi, end) are not
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let header = read_header(&mut *self.medium, self.layout.slot_address(base, mid))?;
            if header.is_used() {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        Ok(lo)
    }

    /// First complete slot of `region`, scanning forward over interrupted ones
    fn first_valid(&mut self, region: u32) -> Result<Option<Boundary>> {
        let base = self.layout.region_base(region);
        let capacity = self.layout.payload_capacity();

        for slot in 0..self.layout.slots_per_region() {
            let address = self.layout.slot_address(base, slot);
            let header = read_header(&mut *self.medium, address)?;

            if !header.is_used() {
                break;
            }
            if header.is_valid(capacity) {
                return Ok(Some(Boundary {
                    address,
                    log_index: header.log_index,
                }));
            }
        }

        Ok(None)
    }

    /// Last complete slot among the first `written` slots of `region`
    fn last_valid(&mut self, region: u32, written: u32) -> Result<Option<Boundary>> {
        let base = self.layout.region_base(region);
        let capacity = self.layout.payload_capacity();

        for slot in (0..written).rev() {
            let address = self.layout.slot_address(base, slot);
            let header = read_header(&mut *self.medium, address)?;

            if header.is_valid(capacity) {
                return Ok(Some(Boundary {
                    address,
                    log_index: header.log_index,
                }));
            }
        }

        Ok(None)
    }
}
