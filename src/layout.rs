//! Address space arithmetic
//!
//! Pure conversions between region/slot coordinates and physical addresses.
//! No I/O happens here.
//!
//! ## Ring Layout
//! ```text
//! flash_start                                              end
//! │                                                          │
//! ▼                                                          ▼
//! ┌──────────────────┬──────────────────┬─────┬──────────────┐
//! │ Region 0         │ Region 1         │ ... │ Region N-1   │
//! │ [s0][s1]..[sK-1] │ [s0][s1]..[sK-1] │     │              │
//! └──────────────────┴──────────────────┴─────┴──────────────┘
//!   ▲                                                        │
//!   └────────────────────── wraps ───────────────────────────┘
//! ```
//!
//! All wrapping is relative to `flash_start`, never to absolute address 0.

use crate::config::Config;
use crate::slot::HEADER_SIZE;

/// Geometry of a validated store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    flash_start: u32,
    region_size: u32,
    region_count: u32,
    slot_size: u32,
}

impl Layout {
    /// Build a layout from an already validated config
    pub fn new(config: &Config) -> Self {
        Self {
            flash_start: config.flash_start,
            region_size: config.region_size,
            region_count: config.region_count,
            slot_size: config.slot_size,
        }
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    pub fn flash_start(&self) -> u32 {
        self.flash_start
    }

    pub fn region_size(&self) -> u32 {
        self.region_size
    }

    pub fn region_count(&self) -> u32 {
        self.region_count
    }

    pub fn slot_size(&self) -> u32 {
        self.slot_size
    }

    pub fn slots_per_region(&self) -> u32 {
        self.region_size / self.slot_size
    }

    /// Total number of slots in the ring
    pub fn capacity(&self) -> u32 {
        self.region_count * self.slots_per_region()
    }

    /// Largest payload a single slot can hold
    pub fn payload_capacity(&self) -> usize {
        self.slot_size as usize - HEADER_SIZE
    }

    /// Size of the whole ring in bytes
    pub fn total_size(&self) -> u32 {
        self.region_count * self.region_size
    }

    /// One past the last address of the ring
    ///
    /// Returned as `u64` so candidate addresses one slot past the last one
    /// compare against it without overflowing.
    pub fn end(&self) -> u64 {
        self.flash_start as u64 + self.total_size() as u64
    }

    // =========================================================================
    // Coordinates -> Addresses
    // =========================================================================

    /// Physical address of region `region`'s first slot
    pub fn region_base(&self, region: u32) -> u32 {
        self.flash_start + region * self.region_size
    }

    /// Physical address of slot `slot` within the region starting at `base`
    pub fn slot_address(&self, base: u32, slot: u32) -> u32 {
        base + slot * self.slot_size
    }

    /// Map any address back into the ring
    ///
    /// `flash_start + ((address - flash_start) mod total_size)`, evaluated in
    /// signed 64-bit so addresses below `flash_start` or beyond `u32` also map.
    pub fn wrap(&self, address: u64) -> u32 {
        let relative = address as i64 - self.flash_start as i64;
        let offset = relative.rem_euclid(self.total_size() as i64);
        self.flash_start + offset as u32
    }

    /// Address `slots` slots after `address`, wrapping around the ring
    pub fn advance(&self, address: u32, slots: u32) -> u32 {
        self.wrap(address as u64 + slots as u64 * self.slot_size as u64)
    }

    // =========================================================================
    // Addresses -> Coordinates
    // =========================================================================

    /// Whether `address` lies inside `[flash_start, end)`
    pub fn contains(&self, address: u32) -> bool {
        address >= self.flash_start && (address as u64) < self.end()
    }

    /// Whether `address` is the first byte of a region
    pub fn is_region_aligned(&self, address: u32) -> bool {
        address >= self.flash_start && (address - self.flash_start) % self.region_size == 0
    }

    /// Region holding `address` (caller ensures `contains(address)`)
    pub fn region_of(&self, address: u32) -> u32 {
        (address - self.flash_start) / self.region_size
    }

    /// Slot offset of `address` within its region
    pub fn slot_of(&self, address: u32) -> u32 {
        ((address - self.flash_start) % self.region_size) / self.slot_size
    }
}
