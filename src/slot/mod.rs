//! Slot Module
//!
//! A slot is the fixed-size unit holding one record.
//!
//! ## Slot Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ Header (8 bytes)                                            │
//! │ ┌──────────┬──────────────┬─────────────────┬─────────────┐ │
//! │ │ Used (1) │ Reserved (1) │ LogIndex (4,LE) │ Len (2, LE) │ │
//! │ └──────────┴──────────────┴─────────────────┴─────────────┘ │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Payload (Len bytes)                                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Padding (0xFF up to slot_size)                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! `Used == 0xAA` marks a programmed slot. Anything else, including the erased
//! pattern, means the slot has not been written since its region was erased.
//!
//! A programmed slot only holds a record when its `Len` fits the slot. The
//! marker is the first byte programmed, so an append interrupted inside the
//! header leaves `Len` at least partly erased (`0xFFxx`), which no slot up to
//! [`MAX_SLOT_SIZE`] can hold. Such a slot is an *interrupted* slot: it
//! occupies its position in the ring but carries no record.

mod codec;

use bytes::Bytes;

pub use codec::{decode_slot, encode_slot};
pub(crate) use codec::{read_header, read_record};

/// Header size: Used (1) + Reserved (1) + LogIndex (4) + Len (2) = 8 bytes
pub const HEADER_SIZE: usize = 8;

/// Marker value of a written slot
pub const USED_MARKER: u8 = 0xAA;

/// Largest supported slot size
///
/// Keeps every valid `Len` below `0xFF00`, so a header whose length high
/// byte is still erased never decodes as a record.
pub const MAX_SLOT_SIZE: u32 = 0xFF00;

/// Decoded slot header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotHeader {
    pub used_marker: u8,
    pub reserved: u8,
    pub log_index: u32,
    pub payload_len: u16,
}

impl SlotHeader {
    /// Header for a freshly appended record
    pub fn new(log_index: u32, payload_len: u16) -> Self {
        Self {
            used_marker: USED_MARKER,
            reserved: crate::medium::ERASED_BYTE,
            log_index,
            payload_len,
        }
    }

    /// Whether the slot has been programmed since its region was erased
    pub fn is_used(&self) -> bool {
        self.used_marker == USED_MARKER
    }

    /// Whether the slot holds a record with at most `capacity` payload bytes
    pub fn is_valid(&self, capacity: usize) -> bool {
        self.is_used() && self.payload_len as usize <= capacity
    }

    /// Programmed, but the header never completed
    pub fn is_interrupted(&self, capacity: usize) -> bool {
        self.is_used() && !self.is_valid(capacity)
    }
}

/// A record read back from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Logical index assigned at append time
    pub log_index: u32,

    /// Record payload
    pub payload: Bytes,
}
