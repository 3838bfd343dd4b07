//! Slot codec
//!
//! Encoding and decoding of slot images, plus the medium read helpers used by
//! the locator, resolver and store.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{Record, SlotHeader, HEADER_SIZE};
use crate::error::{CircError, Result};
use crate::layout::Layout;
use crate::medium::{Medium, ERASED_BYTE};

impl SlotHeader {
    /// Append the 8 header bytes to `buf`
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.used_marker);
        buf.put_u8(self.reserved);
        buf.put_u32_le(self.log_index);
        buf.put_u16_le(self.payload_len);
    }

    /// Decode the 8 header bytes
    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Self {
        let mut buf = &bytes[..];
        Self {
            used_marker: buf.get_u8(),
            reserved: buf.get_u8(),
            log_index: buf.get_u32_le(),
            payload_len: buf.get_u16_le(),
        }
    }
}

/// Encode a complete slot image of `slot_size` bytes
///
/// Format: header (8) + payload + 0xFF padding. The caller has already
/// checked that the payload fits.
pub fn encode_slot(log_index: u32, payload: &[u8], slot_size: usize) -> Bytes {
    let mut slot = BytesMut::with_capacity(slot_size);

    SlotHeader::new(log_index, payload.len() as u16).encode(&mut slot);
    slot.put_slice(payload);
    slot.resize(slot_size, ERASED_BYTE);

    slot.freeze()
}

/// Decode a complete slot image read from `address`
pub fn decode_slot(address: u32, slot: &[u8]) -> Result<Record> {
    if slot.len() < HEADER_SIZE {
        return Err(CircError::CorruptSlot {
            address,
            reason: format!("slot image is only {} bytes", slot.len()),
        });
    }

    let mut header_bytes = [0u8; HEADER_SIZE];
    header_bytes.copy_from_slice(&slot[..HEADER_SIZE]);
    let header = SlotHeader::decode(&header_bytes);
    if !header.is_used() {
        return Err(CircError::CorruptSlot {
            address,
            reason: format!("slot not written (marker {:#04x})", header.used_marker),
        });
    }

    let capacity = slot.len() - HEADER_SIZE;
    let len = header.payload_len as usize;
    if len > capacity {
        return Err(CircError::CorruptSlot {
            address,
            reason: format!("payload length {} exceeds slot capacity {}", len, capacity),
        });
    }

    Ok(Record {
        log_index: header.log_index,
        payload: Bytes::copy_from_slice(&slot[HEADER_SIZE..HEADER_SIZE + len]),
    })
}

/// Read only the header of the slot at `address`
pub(crate) fn read_header<M: Medium + ?Sized>(medium: &mut M, address: u32) -> Result<SlotHeader> {
    let mut buf = [0u8; HEADER_SIZE];
    medium.read(address, &mut buf)?;
    Ok(SlotHeader::decode(&buf))
}

/// Read and decode the whole slot at `address`
pub(crate) fn read_record<M: Medium + ?Sized>(
    medium: &mut M,
    layout: &Layout,
    address: u32,
) -> Result<Record> {
    let mut buf = vec![0u8; layout.slot_size() as usize];
    medium.read(address, &mut buf)?;
    decode_slot(address, &buf)
}
