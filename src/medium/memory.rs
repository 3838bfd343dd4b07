//! In-memory flash simulator
//!
//! Models NOR flash closely enough to catch layout bugs in the store:
//! - erase works on whole, aligned erase units and sets them to `0xFF`
//! - programming a byte that is not erased is rejected
//! - every access is bounds checked
//!
//! Faults can be injected for the next read, write or erase. A torn write
//! programs only a prefix of the data before failing.

use super::{checked_offset, Medium, MediumError, ERASED_BYTE};
use crate::config::Config;

/// Operation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediumStats {
    pub reads: u64,
    pub writes: u64,
    pub erases: u64,
}

/// A one-shot fault applied to the next matching operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Next read fails
    Read,
    /// Next write fails without programming anything
    Write,
    /// Next erase fails without erasing anything
    Erase,
    /// Next write programs only the first `bytes` bytes, then fails
    TornWrite { bytes: usize },
}

/// In-memory NOR flash
#[derive(Debug, Clone)]
pub struct MemFlash {
    base: u32,
    erase_size: u32,
    data: Vec<u8>,
    stats: MediumStats,
    /// Addresses of every successful erase, oldest first
    erase_log: Vec<u32>,
    fault: Option<Fault>,
}

impl MemFlash {
    /// Create a fully erased flash of `size` bytes mapped at `base`
    pub fn new(base: u32, size: u32, erase_size: u32) -> Self {
        Self {
            base,
            erase_size,
            data: vec![ERASED_BYTE; size as usize],
            stats: MediumStats::default(),
            erase_log: Vec::new(),
            fault: None,
        }
    }

    /// Create a flash covering exactly the extent described by `config`
    pub fn for_config(config: &Config) -> Self {
        Self::new(
            config.flash_start,
            config.region_size * config.region_count,
            config.region_size,
        )
    }

    /// Arm a fault for the next matching operation
    pub fn inject(&mut self, fault: Fault) {
        self.fault = Some(fault);
    }

    /// Overwrite bytes directly, bypassing erase semantics (corruption tests)
    pub fn poke(&mut self, address: u32, bytes: &[u8]) -> Result<(), MediumError> {
        let offset = checked_offset(self.base, self.size(), address, bytes.len())?;
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Raw view of the bytes at `address`
    pub fn peek(&self, address: u32, len: usize) -> Result<&[u8], MediumError> {
        let offset = checked_offset(self.base, self.size(), address, len)?;
        Ok(&self.data[offset..offset + len])
    }

    pub fn stats(&self) -> MediumStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = MediumStats::default();
        self.erase_log.clear();
    }

    pub fn erase_log(&self) -> &[u32] {
        &self.erase_log
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn size(&self) -> u32 {
        self.data.len() as u32
    }

    fn take_fault(&mut self, matches: impl Fn(&Fault) -> bool) -> Option<Fault> {
        match self.fault {
            Some(fault) if matches(&fault) => self.fault.take(),
            _ => None,
        }
    }
}

impl Medium for MemFlash {
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), MediumError> {
        if self.take_fault(|f| *f == Fault::Read).is_some() {
            return Err(MediumError::Fault(format!("read at {:#010x}", address)));
        }

        let offset = checked_offset(self.base, self.size(), address, buf.len())?;
        buf.copy_from_slice(&self.data[offset..offset + buf.len()]);
        self.stats.reads += 1;
        Ok(())
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), MediumError> {
        let fault = self.take_fault(|f| matches!(f, Fault::Write | Fault::TornWrite { .. }));
        if fault == Some(Fault::Write) {
            return Err(MediumError::Fault(format!("write at {:#010x}", address)));
        }

        let offset = checked_offset(self.base, self.size(), address, data.len())?;
        if let Some(pos) = self.data[offset..offset + data.len()]
            .iter()
            .position(|&b| b != ERASED_BYTE)
        {
            return Err(MediumError::NotErased(address + pos as u32));
        }

        if let Some(Fault::TornWrite { bytes }) = fault {
            let bytes = bytes.min(data.len());
            self.data[offset..offset + bytes].copy_from_slice(&data[..bytes]);
            return Err(MediumError::Fault(format!(
                "torn write at {:#010x} after {} bytes",
                address, bytes
            )));
        }

        self.data[offset..offset + data.len()].copy_from_slice(data);
        self.stats.writes += 1;
        Ok(())
    }

    fn erase(&mut self, address: u32) -> Result<(), MediumError> {
        if self.take_fault(|f| *f == Fault::Erase).is_some() {
            return Err(MediumError::Fault(format!("erase at {:#010x}", address)));
        }

        let offset = checked_offset(self.base, self.size(), address, self.erase_size as usize)?;
        if offset % self.erase_size as usize != 0 {
            return Err(MediumError::Misaligned(address));
        }

        self.data[offset..offset + self.erase_size as usize].fill(ERASED_BYTE);
        self.stats.erases += 1;
        self.erase_log.push(address);
        Ok(())
    }

    fn erase_size(&self) -> Option<u32> {
        Some(self.erase_size)
    }
}
