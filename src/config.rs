//! Configuration for circstore
//!
//! Store geometry is fixed at construction. Everything the store knows about
//! the medium layout lives here; nothing else is persisted besides the slot
//! headers themselves.
//!
//! ## Geometry Descriptor Format
//! File-backed images may carry a small sidecar describing their geometry:
//! ```text
//! ┌──────────┬─────────────────────────────────┐
//! │ CRC (4)  │ bincode(Config)                 │
//! └──────────┴─────────────────────────────────┘
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CircError, Result};
use crate::slot::{HEADER_SIZE, MAX_SLOT_SIZE};

/// Store geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Medium Layout
    // -------------------------------------------------------------------------
    /// Physical address of region 0 (must be 4-byte aligned)
    pub flash_start: u32,

    /// Erase granularity of the medium, in bytes
    pub region_size: u32,

    /// Number of regions forming the ring (>= 1, recommended >= 2)
    pub region_count: u32,

    // -------------------------------------------------------------------------
    // Slot Layout
    // -------------------------------------------------------------------------
    /// Size of one slot (header + payload); must evenly divide `region_size`
    pub slot_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            flash_start: 0,
            region_size: 4096,
            region_count: 2,
            slot_size: 32,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the geometry for consistency
    pub fn validate(&self) -> Result<()> {
        if self.flash_start % 4 != 0 {
            return Err(CircError::Config(format!(
                "flash_start {:#010x} is not 4-byte aligned",
                self.flash_start
            )));
        }
        if self.region_count == 0 {
            return Err(CircError::Config("region_count must be at least 1".to_string()));
        }
        if self.slot_size as usize <= HEADER_SIZE {
            return Err(CircError::Config(format!(
                "slot_size {} leaves no room for payload (header is {} bytes)",
                self.slot_size, HEADER_SIZE
            )));
        }
        if self.slot_size > MAX_SLOT_SIZE {
            return Err(CircError::Config(format!(
                "slot_size {} exceeds the maximum slot size {}",
                self.slot_size, MAX_SLOT_SIZE
            )));
        }
        if self.slot_size % 4 != 0 {
            return Err(CircError::Config(format!(
                "slot_size {} is not a multiple of 4",
                self.slot_size
            )));
        }
        if self.region_size == 0 || self.region_size % self.slot_size != 0 {
            return Err(CircError::Config(format!(
                "region_size {} is not a multiple of slot_size {}",
                self.region_size, self.slot_size
            )));
        }

        let end = self.region_count as u64 * self.region_size as u64 + self.flash_start as u64;
        if end > u32::MAX as u64 {
            return Err(CircError::Config(format!(
                "store extent ends at {:#x}, beyond the 32-bit address space",
                end
            )));
        }

        Ok(())
    }

    /// Write this config as a checksummed geometry descriptor
    pub fn save(&self, path: &Path) -> Result<()> {
        let body = bincode::serialize(self).map_err(|e| CircError::Serialization(e.to_string()))?;

        let mut out = Vec::with_capacity(4 + body.len());
        out.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
        out.extend_from_slice(&body);

        fs::write(path, out)?;
        Ok(())
    }

    /// Load and validate a geometry descriptor written by [`Config::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        if bytes.len() < 4 {
            return Err(CircError::Serialization(format!(
                "geometry descriptor truncated: {} bytes",
                bytes.len()
            )));
        }

        let (crc_bytes, body) = bytes.split_at(4);
        let expected = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
        let actual = crc32fast::hash(body);
        if expected != actual {
            return Err(CircError::Serialization(format!(
                "geometry descriptor checksum mismatch: expected {:#010x}, got {:#010x}",
                expected, actual
            )));
        }

        let config: Config =
            bincode::deserialize(body).map_err(|e| CircError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the physical start address of region 0
    pub fn flash_start(mut self, address: u32) -> Self {
        self.config.flash_start = address;
        self
    }

    /// Set the erase granularity (in bytes)
    pub fn region_size(mut self, size: u32) -> Self {
        self.config.region_size = size;
        self
    }

    /// Set the number of regions in the ring
    pub fn region_count(mut self, count: u32) -> Self {
        self.config.region_count = count;
        self
    }

    /// Set the slot size (in bytes, header included)
    pub fn slot_size(mut self, size: u32) -> Self {
        self.config.slot_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
