//! Store Module
//!
//! The public face of the log: composes the locator, resolver and appender
//! over one medium.
//!
//! ## Responsibilities
//! - Validate geometry against the medium on open
//! - Append, read latest, read by index, count, clear
//! - Iterate over the retained records
//!
//! ## State
//! The store keeps no boundary state between calls. Every operation rescans
//! slot headers, so a store can be reopened over a medium written by another
//! instance and see exactly the same log.

use crate::append::Appender;
use crate::config::Config;
use crate::error::{CircError, Result};
use crate::layout::Layout;
use crate::locate::{Boundary, BoundaryLocator};
use crate::medium::Medium;
use crate::resolve::IndexResolver;
use crate::slot::{read_header, read_record, Record};

/// Fixed-slot circular log over a block-erasable medium
///
/// All operations take `&mut self`: the medium is exclusively owned and even
/// reads may move a cursor (see [`crate::medium::FileFlash`]). Share a medium
/// through [`crate::medium::SharedMedium`] when several owners are needed.
pub struct CircStore<M: Medium> {
    /// Store geometry
    config: Config,

    /// Address arithmetic derived from `config`
    layout: Layout,

    /// The medium all state lives on
    medium: M,
}

impl<M: Medium> CircStore<M> {
    /// Open a store over `medium`
    ///
    /// Checks the geometry against what the medium reports. Nothing is read
    /// or written.
    pub fn open(config: Config, medium: M) -> Result<Self> {
        config.validate()?;

        if let Some(erase_size) = medium.erase_size() {
            if erase_size != config.region_size {
                return Err(CircError::Config(format!(
                    "region_size {} does not match the medium erase size {}",
                    config.region_size, erase_size
                )));
            }
        }

        let granularity = medium.write_granularity();
        if granularity == 0 || config.slot_size % granularity != 0 {
            return Err(CircError::Config(format!(
                "slot_size {} is not a multiple of the medium write granularity {}",
                config.slot_size, granularity
            )));
        }

        if config.region_count == 1 {
            tracing::warn!("Single-region store: every wraparound erases the entire history");
        }

        let layout = Layout::new(&config);
        tracing::debug!(
            "Opened store at {:#010x}: {} regions x {} slots of {} bytes",
            config.flash_start,
            config.region_count,
            layout.slots_per_region(),
            config.slot_size
        );

        Ok(Self {
            config,
            layout,
            medium,
        })
    }

    /// Append a record, returning its logical index
    pub fn append(&mut self, payload: &[u8]) -> Result<u32> {
        Appender::new(&self.layout, &mut self.medium).append(payload)
    }

    /// Read the most recently appended record
    pub fn read_latest(&mut self) -> Result<Record> {
        let last = self.locator().find_newest()?;
        read_record(&mut self.medium, &self.layout, last.address)
    }

    /// Read the record with logical index `index`
    ///
    /// Fails with `StoreEmpty` on an empty store and `IndexOutOfRange` when
    /// `index` has been evicted or not yet assigned.
    pub fn read_by_index(&mut self, index: u32) -> Result<Record> {
        let (first, last) = self.bounds()?;
        let found = IndexResolver::new(&self.layout, &mut self.medium).find_by_index(first, last, index)?;
        read_record(&mut self.medium, &self.layout, found.address)
    }

    /// Number of indices retained, from the oldest to the newest record
    ///
    /// Indices lost to interrupted appends inside that range are counted.
    pub fn count(&mut self) -> Result<u32> {
        match self.bounds() {
            Ok((first, last)) => Ok(last.log_index - first.log_index + 1),
            Err(CircError::StoreEmpty) => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Index of the oldest retained record
    pub fn first_index(&mut self) -> Result<u32> {
        Ok(self.locator().find_oldest()?.log_index)
    }

    /// Index of the newest record
    pub fn last_index(&mut self) -> Result<u32> {
        Ok(self.locator().find_newest()?.log_index)
    }

    /// Erase every region; the next append starts again at index 1
    pub fn clear(&mut self) -> Result<()> {
        for region in 0..self.layout.region_count() {
            self.medium.erase(self.layout.region_base(region))?;
        }

        tracing::debug!("Cleared {} regions", self.layout.region_count());
        Ok(())
    }

    /// Iterate over retained records, oldest first
    pub fn iter(&mut self) -> Result<Records<'_, M>> {
        let cursor = match self.bounds() {
            Ok((first, last)) => Some(Cursor {
                address: first.address,
                log_index: first.log_index,
                last: last.log_index,
            }),
            Err(CircError::StoreEmpty) => None,
            Err(e) => return Err(e),
        };

        Ok(Records {
            store: self,
            cursor,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn medium(&self) -> &M {
        &self.medium
    }

    pub fn medium_mut(&mut self) -> &mut M {
        &mut self.medium
    }

    /// Give the medium back
    pub fn into_inner(self) -> M {
        self.medium
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn locator(&mut self) -> BoundaryLocator<'_, M> {
        BoundaryLocator::new(&self.layout, &mut self.medium)
    }

    /// Oldest and newest records, in that order
    fn bounds(&mut self) -> Result<(Boundary, Boundary)> {
        let first = self.locator().find_oldest()?;
        let last = self.locator().find_newest()?;

        if last.log_index < first.log_index {
            return Err(CircError::CorruptSlot {
                address: last.address,
                reason: format!(
                    "newest index {} is below oldest index {}",
                    last.log_index, first.log_index
                ),
            });
        }

        // The retained run can never be longer than the ring
        if last.log_index - first.log_index >= self.layout.capacity() {
            return Err(CircError::CorruptSlot {
                address: last.address,
                reason: format!(
                    "index span [{}, {}] exceeds capacity {}",
                    first.log_index,
                    last.log_index,
                    self.layout.capacity()
                ),
            });
        }

        Ok((first, last))
    }
}

struct Cursor {
    address: u32,
    log_index: u32,
    last: u32,
}

/// Iterator over retained records, oldest first
///
/// Skips slots lost to interrupted appends. Stops after the first error.
pub struct Records<'a, M: Medium> {
    store: &'a mut CircStore<M>,
    cursor: Option<Cursor>,
}

impl<'a, M: Medium> Iterator for Records<'a, M> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let cursor = self.cursor.take()?;
            let following = (cursor.log_index < cursor.last).then(|| Cursor {
                address: self.store.layout.advance(cursor.address, 1),
                log_index: cursor.log_index + 1,
                last: cursor.last,
            });

            let header = match read_header(&mut self.store.medium, cursor.address) {
                Ok(header) => header,
                Err(e) => return Some(Err(e)),
            };
            if header.is_interrupted(self.store.layout.payload_capacity()) {
                self.cursor = following;
                continue;
            }

            let record = match read_record(&mut self.store.medium, &self.store.layout, cursor.address) {
                Ok(record) => record,
                Err(e) => return Some(Err(e)),
            };

            if record.log_index != cursor.log_index {
                return Some(Err(CircError::CorruptSlot {
                    address: cursor.address,
                    reason: format!(
                        "expected index {}, found {}",
                        cursor.log_index, record.log_index
                    ),
                }));
            }

            self.cursor = following;
            return Some(Ok(record));
        }
    }
}
