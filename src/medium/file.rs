//! File-backed flash image
//!
//! Stores a flash image in a regular file so a store survives process
//! restarts. Byte `0` of the file corresponds to physical address `base`.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::{checked_offset, Medium, MediumError, ERASED_BYTE};

/// When to fsync the image file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every write and erase (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced writes or erases
    EveryNWrites { count: usize },
}

/// Flash image stored in a file
pub struct FileFlash {
    /// Image file path
    path: PathBuf,
    file: File,
    base: u32,
    size: u32,
    erase_size: u32,
    sync_strategy: SyncStrategy,
    /// Writes and erases not yet synced
    unsynced: usize,
}

impl FileFlash {
    /// Create a new, fully erased image of `size` bytes
    ///
    /// Truncates any existing file at `path`.
    pub fn create(path: &Path, base: u32, size: u32, erase_size: u32) -> Result<Self, MediumError> {
        if erase_size == 0 || size % erase_size != 0 {
            return Err(MediumError::Misaligned(size));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let block = vec![ERASED_BYTE; erase_size as usize];
        for _ in 0..size / erase_size {
            file.write_all(&block)?;
        }
        file.sync_all()?;

        tracing::debug!("Created flash image {} ({} bytes)", path.display(), size);

        Ok(Self {
            path: path.to_path_buf(),
            file,
            base,
            size,
            erase_size,
            sync_strategy: SyncStrategy::EveryWrite,
            unsynced: 0,
        })
    }

    /// Open an existing image; its size is taken from the file
    pub fn open(path: &Path, base: u32, erase_size: u32) -> Result<Self, MediumError> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();

        if len > u32::MAX as u64 {
            return Err(MediumError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("flash image too large: {} bytes", len),
            )));
        }
        let size = len as u32;
        if erase_size == 0 || size % erase_size != 0 {
            return Err(MediumError::Misaligned(size));
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            base,
            size,
            erase_size,
            sync_strategy: SyncStrategy::EveryWrite,
            unsynced: 0,
        })
    }

    /// Set the sync strategy
    pub fn with_sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.sync_strategy = strategy;
        self
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<(), MediumError> {
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Number of writes and erases not yet synced
    pub fn unsynced_count(&self) -> usize {
        self.unsynced
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    fn after_mutation(&mut self) -> Result<(), MediumError> {
        self.unsynced += 1;
        let due = match self.sync_strategy {
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNWrites { count } => self.unsynced >= count,
        };
        if due {
            self.sync()?;
        }
        Ok(())
    }
}

impl Medium for FileFlash {
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), MediumError> {
        let offset = checked_offset(self.base, self.size, address, buf.len())?;
        self.file.seek(SeekFrom::Start(offset as u64))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), MediumError> {
        let offset = checked_offset(self.base, self.size, address, data.len())?;
        self.file.seek(SeekFrom::Start(offset as u64))?;
        self.file.write_all(data)?;
        self.after_mutation()
    }

    fn erase(&mut self, address: u32) -> Result<(), MediumError> {
        let offset = checked_offset(self.base, self.size, address, self.erase_size as usize)?;
        if offset % self.erase_size as usize != 0 {
            return Err(MediumError::Misaligned(address));
        }

        self.file.seek(SeekFrom::Start(offset as u64))?;
        self.file.write_all(&vec![ERASED_BYTE; self.erase_size as usize])?;
        self.after_mutation()
    }

    fn erase_size(&self) -> Option<u32> {
        Some(self.erase_size)
    }
}

impl Drop for FileFlash {
    fn drop(&mut self) {
        if self.unsynced > 0 {
            if let Err(e) = self.file.sync_data() {
                tracing::warn!("Failed to sync flash image {}: {}", self.path.display(), e);
            }
        }
    }
}
