//! File-backed device
//!
//! Emulates an EEPROM part with a flat image file. A fresh or short image
//! is padded with the erased byte up to the requested capacity.

use super::{check_range, PersistentMemory, ERASED_BYTE};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Emulated EEPROM stored in a file
pub struct FileDevice {
    path: PathBuf,
    capacity: u32,
    file: Mutex<File>,
}

impl FileDevice {
    /// Open or create an image of `capacity` bytes
    ///
    /// Existing images larger than `capacity` are rejected so a smaller
    /// configuration never silently ignores data.
    pub fn open<P: AsRef<Path>>(path: P, capacity: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let current = file.metadata()?.len();
        if current > capacity as u64 {
            return Err(Error::Storage(format!(
                "Image {} is {} bytes, larger than device capacity {}",
                path.display(),
                current,
                capacity
            )));
        }
        if current < capacity as u64 {
            let padding = vec![ERASED_BYTE; (capacity as u64 - current) as usize];
            file.seek(SeekFrom::End(0))?;
            file.write_all(&padding)?;
            file.sync_all()?;
            debug!(path = ?path, padded = padding.len(), "Padded device image");
        }

        info!(path = ?path, capacity, "Opened file device");
        Ok(Self {
            path,
            capacity,
            file: Mutex::new(file),
        })
    }

    /// Path of the backing image
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for FileDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDevice")
            .field("path", &self.path)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl PersistentMemory for FileDevice {
    fn capacity(&self) -> u32 {
        self.capacity
    }

    fn read_byte(&self, address: u32) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.read_bytes(address, &mut byte)?;
        Ok(byte[0])
    }

    fn write_byte(&mut self, address: u32, value: u8) -> Result<()> {
        self.write_bytes(address, &[value])
    }

    fn read_bytes(&self, address: u32, buf: &mut [u8]) -> Result<()> {
        check_range(self.capacity, address, buf.len())?;
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(address as u64))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_bytes(&mut self, address: u32, bytes: &[u8]) -> Result<()> {
        check_range(self.capacity, address, bytes.len())?;
        let file = self.file.get_mut();
        file.seek(SeekFrom::Start(address as u64))?;
        file.write_all(bytes)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.file.get_mut().sync_all()?;
        Ok(())
    }
}
