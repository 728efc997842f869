//! Flash-backed storage region for ESP32
//!
//! Maps a small partition at the end of main flash and exposes it through
//! the `NvStorage` trait. `esp-storage` handles the read-modify-erase-write
//! cycle for sub-sector writes.

use embedded_storage::{ReadStorage, Storage};
use esp_storage::FlashStorage;
use log::error;

use loopbridge_hal::{NvStorage, StorageError};

/// Total flash size on the target board (4MB WROOM module)
pub const FLASH_SIZE: usize = 4 * 1024 * 1024;

/// Size reserved for the config/calibration region
pub const REGION_SIZE: usize = 4 * 1024;

/// Region base, placed in the last sector of flash
pub const REGION_BASE: u32 = (FLASH_SIZE - REGION_SIZE) as u32;

/// ESP32 flash storage region
///
/// Offsets passed to [`NvStorage`] methods are relative to [`REGION_BASE`].
pub struct EspNvStorage {
    flash: FlashStorage,
}

impl EspNvStorage {
    /// Create a new storage region over the main flash
    pub fn new() -> Self {
        Self {
            flash: FlashStorage::new(),
        }
    }
}

impl Default for EspNvStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl NvStorage for EspNvStorage {
    fn capacity(&self) -> usize {
        REGION_SIZE
    }

    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), StorageError> {
        if offset as usize + buf.len() > REGION_SIZE {
            return Err(StorageError::OutOfBounds);
        }
        self.flash.read(REGION_BASE + offset, buf).map_err(|e| {
            error!("flash read at +{offset} failed: {e:?}");
            StorageError::Io
        })
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), StorageError> {
        if offset as usize + data.len() > REGION_SIZE {
            return Err(StorageError::OutOfBounds);
        }
        self.flash.write(REGION_BASE + offset, data).map_err(|e| {
            error!("flash write at +{offset} failed: {e:?}");
            StorageError::Io
        })
    }
}
