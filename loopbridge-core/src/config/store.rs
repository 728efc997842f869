//! Flash-backed configuration store.
//!
//! Layout inside the storage region:
//!
//! | offset | length | contents                              |
//! |--------|--------|---------------------------------------|
//! | 0      | 768    | postcard-encoded [`ConfigRecord`]     |
//! | 768    | 4      | little-endian [`CFG_VERSION`] tag     |
//! | 900    | 96     | postcard-encoded [`CalRecord`]        |
//!
//! The standalone calibration slot survives a factory reset so a device
//! calibrated at the bench does not lose its anchors in the field.

use loopbridge_hal::storage::{NvStorage, StorageError};

use super::calibration::CalRecord;
use super::types::{ConfigRecord, CFG_VERSION};

pub const CONFIG_OFFSET: u32 = 0;
pub const CONFIG_SLOT_LEN: usize = 768;
pub const VERSION_OFFSET: u32 = CONFIG_OFFSET + CONFIG_SLOT_LEN as u32;
pub const CAL_OFFSET: u32 = 900;
pub const CAL_SLOT_LEN: usize = 96;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    Storage(StorageError),
    /// The slot layout does not fit the backing storage region.
    RegionOverlap,
    Encode,
}

impl From<StorageError> for ConfigError {
    fn from(err: StorageError) -> Self {
        ConfigError::Storage(err)
    }
}

/// What `load` found in flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A record with a matching version tag was decoded.
    Loaded,
    /// The tag was missing, stale, or the record undecodable. Factory
    /// defaults were written back.
    DefaultsRestored,
}

pub struct ConfigStore<S: NvStorage> {
    storage: S,
    mac: [u8; 6],
}

impl<S: NvStorage> ConfigStore<S> {
    pub fn new(storage: S, mac: [u8; 6]) -> Self {
        Self { storage, mac }
    }

    /// Verify the slot layout fits the backing region.
    pub fn check_layout(&self) -> Result<(), ConfigError> {
        let cal_end = CAL_OFFSET as usize + CAL_SLOT_LEN;
        if VERSION_OFFSET as usize + 4 > CAL_OFFSET as usize || cal_end > self.storage.capacity() {
            return Err(ConfigError::RegionOverlap);
        }
        Ok(())
    }

    /// Load the configuration, restoring factory defaults on a version
    /// mismatch or an undecodable record.
    pub fn load(&mut self) -> Result<(ConfigRecord, LoadOutcome), ConfigError> {
        self.check_layout()?;

        let mut tag = [0u8; 4];
        self.storage.read(VERSION_OFFSET, &mut tag)?;
        let cal = self.read_calibration()?;

        if u32::from_le_bytes(tag) == CFG_VERSION {
            let mut slot = [0u8; CONFIG_SLOT_LEN];
            self.storage.read(CONFIG_OFFSET, &mut slot)?;
            // Trailing slot bytes past the encoded record are ignored.
            if let Ok(cfg) = postcard::from_bytes::<ConfigRecord>(&slot) {
                return Ok((cfg, LoadOutcome::Loaded));
            }
            log::warn!("stored config undecodable, restoring defaults");
        } else {
            log::warn!(
                "config version tag {:#010x} != {:#010x}, restoring defaults",
                u32::from_le_bytes(tag),
                CFG_VERSION
            );
        }

        let cfg = self.write_defaults(&cal)?;
        Ok((cfg, LoadOutcome::DefaultsRestored))
    }

    /// Persist the record. The version tag is written alongside so a save
    /// always leaves a loadable image behind.
    pub fn save(&mut self, cfg: &ConfigRecord) -> Result<(), ConfigError> {
        let mut slot = [0u8; CONFIG_SLOT_LEN];
        let used = postcard::to_slice(cfg, &mut slot)
            .map_err(|_| ConfigError::Encode)?
            .len();
        self.storage.write(CONFIG_OFFSET, &slot[..used])?;
        self.storage.write(VERSION_OFFSET, &CFG_VERSION.to_le_bytes())?;
        Ok(())
    }

    /// Persist calibration into its standalone slot.
    pub fn save_calibration(&mut self, cal: &CalRecord) -> Result<(), ConfigError> {
        let mut slot = [0u8; CAL_SLOT_LEN];
        let used = postcard::to_slice(cal, &mut slot)
            .map_err(|_| ConfigError::Encode)?
            .len();
        self.storage.write(CAL_OFFSET, &slot[..used])?;
        Ok(())
    }

    /// Overwrite everything except the calibration slot with factory
    /// defaults and return the new record.
    pub fn reset_to_default(&mut self) -> Result<ConfigRecord, ConfigError> {
        self.check_layout()?;
        let cal = self.read_calibration()?;
        self.write_defaults(&cal)
    }

    fn read_calibration(&mut self) -> Result<CalRecord, ConfigError> {
        let mut slot = [0u8; CAL_SLOT_LEN];
        self.storage.read(CAL_OFFSET, &mut slot)?;
        // An erased or corrupt slot falls back to the zeroed record.
        Ok(postcard::from_bytes(&slot).unwrap_or_default())
    }

    fn write_defaults(&mut self, cal: &CalRecord) -> Result<ConfigRecord, ConfigError> {
        let cfg = ConfigRecord::defaults(self.mac, cal);
        self.save(&cfg)?;
        self.save_calibration(cal)?;
        Ok(cfg)
    }
}
