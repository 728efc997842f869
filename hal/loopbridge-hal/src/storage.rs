//! Non-volatile storage abstraction
//!
//! Provides a trait for byte-addressed persistent storage used by the
//! configuration store. The persisted layout is positional (config slot,
//! version tag, calibration slot at fixed offsets), so the trait exposes
//! offset-based reads and writes rather than a key-value interface.

/// Errors from non-volatile storage operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested range falls outside the backing region
    OutOfBounds,
    /// Underlying flash/EEPROM operation failed
    Io,
}

/// Byte-addressed non-volatile storage region
///
/// Implementations map a fixed region of flash or EEPROM and should
/// handle erase-before-write semantics internally. Offsets are relative
/// to the start of the region.
pub trait NvStorage {
    /// Total size of the backing region in bytes
    fn capacity(&self) -> usize;

    /// Read `buf.len()` bytes starting at `offset`
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Write `data` starting at `offset`
    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), StorageError>;
}
