//! Loopbridge Hardware Abstraction Layer
//!
//! This crate defines hardware abstraction traits that can be implemented
//! by chip-specific HALs. This keeps the bridge's control logic
//! board-agnostic and testable on the host.
//!
//! # Traits
//!
//! - [`gpio::OutputPin`], [`gpio::InputPin`] - Digital I/O (status LEDs, button)
//! - [`storage::NvStorage`] - Byte-addressed non-volatile storage for the
//!   configuration and calibration slots

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod storage;

// Re-export key traits at crate root for convenience
pub use gpio::{InputPin, OutputPin};
pub use storage::{NvStorage, StorageError};
