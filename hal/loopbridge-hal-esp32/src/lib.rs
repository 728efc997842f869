//! ESP32-specific HAL implementations for Loopbridge
//!
//! Implements the `loopbridge-hal` storage trait on top of the ESP32's
//! main flash via `esp-storage`.

#![no_std]

pub mod flash;

pub use flash::EspNvStorage;
