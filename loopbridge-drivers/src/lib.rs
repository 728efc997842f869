//! Sensor drivers: the ADC121 loop-current converter, the LD2410 ranging
//! radar frame parser, and the registry that maps configured sensor ids
//! to live driver instances.

#![cfg_attr(not(test), no_std)]

pub mod adc121;
pub mod ld2410;
pub mod registry;

pub use adc121::Adc121;
pub use ld2410::Ld2410;
pub use registry::SensorRegistry;
