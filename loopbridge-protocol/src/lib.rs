//! Telemetry wire formats for the Loopbridge sensor bridge
//!
//! Defines the fixed-shape records exchanged with external consumers:
//!
//! - [`sample::SampleFrame`] - one snapshot of ranging-sensor outputs,
//!   with its comma-separated UDP sink encoding
//! - [`payload`] - the three JSON frames published over MQTT
//!   (measurements, status, info)
//!
//! All encoders render into bounded `heapless` buffers; nothing here
//! allocates.

#![no_std]
#![deny(unsafe_code)]

pub mod payload;
pub mod sample;

pub use payload::Reading;
pub use sample::{SampleFrame, MAX_GATES};
