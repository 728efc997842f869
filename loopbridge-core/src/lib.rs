//! Board-agnostic control logic for the Loopbridge sensor bridge.
//!
//! Everything in this crate is `no_std` and free of hardware access so it
//! can be unit tested on the host. The firmware crate wires these pieces
//! to the radio, flash and peripherals.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod control;
pub mod events;
pub mod indicator;
pub mod sampling;
pub mod traits;

pub use config::{CalEquation, CalRecord, ConfigRecord, ConfigStore};
pub use control::Controller;
pub use events::EventFlags;
pub use indicator::{Indicator, IndicatorMode};
