//! Sensor abstraction traits implemented by the driver crate.

mod sensor;

pub use sensor::{RawAdc, SensorSource};
