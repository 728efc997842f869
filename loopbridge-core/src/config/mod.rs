//! Persistent device configuration.
//!
//! The whole configuration lives in a single [`ConfigRecord`] that is
//! serialized with postcard into a fixed slot of the flash region, followed
//! by a little-endian version tag. Calibration additionally has its own
//! slot so a factory reset can carry it over.

mod calibration;
mod store;
mod types;

pub use calibration::{CalEquation, CalPoint, CalRecord, CAL_POINTS};
pub use store::{ConfigError, ConfigStore, LoadOutcome, CAL_OFFSET, CONFIG_OFFSET, CONFIG_SLOT_LEN, VERSION_OFFSET};
pub use types::{
    ApConfig, ConfigRecord, IpQuad, Location, NtpConfig, PubTopic, ServiceConfig, TimeUnit,
    UdpConfig, WifiConfig, WifiMode, CFG_VERSION, CLIENT_ID_LEN, HOST_LEN, PASS_LEN, SENSOR_ID_LEN,
    SSID_LEN, TOPIC_LEN,
};
