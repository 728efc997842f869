//! MQTT publish payloads
//!
//! Renders the three JSON frames consumed by the telemetry backend.
//! The frames are small and fixed-shape, so they are formatted directly
//! into bounded buffers rather than going through a serializer.
//!
//! All timestamps are epoch milliseconds.

use core::fmt::{self, Write};

use heapless::String;

/// Maximum rendered payload length
pub const MAX_PAYLOAD_LEN: usize = 512;

/// One calibrated sensor reading destined for a measurement frame
#[derive(Debug, Clone, Copy)]
pub struct Reading<'a> {
    /// Logical sensor identifier (from the calibration record)
    pub sensor_id: &'a str,
    /// Calibrated physical value
    pub value: f64,
    /// Engineering unit, e.g. "ppb"
    pub unit: &'a str,
    /// Whether the underlying raw read succeeded
    pub ok: bool,
}

/// Render a measurement frame:
///
/// `{ "<id>": { "value": n, "context": {"unit": u, "status": "ok"|"fail"} },
///   ..., "timestamp": epoch_ms }`
pub fn measurement(
    readings: &[Reading<'_>],
    timestamp_ms: u64,
) -> Result<String<MAX_PAYLOAD_LEN>, fmt::Error> {
    let mut out = String::new();
    out.push_str("{ ").map_err(|_| fmt::Error)?;
    for reading in readings {
        let status = if reading.ok { "ok" } else { "fail" };
        write!(
            out,
            "\"{}\": {{ \"value\": {}, \"context\": {{\"unit\": \"{}\", \"status\": \"{}\"}} }}, ",
            reading.sensor_id, reading.value, reading.unit, status
        )?;
    }
    write!(out, "\"timestamp\": {timestamp_ms} }}")?;
    Ok(out)
}

/// Render a status frame: `{ "batt": n, "timestamp": epoch_ms }`
pub fn status(batt: f64, timestamp_ms: u64) -> Result<String<MAX_PAYLOAD_LEN>, fmt::Error> {
    let mut out = String::new();
    write!(
        out,
        "{{ \"batt\": {batt}, \"timestamp\": {timestamp_ms} }}"
    )?;
    Ok(out)
}

/// Render an info frame:
/// `{ "location": {"lat": n, "lng": n}, "timestamp": epoch_ms }`
pub fn info(lat: f64, lng: f64, timestamp_ms: u64) -> Result<String<MAX_PAYLOAD_LEN>, fmt::Error> {
    let mut out = String::new();
    write!(
        out,
        "{{ \"location\": {{\"lat\": {lat}, \"lng\": {lng}}}, \"timestamp\": {timestamp_ms} }}"
    )?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_frame_shape() {
        let readings = [Reading {
            sensor_id: "ch4",
            value: 1001.5,
            unit: "ppb",
            ok: true,
        }];
        let json = measurement(&readings, 1_700_000_000_123).unwrap();
        assert_eq!(
            json.as_str(),
            "{ \"ch4\": { \"value\": 1001.5, \"context\": {\"unit\": \"ppb\", \"status\": \"ok\"} }, \
             \"timestamp\": 1700000000123 }"
        );
    }

    #[test]
    fn test_measurement_failed_reading() {
        let readings = [Reading {
            sensor_id: "co2",
            value: 0.0,
            unit: "ppm",
            ok: false,
        }];
        let json = measurement(&readings, 1).unwrap();
        assert!(json.contains("\"status\": \"fail\""));
        assert!(json.contains("\"value\": 0"));
    }

    #[test]
    fn test_measurement_two_sensors() {
        let readings = [
            Reading {
                sensor_id: "ch4",
                value: 12.5,
                unit: "ppb",
                ok: true,
            },
            Reading {
                sensor_id: "co2",
                value: 400.0,
                unit: "ppm",
                ok: true,
            },
        ];
        let json = measurement(&readings, 42).unwrap();
        assert!(json.contains("\"ch4\""));
        assert!(json.contains("\"co2\""));
        assert!(json.ends_with("\"timestamp\": 42 }"));
    }

    #[test]
    fn test_status_frame() {
        let json = status(3.7, 1_700_000_000_000).unwrap();
        assert_eq!(
            json.as_str(),
            "{ \"batt\": 3.7, \"timestamp\": 1700000000000 }"
        );
    }

    #[test]
    fn test_info_frame() {
        let json = info(40.4168, -3.7038, 99).unwrap();
        assert_eq!(
            json.as_str(),
            "{ \"location\": {\"lat\": 40.4168, \"lng\": -3.7038}, \"timestamp\": 99 }"
        );
    }
}
