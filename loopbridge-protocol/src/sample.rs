//! Ranging-sensor sample frames
//!
//! A [`SampleFrame`] is one fixed-shape snapshot of the ranging sensor's
//! accessor outputs, produced once per sampling interval. Frames travel
//! from the sampler to the controller through a bounded queue and are
//! optionally forwarded to a UDP sink as a comma-separated record.

use core::fmt::{self, Write};

use heapless::String;

/// Number of distance gates reported by the ranging sensor
pub const MAX_GATES: usize = 9;

/// Maximum encoded CSV record length
///
/// Six u16/u8 header fields plus 2 x 9 gate energies, comma separated.
pub const MAX_CSV_LEN: usize = 160;

/// One snapshot of ranging-sensor outputs
///
/// Distances are centimeters, energies are unitless 0-100 levels as
/// reported by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleFrame {
    pub detection_distance: u16,
    pub stationary_distance: u16,
    pub stationary_energy: u8,
    pub moving_distance: u16,
    pub moving_energy: u8,
    pub retain: u16,
    pub moving_gate_energy: [u8; MAX_GATES],
    pub static_gate_energy: [u8; MAX_GATES],
}

impl SampleFrame {
    /// Encode as the UDP sink record:
    ///
    /// `stationaryDistance,stationaryEnergy,movingDistance,movingEnergy,
    /// detectionDistance,retain,<moving gate energies>,<static gate energies>`
    pub fn to_csv(&self) -> Result<String<MAX_CSV_LEN>, fmt::Error> {
        let mut out = String::new();
        write!(
            out,
            "{},{},{},{},{},{}",
            self.stationary_distance,
            self.stationary_energy,
            self.moving_distance,
            self.moving_energy,
            self.detection_distance,
            self.retain,
        )?;
        for energy in &self.moving_gate_energy {
            write!(out, ",{energy}")?;
        }
        for energy in &self.static_gate_energy {
            write!(out, ",{energy}")?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_field_order() {
        let frame = SampleFrame {
            detection_distance: 250,
            stationary_distance: 120,
            stationary_energy: 55,
            moving_distance: 80,
            moving_energy: 42,
            retain: 3,
            moving_gate_energy: [1, 2, 3, 4, 5, 6, 7, 8, 9],
            static_gate_energy: [9, 8, 7, 6, 5, 4, 3, 2, 1],
        };

        let csv = frame.to_csv().unwrap();
        assert_eq!(
            csv.as_str(),
            "120,55,80,42,250,3,1,2,3,4,5,6,7,8,9,9,8,7,6,5,4,3,2,1"
        );
    }

    #[test]
    fn test_csv_fits_at_max_values() {
        let frame = SampleFrame {
            detection_distance: u16::MAX,
            stationary_distance: u16::MAX,
            stationary_energy: u8::MAX,
            moving_distance: u16::MAX,
            moving_energy: u8::MAX,
            retain: u16::MAX,
            moving_gate_energy: [u8::MAX; MAX_GATES],
            static_gate_energy: [u8::MAX; MAX_GATES],
        };

        // Worst case must still fit the bounded buffer
        let csv = frame.to_csv().unwrap();
        assert!(csv.len() <= MAX_CSV_LEN);
    }

    #[test]
    fn test_csv_default_frame() {
        let csv = SampleFrame::default().to_csv().unwrap();
        // 6 header fields + 18 gate fields, all zero
        assert_eq!(csv.split(',').count(), 6 + 2 * MAX_GATES);
        assert!(csv.split(',').all(|f| f == "0"));
    }
}
