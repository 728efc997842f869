//! Two-point linear calibration for the 4-20mA loop input.

use heapless::String;
use serde::{Deserialize, Serialize};

use super::types::SENSOR_ID_LEN;

pub const CAL_POINTS: usize = 2;

/// One calibration anchor: raw ADC count paired with the engineering value
/// it should map to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CalPoint {
    pub x: i16,
    pub y: f64,
}

/// Persisted calibration: two anchors plus the ids used to label readings
/// in telemetry payloads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalRecord {
    pub points: [CalPoint; CAL_POINTS],
    pub sensor_1: String<SENSOR_ID_LEN>,
    pub sensor_2: String<SENSOR_ID_LEN>,
}

/// The line through the two calibration anchors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalEquation {
    pub slope: f64,
    pub intercept: f64,
}

impl Default for CalEquation {
    /// Identity mapping: raw counts pass through unchanged.
    fn default() -> Self {
        Self {
            slope: 1.0,
            intercept: 0.0,
        }
    }
}

impl CalEquation {
    /// Fit the line through `(x0, y0)` and `(x1, y1)`.
    ///
    /// Coincident x anchors would divide by zero; the denominator is clamped
    /// to one so the result stays finite and the device keeps reporting.
    pub fn fit(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        let mut denom = x1 - x0;
        if denom == 0.0 {
            denom = 1.0;
        }
        let slope = (y1 - y0) / denom;
        Self {
            slope,
            intercept: y0 - slope * x0,
        }
    }

    pub fn from_record(rec: &CalRecord) -> Self {
        Self::fit(
            rec.points[0].x as f64,
            rec.points[0].y,
            rec.points[1].x as f64,
            rec.points[1].y,
        )
    }

    /// Map a raw reading to engineering units.
    pub fn apply(&self, raw: f64) -> f64 {
        self.slope * raw + self.intercept
    }

    /// Map a raw reading and clamp the result into `[min, max]`, for
    /// sensors whose engineering range is hard-bounded.
    pub fn apply_clamped(&self, raw: f64, min: f64, max: f64) -> f64 {
        self.apply(raw).clamp(min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn identity_by_default() {
        let eq = CalEquation::default();
        assert_eq!(eq.apply(2048.0), 2048.0);
    }

    #[test]
    fn maps_anchors_exactly() {
        // 4mA -> 0.0, 20mA -> 100.0 over a 12-bit count range
        let eq = CalEquation::fit(819.0, 0.0, 4095.0, 100.0);
        assert!((eq.apply(819.0) - 0.0).abs() < 1e-9);
        assert!((eq.apply(4095.0) - 100.0).abs() < 1e-9);
        // midpoint lands on the line
        let mid = eq.apply((819.0 + 4095.0) / 2.0);
        assert!((mid - 50.0).abs() < 1e-9);
    }

    #[test]
    fn coincident_anchors_stay_finite() {
        let eq = CalEquation::fit(1000.0, 3.0, 1000.0, 7.0);
        assert!(eq.slope.is_finite());
        assert!(eq.intercept.is_finite());
        assert_eq!(eq.slope, 4.0);
    }

    #[test]
    fn clamped_apply_stays_in_range() {
        let eq = CalEquation::fit(819.0, 4.0, 4095.0, 20.0);
        assert_eq!(eq.apply_clamped(0.0, 4.0, 20.0), 4.0);
        assert_eq!(eq.apply_clamped(8000.0, 4.0, 20.0), 20.0);
        let mid = eq.apply_clamped(2457.0, 4.0, 20.0);
        assert!(mid > 4.0 && mid < 20.0);
    }

    #[test]
    fn defaulted_record_yields_zero_line() {
        let eq = CalEquation::from_record(&CalRecord::default());
        assert_eq!(eq.apply(1234.0), 0.0);
    }

    proptest! {
        #[test]
        fn fit_is_always_finite(
            x0 in -32768i16..=32767,
            y0 in -1.0e6f64..1.0e6,
            x1 in -32768i16..=32767,
            y1 in -1.0e6f64..1.0e6,
        ) {
            let eq = CalEquation::fit(x0 as f64, y0, x1 as f64, y1);
            prop_assert!(eq.slope.is_finite());
            prop_assert!(eq.intercept.is_finite());
            prop_assert!(eq.apply(0.0).is_finite());
        }

        #[test]
        fn distinct_anchors_round_trip(
            x0 in -32768i16..=32767,
            y0 in -1.0e6f64..1.0e6,
            x1 in -32768i16..=32767,
            y1 in -1.0e6f64..1.0e6,
        ) {
            prop_assume!(x0 != x1);
            let eq = CalEquation::fit(x0 as f64, y0, x1 as f64, y1);
            let tol = 1e-6 * (1.0 + y0.abs().max(y1.abs()));
            prop_assert!((eq.apply(x0 as f64) - y0).abs() <= tol);
            prop_assert!((eq.apply(x1 as f64) - y1).abs() <= tol);
        }
    }
}
