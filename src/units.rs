//! Newtype wrappers for the aviation units shown in the kinematic readout.
//!
//! These prevent accidental mixing of altitude, speed and climb rate when
//! values move between the simulation, the live feed and the render layer.

use serde::{Deserialize, Serialize};

use crate::geo::{FEET_TO_METERS, FL_THRESHOLD, NM_TO_KM};

/// Altitude in feet.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Feet(pub f64);

impl Feet {
    pub fn from_meters(meters: f64) -> Self {
        Feet(meters / FEET_TO_METERS)
    }

    /// Flight level (hundreds of feet).
    pub fn to_flight_level(self) -> i32 {
        (self.0 / 100.0).round() as i32
    }
}

impl std::fmt::Display for Feet {
    /// At or above FL_THRESHOLD shows a flight level ("FL350"), below that feet.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 >= FL_THRESHOLD as f64 {
            write!(f, "FL{:03}", self.to_flight_level())
        } else {
            write!(f, "{} ft", self.0.round() as i32)
        }
    }
}

/// Ground speed in knots.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Knots(pub f64);

impl Knots {
    pub fn from_meters_per_second(ms: f64) -> Self {
        Knots(ms * 3600.0 / (NM_TO_KM * 1000.0))
    }
}

impl std::fmt::Display for Knots {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} kts", self.0.round() as i32)
    }
}

/// Vertical speed in feet per minute, positive when climbing.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct FeetPerMinute(pub f64);

impl FeetPerMinute {
    /// Arrow glyph for compact displays.
    pub fn indicator(self) -> &'static str {
        if self.0 > 100.0 {
            "↑"
        } else if self.0 < -100.0 {
            "↓"
        } else {
            "→"
        }
    }
}

impl std::fmt::Display for FeetPerMinute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:+} fpm", self.0.round() as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_feet_display_switches_to_flight_level() {
        assert_eq!(Feet(12500.0).to_string(), "12500 ft");
        assert_eq!(Feet(35000.0).to_string(), "FL350");
        assert_eq!(Feet(18000.0).to_string(), "FL180");
    }

    #[test]
    fn test_knots_conversions() {
        assert_relative_eq!(Knots::from_meters_per_second(231.5).0, 450.0, epsilon = 0.1);
    }

    #[test]
    fn test_vertical_speed_display() {
        assert_eq!(FeetPerMinute(1800.4).to_string(), "+1800 fpm");
        assert_eq!(FeetPerMinute(-950.0).to_string(), "-950 fpm");
        assert_eq!(FeetPerMinute(0.0).indicator(), "→");
        assert_eq!(FeetPerMinute(2000.0).indicator(), "↑");
    }

    #[test]
    fn test_feet_from_meters() {
        assert_relative_eq!(Feet::from_meters(3048.0).0, 10_000.0, epsilon = 1e-9);
    }
}
