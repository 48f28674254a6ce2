//! Three-phase (climb / cruise / descent) kinematic model driven by progress.
//!
//! Altitude and speed come from eased curves joined at fixed progress
//! thresholds. Vertical speed has its own lookup table and is deliberately
//! not the derivative of the altitude curve.

use rand::Rng;
use std::f64::consts::PI;

use crate::units::{Feet, FeetPerMinute, Knots};

/// End of the climb phase.
pub const CLIMB_END: f64 = 0.15;
/// Start of the descent phase.
pub const DESCENT_START: f64 = 0.85;

/// Altitude at the start of the climb and the end of the descent.
pub const ALTITUDE_FLOOR_FT: f64 = 1500.0;
/// Below this altitude ground speed is capped.
pub const LOW_ALTITUDE_FT: f64 = 10_000.0;
pub const LOW_ALTITUDE_SPEED_CAP_KT: f64 = 250.0;
/// Speed right after takeoff and right before touchdown.
pub const TERMINAL_SPEED_KT: f64 = 160.0;

pub const MIN_ALTITUDE_FT: f64 = 1000.0;
pub const MAX_ALTITUDE_FT: f64 = 41_000.0;
pub const MIN_SPEED_KT: f64 = 150.0;
pub const MAX_SPEED_KT: f64 = 550.0;

const CRUISE_ALTITUDE_WOBBLE_FT: f64 = 300.0;
const CRUISE_SPEED_WOBBLE_KT: f64 = 12.0;
const CRUISE_VS_WOBBLE_FPM: f64 = 150.0;

/// Jitter scale per unit of turbulence coefficient.
pub const ALTITUDE_JITTER_FT: f64 = 400.0;
pub const SPEED_JITTER_KT: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightPhase {
    Climb,
    Cruise,
    Descent,
}

impl FlightPhase {
    pub fn at(progress: f64) -> Self {
        if progress < CLIMB_END {
            FlightPhase::Climb
        } else if progress > DESCENT_START {
            FlightPhase::Descent
        } else {
            FlightPhase::Cruise
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FlightPhase::Climb => "Climb",
            FlightPhase::Cruise => "Cruise",
            FlightPhase::Descent => "Descent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turbulence {
    Calm,
    Moderate,
    Severe,
}

impl Turbulence {
    pub fn from_coefficient(coefficient: f64) -> Self {
        if coefficient > 0.15 {
            Turbulence::Severe
        } else if coefficient > 0.05 {
            Turbulence::Moderate
        } else {
            Turbulence::Calm
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Turbulence::Calm => "Calm",
            Turbulence::Moderate => "Moderate",
            Turbulence::Severe => "Severe",
        }
    }
}

/// Cruise altitude and speed for one flight, picked once from the route length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CruiseProfile {
    pub altitude: Feet,
    pub speed: Knots,
}

impl CruiseProfile {
    /// Bucket the direct route distance (degrees) into short, medium and long
    /// haul and pick a random offset within the bucket.
    pub fn for_distance(distance_deg: f64, rng: &mut impl Rng) -> Self {
        let (base_alt, alt_range, base_speed) = if distance_deg < 5.0 {
            (24_000.0, 6_000.0, 380.0)
        } else if distance_deg < 12.0 {
            (31_000.0, 6_000.0, 430.0)
        } else {
            (35_000.0, 4_000.0, 470.0)
        };
        Self {
            altitude: Feet(base_alt + rng.random_range(0.0..alt_range)),
            speed: Knots(base_speed + rng.random_range(0.0..40.0)),
        }
    }
}

/// Kinematic readout for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicState {
    pub phase: FlightPhase,
    pub altitude: Feet,
    pub speed: Knots,
    pub vertical_speed: FeetPerMinute,
    pub turbulence: Turbulence,
}

/// Symmetric quadratic ease-in-ease-out on [0, 1].
pub fn ease_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Ground speed implied by altitude during climb and descent: capped below
/// the low-altitude threshold, ramping to cruise speed above it.
fn speed_for_altitude(altitude: f64, cruise_altitude: f64, cruise_speed: f64) -> f64 {
    if altitude < LOW_ALTITUDE_FT {
        let frac = ((altitude - ALTITUDE_FLOOR_FT) / (LOW_ALTITUDE_FT - ALTITUDE_FLOOR_FT)).clamp(0.0, 1.0);
        (TERMINAL_SPEED_KT + (LOW_ALTITUDE_SPEED_CAP_KT - TERMINAL_SPEED_KT) * frac).min(LOW_ALTITUDE_SPEED_CAP_KT)
    } else {
        let span = (cruise_altitude - LOW_ALTITUDE_FT).max(1.0);
        let frac = ((altitude - LOW_ALTITUDE_FT) / span).clamp(0.0, 1.0);
        LOW_ALTITUDE_SPEED_CAP_KT + (cruise_speed - LOW_ALTITUDE_SPEED_CAP_KT) * frac
    }
}

/// Vertical speed lookup. Breakpoints at phase-local 0.2 and 0.8.
fn vertical_speed(phase: FlightPhase, local: f64, seed: f64) -> f64 {
    match phase {
        FlightPhase::Climb => {
            if local < 0.2 {
                2500.0 + 1000.0 * (local / 0.2)
            } else if local < 0.8 {
                3500.0 - 1500.0 * ((local - 0.2) / 0.6)
            } else {
                2000.0 * ((1.0 - local) / 0.2)
            }
        }
        FlightPhase::Cruise => {
            CRUISE_VS_WOBBLE_FPM * (PI * local).sin() * (local * 8.0 * PI + seed).sin()
        }
        FlightPhase::Descent => {
            if local < 0.2 {
                -2000.0 * (local / 0.2)
            } else if local < 0.8 {
                -2000.0 - 500.0 * ((local - 0.2) / 0.6)
            } else {
                -2500.0 + 1700.0 * ((local - 0.8) / 0.2)
            }
        }
    }
}

/// Phase-model inputs that stay fixed for a flight between recycles.
#[derive(Debug, Clone, Copy)]
pub struct PhaseModel {
    pub cruise: CruiseProfile,
    pub seed: f64,
    pub wind_factor: f64,
    pub turbulence: f64,
}

impl PhaseModel {
    /// Deterministic state at `progress`, clamped to the global envelope,
    /// before any turbulence jitter.
    pub fn evaluate(&self, progress: f64) -> KinematicState {
        let p = progress.clamp(0.0, 1.0);
        let phase = FlightPhase::at(p);
        let cruise_alt = self.cruise.altitude.0;
        let cruise_speed = self.cruise.speed.0 * self.wind_factor;

        let (local, altitude, speed) = match phase {
            FlightPhase::Climb => {
                let local = p / CLIMB_END;
                let alt = ALTITUDE_FLOOR_FT + (cruise_alt - ALTITUDE_FLOOR_FT) * ease_in_out(local);
                (local, alt, speed_for_altitude(alt, cruise_alt, cruise_speed))
            }
            FlightPhase::Cruise => {
                let local = (p - CLIMB_END) / (DESCENT_START - CLIMB_END);
                // the envelope pins the wobble to zero at both phase boundaries
                let envelope = (PI * local).sin();
                let alt = cruise_alt
                    + CRUISE_ALTITUDE_WOBBLE_FT * envelope * (local * 6.0 * PI + self.seed).sin();
                let speed = cruise_speed
                    + CRUISE_SPEED_WOBBLE_KT * envelope * (local * 4.0 * PI + self.seed * 1.3).sin();
                (local, alt, speed)
            }
            FlightPhase::Descent => {
                let local = (p - DESCENT_START) / (1.0 - DESCENT_START);
                let alt = cruise_alt + (ALTITUDE_FLOOR_FT - cruise_alt) * ease_in_out(local);
                (local, alt, speed_for_altitude(alt, cruise_alt, cruise_speed))
            }
        };

        KinematicState {
            phase,
            altitude: Feet(altitude.clamp(MIN_ALTITUDE_FT, MAX_ALTITUDE_FT)),
            speed: Knots(speed.clamp(MIN_SPEED_KT, MAX_SPEED_KT)),
            vertical_speed: FeetPerMinute(vertical_speed(phase, local, self.seed)),
            turbulence: Turbulence::from_coefficient(self.turbulence),
        }
    }

    /// `evaluate` plus turbulence jitter. The jitter lands after clamping, so
    /// the result may sit slightly outside the envelope.
    pub fn sample(&self, progress: f64, rng: &mut impl Rng) -> KinematicState {
        let mut state = self.evaluate(progress);
        if self.turbulence > 0.0 {
            state.altitude.0 += rng.random_range(-1.0..=1.0) * self.turbulence * ALTITUDE_JITTER_FT;
            state.speed.0 += rng.random_range(-1.0..=1.0) * self.turbulence * SPEED_JITTER_KT;
        }
        state
    }
}
