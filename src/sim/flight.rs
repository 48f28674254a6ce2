use bevy::prelude::*;
use rand::Rng;

use crate::config::SimulationConfig;
use crate::geo::{GeoPoint, Projection};

use super::airports::Route;
use super::kinematics::{CruiseProfile, KinematicState, PhaseModel};
use super::path::{synthesize_path, FlightPath};

/// Upper bound of the per-flight turbulence coefficient.
pub const MAX_TURBULENCE: f64 = 0.2;
pub const MIN_WIND_FACTOR: f64 = 0.9;
pub const MAX_WIND_FACTOR: f64 = 1.1;

/// Duration and delay ranges for simulated flights, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightTiming {
    pub min_duration_ms: f64,
    pub max_duration_ms: f64,
    pub max_start_delay_ms: f64,
    pub path_points: usize,
}

impl FlightTiming {
    fn random_duration(&self, rng: &mut impl Rng) -> f64 {
        let duration = if self.max_duration_ms > self.min_duration_ms {
            rng.random_range(self.min_duration_ms..self.max_duration_ms)
        } else {
            self.min_duration_ms
        };
        duration.max(1.0)
    }

    fn random_delay(&self, rng: &mut impl Rng) -> f64 {
        if self.max_start_delay_ms > 0.0 {
            rng.random_range(0.0..self.max_start_delay_ms)
        } else {
            0.0
        }
    }
}

impl From<&SimulationConfig> for FlightTiming {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            min_duration_ms: config.min_duration_secs * 1000.0,
            max_duration_ms: config.max_duration_secs * 1000.0,
            max_start_delay_ms: config.max_start_delay_secs * 1000.0,
            path_points: config.path_points,
        }
    }
}

/// A procedurally generated flight shuttling between two airports.
///
/// The path, identity and seed are fixed for the flight's lifetime. Each time
/// the flight lands it is recycled in place with fresh timing, wind and
/// turbulence, and departs again after a short random delay.
#[derive(Debug, Clone)]
pub struct SimulatedFlight {
    pub id: String,
    pub callsign: String,
    pub route: Route,
    pub color: Color,
    path: FlightPath,
    progress: f64,
    start_ms: f64,
    duration_ms: f64,
    seed: f64,
    turbulence: f64,
    wind_factor: f64,
    cruise: CruiseProfile,
    state: KinematicState,
    cycles: u32,
}

impl SimulatedFlight {
    /// Create a flight already somewhere along its route so the map is
    /// populated from the first tick.
    pub fn new(
        id: String,
        callsign: String,
        route: Route,
        color: Color,
        timing: &FlightTiming,
        now_ms: f64,
        rng: &mut impl Rng,
    ) -> Self {
        let seed = rng.random_range(0.0..1000.0);
        let path = synthesize_path(
            route.origin.location,
            route.destination.location,
            seed,
            timing.path_points,
            rng,
        );
        let cruise = CruiseProfile::for_distance(route.direct_distance(), rng);
        let duration_ms = timing.random_duration(rng);
        let progress: f64 = rng.random_range(0.0..1.0);
        let turbulence = rng.random_range(0.0..MAX_TURBULENCE);
        let wind_factor = rng.random_range(MIN_WIND_FACTOR..MAX_WIND_FACTOR);

        let state = PhaseModel {
            cruise,
            seed,
            wind_factor,
            turbulence,
        }
        .evaluate(progress);

        Self {
            id,
            callsign,
            route,
            color,
            path,
            progress,
            start_ms: now_ms - progress * duration_ms,
            duration_ms,
            seed,
            turbulence,
            wind_factor,
            cruise,
            state,
            cycles: 0,
        }
    }

    fn model(&self) -> PhaseModel {
        PhaseModel {
            cruise: self.cruise,
            seed: self.seed,
            wind_factor: self.wind_factor,
            turbulence: self.turbulence,
        }
    }

    /// Advance to `now_ms`. Returns `true` when the flight landed and was
    /// recycled during this call.
    pub fn advance(&mut self, now_ms: f64, timing: &FlightTiming, rng: &mut impl Rng) -> bool {
        if !self.is_airborne(now_ms) {
            self.progress = 0.0;
            return false;
        }

        self.progress = ((now_ms - self.start_ms) / self.duration_ms).clamp(0.0, 1.0);
        if self.progress >= 1.0 {
            self.recycle(now_ms, timing, rng);
            return true;
        }

        self.state = self.model().sample(self.progress, rng);
        false
    }

    /// Reset for another leg on the same path. The seed is kept, so the
    /// cruise wobble repeats from leg to leg.
    pub fn recycle(&mut self, now_ms: f64, timing: &FlightTiming, rng: &mut impl Rng) {
        self.progress = 0.0;
        self.start_ms = now_ms + timing.random_delay(rng);
        self.duration_ms = timing.random_duration(rng);
        self.wind_factor = rng.random_range(MIN_WIND_FACTOR..MAX_WIND_FACTOR);
        self.turbulence = rng.random_range(0.0..MAX_TURBULENCE);
        self.state = self.model().evaluate(0.0);
        self.cycles += 1;
        debug!("{} recycled on {}-{}", self.callsign, self.route.origin.code, self.route.destination.code);
    }

    /// A recycled flight waiting out its departure delay is on the ground.
    pub fn is_airborne(&self, now_ms: f64) -> bool {
        now_ms >= self.start_ms
    }

    pub fn position(&self) -> Option<GeoPoint> {
        self.path.position_at(self.progress)
    }

    /// Planar heading along the path around the current progress, in
    /// screen space.
    pub fn heading(&self, projection: &Projection) -> Option<f64> {
        let (a, b) = self.path.tangent_at(self.progress)?;
        Some(projection.heading(a, b))
    }

    pub fn path(&self) -> &FlightPath {
        &self.path
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn state(&self) -> &KinematicState {
        &self.state
    }

    pub fn cruise(&self) -> CruiseProfile {
        self.cruise
    }

    pub fn seed(&self) -> f64 {
        self.seed
    }

    pub fn wind_factor(&self) -> f64 {
        self.wind_factor
    }

    pub fn turbulence(&self) -> f64 {
        self.turbulence
    }

    pub fn start_ms(&self) -> f64 {
        self.start_ms
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    /// Number of completed legs.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }
}
