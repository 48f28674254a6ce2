//! Synthetic traffic served when the upstream source is unavailable.
//!
//! Demo aircraft shuttle back and forth on one curved route. Arriving at
//! either end they fly one to three holding loops around the airport, easing
//! from arrival to departure altitude and speed, then head back the way they
//! came.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

use crate::geo::{initial_bearing, normalize_degrees, GeoPoint};
use crate::live::Observation;
use crate::sim::airports::{random_callsign, random_icao, AirportNetwork, Route};
use crate::sim::flight::{MAX_TURBULENCE, MAX_WIND_FACTOR, MIN_WIND_FACTOR};
use crate::sim::{synthesize_path, CruiseProfile, FlightPath, PhaseModel};
use crate::units::{Feet, Knots};

/// Chance per step that the fleet gains or loses a flight.
const CHURN_PROBABILITY: f64 = 0.05;
/// Above this size churn removes as often as it adds.
const CHURN_REMOVE_ABOVE: usize = 30;

/// Real-time legs last roughly ten minutes.
const MIN_LEG_MS: f64 = 8.0 * 60_000.0;
const MAX_LEG_MS: f64 = 14.0 * 60_000.0;
const PATH_POINTS: usize = 160;

/// One full holding circle takes this long.
pub const HOLDING_LOOP_MS: f64 = 100_000.0;
const MIN_HOLDING_LOOPS: u32 = 1;
const MAX_HOLDING_LOOPS: u32 = 3;
/// Holding circle radius range, in degrees.
const MIN_HOLDING_RADIUS: f64 = 0.05;
const MAX_HOLDING_RADIUS: f64 = 0.1;

/// Which way along its route a demo flight is travelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outbound,
    Inbound,
}

impl Direction {
    fn reversed(self) -> Self {
        match self {
            Direction::Outbound => Direction::Inbound,
            Direction::Inbound => Direction::Outbound,
        }
    }

    /// Path progress for a given fraction of the leg flown.
    fn path_progress(self, leg_progress: f64) -> f64 {
        match self {
            Direction::Outbound => leg_progress,
            Direction::Inbound => 1.0 - leg_progress,
        }
    }
}

/// Clockwise circle flown at the end of a leg. The aircraft enters and
/// leaves the circle at the leg's end point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldingPattern {
    pub center: GeoPoint,
    /// Degrees of lat/lon.
    pub radius: f64,
    /// Compass bearing from the centre to the entry point.
    pub entry_bearing: f64,
    pub loops: u32,
    pub started_ms: f64,
    arrival: (Feet, Knots),
    departure: (Feet, Knots),
}

impl HoldingPattern {
    fn enter(at: GeoPoint, now_ms: f64, arrival: (Feet, Knots), departure: (Feet, Knots), rng: &mut impl Rng) -> Self {
        let radius = rng.random_range(MIN_HOLDING_RADIUS..MAX_HOLDING_RADIUS);
        let entry_bearing = rng.random_range(0.0..360.0);
        let rad = f64::to_radians(entry_bearing);
        Self {
            center: GeoPoint::new(at.lat - radius * rad.cos(), at.lon - radius * rad.sin()),
            radius,
            entry_bearing,
            loops: rng.random_range(MIN_HOLDING_LOOPS..=MAX_HOLDING_LOOPS),
            started_ms: now_ms,
            arrival,
            departure,
        }
    }

    pub fn duration_ms(&self) -> f64 {
        self.loops as f64 * HOLDING_LOOP_MS
    }

    /// Fraction of the whole pattern flown at `now_ms`, in [0, 1].
    pub fn progress(&self, now_ms: f64) -> f64 {
        ((now_ms - self.started_ms) / self.duration_ms()).clamp(0.0, 1.0)
    }

    pub fn is_complete(&self, now_ms: f64) -> bool {
        now_ms >= self.started_ms + self.duration_ms()
    }

    /// Position and tangent track at `now_ms`.
    pub fn position(&self, now_ms: f64) -> (GeoPoint, f64) {
        let bearing = self.entry_bearing + 360.0 * self.loops as f64 * self.progress(now_ms);
        let rad = bearing.to_radians();
        let position = GeoPoint::new(
            self.center.lat + self.radius * rad.cos(),
            self.center.lon + self.radius * rad.sin(),
        );
        (position, normalize_degrees(bearing + 90.0))
    }

    /// Altitude and speed eased from the arrival values to the departure
    /// values over the whole pattern.
    pub fn readout(&self, now_ms: f64) -> (Feet, Knots) {
        let t = self.progress(now_ms);
        let ((alt_a, speed_a), (alt_d, speed_d)) = (self.arrival, self.departure);
        (
            Feet(alt_a.0 + (alt_d.0 - alt_a.0) * t),
            Knots(speed_a.0 + (speed_d.0 - speed_a.0) * t),
        )
    }
}

/// A demo aircraft flying its route back and forth.
#[derive(Debug, Clone)]
pub struct DemoFlight {
    pub icao: String,
    pub callsign: String,
    pub route: Route,
    path: FlightPath,
    direction: Direction,
    leg_start_ms: f64,
    leg_duration_ms: f64,
    model: PhaseModel,
    holding: Option<HoldingPattern>,
}

impl DemoFlight {
    /// Start somewhere along the route, in a random direction.
    pub fn new(icao: String, callsign: String, route: Route, now_ms: f64, rng: &mut impl Rng) -> Self {
        let seed = rng.random_range(0.0..1000.0);
        let path = synthesize_path(route.origin.location, route.destination.location, seed, PATH_POINTS, rng);
        let model = PhaseModel {
            cruise: CruiseProfile::for_distance(route.direct_distance(), rng),
            seed,
            wind_factor: rng.random_range(MIN_WIND_FACTOR..MAX_WIND_FACTOR),
            turbulence: rng.random_range(0.0..MAX_TURBULENCE),
        };
        let direction = if rng.random_bool(0.5) {
            Direction::Outbound
        } else {
            Direction::Inbound
        };
        let leg_duration_ms = rng.random_range(MIN_LEG_MS..MAX_LEG_MS);
        let leg_progress: f64 = rng.random_range(0.0..1.0);

        Self {
            icao,
            callsign,
            route,
            path,
            direction,
            leg_start_ms: now_ms - leg_progress * leg_duration_ms,
            leg_duration_ms,
            model,
            holding: None,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn holding(&self) -> Option<&HoldingPattern> {
        self.holding.as_ref()
    }

    pub fn path(&self) -> &FlightPath {
        &self.path
    }

    /// When the current leg reaches its end point.
    pub fn leg_end_ms(&self) -> f64 {
        self.leg_start_ms + self.leg_duration_ms
    }

    fn leg_progress(&self, now_ms: f64) -> f64 {
        ((now_ms - self.leg_start_ms) / self.leg_duration_ms).clamp(0.0, 1.0)
    }

    fn leg_end_point(&self) -> Option<GeoPoint> {
        self.path.position_at(self.direction.path_progress(1.0))
    }

    /// Turn around for the next leg, with fresh timing and weather.
    fn depart(&mut self, now_ms: f64, rng: &mut impl Rng) {
        self.holding = None;
        self.direction = self.direction.reversed();
        self.leg_start_ms = now_ms;
        self.leg_duration_ms = rng.random_range(MIN_LEG_MS..MAX_LEG_MS);
        self.model.wind_factor = rng.random_range(MIN_WIND_FACTOR..MAX_WIND_FACTOR);
        self.model.turbulence = rng.random_range(0.0..MAX_TURBULENCE);
        debug!("Demo flight {} departing {:?}", self.callsign, self.direction);
    }

    /// Advance to `now_ms` and report where the aircraft is.
    pub fn step(&mut self, now_ms: f64, rng: &mut impl Rng) -> Option<Observation> {
        if self.holding.is_some_and(|h| h.is_complete(now_ms)) {
            self.depart(now_ms, rng);
        }

        if self.holding.is_none() && now_ms >= self.leg_end_ms() {
            let at = self.leg_end_point()?;
            let arrival = self.model.evaluate(1.0);
            let departure = self.model.evaluate(0.0);
            self.holding = Some(HoldingPattern::enter(
                at,
                now_ms,
                (arrival.altitude, arrival.speed),
                (departure.altitude, departure.speed),
                rng,
            ));
            debug!("Demo flight {} holding", self.callsign);
        }

        if let Some(holding) = &self.holding {
            let (position, track) = holding.position(now_ms);
            let (altitude, speed) = holding.readout(now_ms);
            return Some(self.observation(position, track, altitude, speed));
        }

        let leg_progress = self.leg_progress(now_ms);
        let progress = self.direction.path_progress(leg_progress);
        let position = self.path.position_at(progress)?;
        let (behind, ahead) = self.path.tangent_at(progress)?;
        let track = match self.direction {
            Direction::Outbound => initial_bearing(behind, ahead),
            Direction::Inbound => initial_bearing(ahead, behind),
        };
        let state = self.model.sample(leg_progress, rng);
        Some(self.observation(position, track, state.altitude, state.speed))
    }

    fn observation(&self, position: GeoPoint, track: f64, altitude: Feet, speed: Knots) -> Observation {
        Observation {
            icao: self.icao.clone(),
            callsign: self.callsign.clone(),
            position,
            track,
            altitude,
            speed,
        }
    }
}

pub struct DemoTraffic {
    flights: Vec<DemoFlight>,
    network: AirportNetwork,
    rng: StdRng,
}

impl DemoTraffic {
    pub fn new(count: usize, now_ms: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut traffic = Self {
            flights: Vec::with_capacity(count),
            network: AirportNetwork::european(),
            rng,
        };
        for _ in 0..count {
            traffic.add_flight(now_ms);
        }
        info!("Demo traffic started with {} flights", traffic.flights.len());
        traffic
    }

    pub fn len(&self) -> usize {
        self.flights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }

    pub fn flights(&self) -> &[DemoFlight] {
        &self.flights
    }

    fn add_flight(&mut self, now_ms: f64) {
        let Some(route) = self.network.random_route(&mut self.rng) else {
            return;
        };
        let taken: HashSet<&str> = self.flights.iter().map(|f| f.icao.as_str()).collect();
        let icao = loop {
            let candidate = random_icao(&mut self.rng);
            if !taken.contains(candidate.as_str()) {
                break candidate;
            }
        };
        let callsign = random_callsign(&mut self.rng);
        let flight = DemoFlight::new(icao, callsign, route, now_ms, &mut self.rng);
        self.flights.push(flight);
    }

    fn churn(&mut self, now_ms: f64) {
        if !self.rng.random_bool(CHURN_PROBABILITY) {
            return;
        }
        if self.flights.len() > CHURN_REMOVE_ABOVE && self.rng.random_bool(0.5) {
            let index = self.rng.random_range(0..self.flights.len());
            let removed = self.flights.swap_remove(index);
            debug!("Demo flight {} left", removed.callsign);
        } else {
            self.add_flight(now_ms);
        }
    }

    /// Advance every flight to `now_ms` and report where they are.
    pub fn step(&mut self, now_ms: f64) -> Vec<Observation> {
        let mut observations = Vec::with_capacity(self.flights.len());
        for flight in &mut self.flights {
            if let Some(obs) = flight.step(now_ms, &mut self.rng) {
                observations.push(obs);
            }
        }
        self.churn(now_ms);
        observations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::shortest_angle_delta;
    use crate::sim::airports::EUROPEAN_AIRPORTS;
    use approx::assert_relative_eq;

    fn flight(rng: &mut StdRng) -> DemoFlight {
        let route = Route {
            origin: EUROPEAN_AIRPORTS[0],
            destination: EUROPEAN_AIRPORTS[1],
        };
        DemoFlight::new("4ca7b1".into(), "EZY42".into(), route, 0.0, rng)
    }

    #[test]
    fn test_initial_fleet() {
        let mut traffic = DemoTraffic::new(45, 0.0, Some(3));
        assert_eq!(traffic.len(), 45);
        let observations = traffic.step(0.0);
        assert_eq!(observations.len(), 45);
        let ids: HashSet<_> = observations.iter().map(|o| o.icao.clone()).collect();
        assert_eq!(ids.len(), observations.len());
    }

    #[test]
    fn test_observations_are_well_formed() {
        let mut traffic = DemoTraffic::new(20, 0.0, Some(4));
        for obs in traffic.step(5_000.0) {
            assert_eq!(obs.icao.len(), 6);
            assert!((0.0..360.0).contains(&obs.track));
            assert!(obs.altitude.0 > 0.0);
            assert!(obs.speed.0 > 0.0);
        }
    }

    #[test]
    fn test_fleet_size_drifts_slowly() {
        let mut traffic = DemoTraffic::new(40, 0.0, Some(5));
        for i in 0..200 {
            traffic.step(i as f64 * 5_000.0);
        }
        // churn fires about once every twenty steps
        assert!((25..=60).contains(&traffic.len()));
    }

    #[test]
    fn test_holds_at_leg_end_then_flies_back() {
        let mut rng = StdRng::seed_from_u64(31);
        let mut f = flight(&mut rng);
        let direction = f.direction();
        let end = f.path().position_at(direction.path_progress(1.0)).unwrap();

        let arrival = f.leg_end_ms();
        let obs = f.step(arrival, &mut rng).unwrap();
        let holding = *f.holding().unwrap();
        assert!((MIN_HOLDING_LOOPS..=MAX_HOLDING_LOOPS).contains(&holding.loops));
        assert!((MIN_HOLDING_RADIUS..MAX_HOLDING_RADIUS).contains(&holding.radius));
        // the circle is entered at the leg's end point
        assert_relative_eq!(obs.position.lat, end.lat, epsilon = 1e-9);
        assert_relative_eq!(obs.position.lon, end.lon, epsilon = 1e-9);

        // still holding just before the last loop closes
        let finish = arrival + holding.duration_ms();
        f.step(finish - 1_000.0, &mut rng).unwrap();
        assert!(f.holding().is_some());
        assert_eq!(f.direction(), direction);

        let obs = f.step(finish, &mut rng).unwrap();
        assert!(f.holding().is_none());
        assert_eq!(f.direction(), direction.reversed());
        assert!(obs.position.degree_distance(end) < 1e-6);
    }

    #[test]
    fn test_holding_track_is_tangent() {
        let mut rng = StdRng::seed_from_u64(32);
        let mut f = flight(&mut rng);
        let arrival = f.leg_end_ms();
        f.step(arrival, &mut rng);
        let holding = *f.holding().unwrap();

        for step in 1..20 {
            let now = arrival + holding.duration_ms() * step as f64 / 20.0;
            let obs = f.step(now, &mut rng).unwrap();
            let d_lat = obs.position.lat - holding.center.lat;
            let d_lon = obs.position.lon - holding.center.lon;
            assert_relative_eq!(d_lat.hypot(d_lon), holding.radius, epsilon = 1e-9);
            let radial = d_lon.atan2(d_lat).to_degrees();
            // clockwise: the track leads the radial by a right angle
            assert_relative_eq!(shortest_angle_delta(radial, obs.track), 90.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_holding_eases_altitude_and_speed() {
        let mut rng = StdRng::seed_from_u64(33);
        let mut f = flight(&mut rng);
        let arrival = f.leg_end_ms();
        f.step(arrival, &mut rng);
        let holding = *f.holding().unwrap();

        let start = holding.readout(arrival);
        let end = holding.readout(arrival + holding.duration_ms());
        let mid = holding.readout(arrival + holding.duration_ms() / 2.0);
        assert_relative_eq!(mid.0 .0, (start.0 .0 + end.0 .0) / 2.0, epsilon = 1e-6);
        assert_relative_eq!(mid.1 .0, (start.1 .0 + end.1 .0) / 2.0, epsilon = 1e-6);
        assert!(start.0 .0 > 0.0 && start.1 .0 > 0.0);
    }

    #[test]
    fn test_inbound_track_points_back_along_route() {
        let mut rng = StdRng::seed_from_u64(34);
        let mut f = flight(&mut rng);
        let arrival = f.leg_end_ms();
        f.step(arrival, &mut rng);
        let finish = arrival + f.holding().unwrap().duration_ms();
        f.step(finish, &mut rng);

        let route = f.route;
        let (from, to) = match f.direction() {
            Direction::Outbound => (route.origin.location, route.destination.location),
            Direction::Inbound => (route.destination.location, route.origin.location),
        };
        let obs = f.step(finish + 4.0 * 60_000.0, &mut rng).unwrap();
        let direct = initial_bearing(from, to);
        assert!(shortest_angle_delta(direct, obs.track).abs() < 60.0);
    }
}
