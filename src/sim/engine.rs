use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::SimulationConfig;
use crate::geo::Projection;
use crate::render::{Heading, Readout, RenderItem};
use crate::trail::path_trail;

use super::airports::{palette_color, random_callsign, AirportNetwork};
use super::flight::{FlightTiming, SimulatedFlight};

/// Owns every simulated flight and the RNG that drives them.
#[derive(Resource)]
pub struct SimulationEngine {
    flights: Vec<SimulatedFlight>,
    rng: StdRng,
    timing: FlightTiming,
    trail_fraction: f64,
}

impl SimulationEngine {
    pub fn new(config: &SimulationConfig, network: &AirportNetwork, now_ms: f64) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let timing = FlightTiming::from(config);

        let routes = network.random_routes(config.flight_count, &mut rng);
        let mut flights = Vec::with_capacity(routes.len());
        for (i, route) in routes.into_iter().enumerate() {
            let callsign = random_callsign(&mut rng);
            flights.push(SimulatedFlight::new(
                format!("SIM-{:03}", i + 1),
                callsign,
                route,
                palette_color(i),
                &timing,
                now_ms,
                &mut rng,
            ));
        }

        info!("Simulation started with {} flights", flights.len());

        Self {
            flights,
            rng,
            timing,
            trail_fraction: config.trail_fraction,
        }
    }

    pub fn flights(&self) -> &[SimulatedFlight] {
        &self.flights
    }

    pub fn flight(&self, id: &str) -> Option<&SimulatedFlight> {
        self.flights.iter().find(|f| f.id == id)
    }

    /// Advance every flight to `now_ms` and return what should be drawn.
    /// Flights waiting to depart or outside the bounds are left out.
    pub fn tick(&mut self, now_ms: f64, projection: &Projection) -> Vec<RenderItem> {
        let bounds = *projection.bounds();
        let mut items = Vec::with_capacity(self.flights.len());

        for flight in &mut self.flights {
            flight.advance(now_ms, &self.timing, &mut self.rng);
            if !flight.is_airborne(now_ms) {
                continue;
            }
            let Some(position) = flight.position() else {
                continue;
            };
            if !bounds.contains(position) {
                continue;
            }
            let Some(heading) = flight.heading(projection) else {
                continue;
            };

            let trail = path_trail(flight.path(), flight.progress(), self.trail_fraction, &bounds);
            items.push(RenderItem {
                id: flight.id.clone(),
                label: flight.callsign.clone(),
                position: projection.project(position),
                heading: Heading::Planar(heading),
                trail: trail.project(projection),
                color: flight.color,
                readout: Readout::from(*flight.state()),
            });
        }

        items
    }
}
