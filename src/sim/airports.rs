use bevy::prelude::*;
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::geo::GeoPoint;

/// A major airport used as a route endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Airport {
    pub code: &'static str,
    pub name: &'static str,
    pub location: GeoPoint,
}

impl Airport {
    const fn new(code: &'static str, name: &'static str, lat: f64, lon: f64) -> Self {
        Self {
            code,
            name,
            location: GeoPoint::new(lat, lon),
        }
    }
}

/// Major western European hubs.
pub const EUROPEAN_AIRPORTS: &[Airport] = &[
    Airport::new("LHR", "London Heathrow", 51.4700, -0.4543),
    Airport::new("CDG", "Paris Charles de Gaulle", 49.0097, 2.5479),
    Airport::new("AMS", "Amsterdam Schiphol", 52.3105, 4.7683),
    Airport::new("FRA", "Frankfurt", 50.0379, 8.5622),
    Airport::new("MAD", "Madrid Barajas", 40.4983, -3.5676),
    Airport::new("FCO", "Rome Fiumicino", 41.8045, 12.2508),
    Airport::new("BCN", "Barcelona", 41.2974, 2.0833),
    Airport::new("MUC", "Munich", 48.3537, 11.7860),
    Airport::new("BRU", "Brussels", 50.9010, 4.4856),
    Airport::new("ZRH", "Zurich", 47.4647, 8.5492),
];

pub const AIRLINE_CODES: &[&str] = &["BA", "AF", "LH", "IB", "AZ", "KL", "FR", "EZY", "RYR", "VLG"];

/// Trail and marker colours handed out round-robin.
pub const PALETTE: &[Color] = &[
    Color::srgb(0.30, 0.80, 1.00),
    Color::srgb(1.00, 0.60, 0.20),
    Color::srgb(0.55, 0.90, 0.45),
    Color::srgb(0.95, 0.40, 0.60),
    Color::srgb(0.75, 0.55, 1.00),
    Color::srgb(1.00, 0.90, 0.35),
    Color::srgb(0.40, 1.00, 0.85),
];

/// An origin/destination pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Route {
    pub origin: Airport,
    pub destination: Airport,
}

impl Route {
    pub fn direct_distance(&self) -> f64 {
        self.origin.location.degree_distance(self.destination.location)
    }
}

/// Route source for the simulation: every unordered pair of airports, flown
/// in a random direction.
#[derive(Debug, Clone)]
pub struct AirportNetwork {
    routes: Vec<Route>,
}

impl AirportNetwork {
    pub fn new(airports: &[Airport]) -> Self {
        let mut routes = Vec::new();
        for (i, a) in airports.iter().enumerate() {
            for b in &airports[i + 1..] {
                routes.push(Route {
                    origin: *a,
                    destination: *b,
                });
            }
        }
        Self { routes }
    }

    pub fn european() -> Self {
        Self::new(EUROPEAN_AIRPORTS)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn random_route(&self, rng: &mut impl Rng) -> Option<Route> {
        let route = *self.routes.choose(rng)?;
        if rng.random_bool(0.5) {
            Some(Route {
                origin: route.destination,
                destination: route.origin,
            })
        } else {
            Some(route)
        }
    }

    pub fn random_routes(&self, count: usize, rng: &mut impl Rng) -> Vec<Route> {
        (0..count).filter_map(|_| self.random_route(rng)).collect()
    }
}

/// Airline prefix plus a flight number, e.g. "KL1234".
pub fn random_callsign(rng: &mut impl Rng) -> String {
    let airline = AIRLINE_CODES.choose(rng).copied().unwrap_or("XX");
    format!("{}{}", airline, rng.random_range(100..10_000))
}

/// Random 24-bit ICAO address as lowercase hex.
pub fn random_icao(rng: &mut impl Rng) -> String {
    format!("{:06x}", rng.random_range(0..=0xFF_FFFFu32))
}

pub fn palette_color(index: usize) -> Color {
    PALETTE[index % PALETTE.len()]
}
