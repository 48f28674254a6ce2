//! OpenSky Network `states/all` polling.

use bevy::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::error::FeedError;
use crate::geo::{BoundingRegion, GeoPoint};
use crate::live::Observation;
use crate::units::{Feet, Knots};

// Column indices of a state vector row.
const ICAO24: usize = 0;
const CALLSIGN: usize = 1;
const LONGITUDE: usize = 5;
const LATITUDE: usize = 6;
const BARO_ALTITUDE: usize = 7;
const VELOCITY: usize = 9;
const TRUE_TRACK: usize = 10;

#[derive(Debug, Deserialize)]
pub struct StatesResponse {
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub states: Option<Vec<Vec<Value>>>,
}

impl StatesResponse {
    pub fn observations(&self) -> Vec<Observation> {
        self.states
            .iter()
            .flatten()
            .filter_map(|row| parse_state_row(row))
            .collect()
    }
}

/// Convert one state vector into an observation. Rows without a position
/// are skipped. Altitude arrives in metres and velocity in m/s.
pub fn parse_state_row(row: &[Value]) -> Option<Observation> {
    let field = |i: usize| row.get(i).and_then(Value::as_f64);

    let icao = row.get(ICAO24)?.as_str()?.trim().to_lowercase();
    if icao.is_empty() {
        return None;
    }
    let lat = field(LATITUDE)?;
    let lon = field(LONGITUDE)?;

    let callsign = row
        .get(CALLSIGN)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| icao.clone());

    Some(Observation {
        icao,
        callsign,
        position: GeoPoint::new(lat, lon),
        track: field(TRUE_TRACK).unwrap_or(0.0),
        altitude: Feet::from_meters(field(BARO_ALTITUDE).unwrap_or(0.0)),
        speed: Knots::from_meters_per_second(field(VELOCITY).unwrap_or(0.0)),
    })
}

pub struct OpenSkyClient {
    client: reqwest::Client,
    url: String,
    bounds: BoundingRegion,
}

impl OpenSkyClient {
    pub fn new(url: impl Into<String>, bounds: BoundingRegion, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            bounds,
        })
    }

    /// Query the states inside the bounding region.
    pub async fn fetch(&self) -> Result<Vec<Observation>, FeedError> {
        let b = &self.bounds;
        debug!("Querying {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("lamin", b.south),
                ("lomin", b.west),
                ("lamax", b.north),
                ("lomax", b.east),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let body: StatesResponse = response.json().await?;
        Ok(body.observations())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_state_rows() {
        let body = r#"{
            "time": 1700000000,
            "states": [
                ["4ca7b5", "RYR12AB ", "Ireland", 1700000000, 1700000000, 4.5, 50.5, 10000.0, false, 200.0, 87.5, 0.0, null, 10050.0, "1000", false, 0],
                ["3c6444", null, "Germany", null, 1700000000, null, null, null, true, 0.0, null, null, null, null, null, false, 0],
                ["440123", "   ", "Austria", 1700000000, 1700000000, 11.0, 48.0, null, false, null, null, null, null, null, null, false, 0]
            ]
        }"#;
        let response: StatesResponse = serde_json::from_str(body).unwrap();
        let observations = response.observations();
        assert_eq!(observations.len(), 2);

        let ryr = &observations[0];
        assert_eq!(ryr.icao, "4ca7b5");
        assert_eq!(ryr.callsign, "RYR12AB");
        assert_relative_eq!(ryr.position.lat, 50.5);
        assert_relative_eq!(ryr.track, 87.5);
        assert_relative_eq!(ryr.altitude.0, 32808.4, epsilon = 0.1);
        assert_relative_eq!(ryr.speed.0, 388.77, epsilon = 0.01);

        let blank = &observations[1];
        assert_eq!(blank.callsign, "440123");
        assert_relative_eq!(blank.altitude.0, 0.0);
    }

    #[test]
    fn test_empty_states() {
        let response: StatesResponse = serde_json::from_str(r#"{"time": 1, "states": null}"#).unwrap();
        assert!(response.observations().is_empty());
    }
}
