//! Wire format of the snapshot feed and its decoding into frames.
//!
//! The feed sends one message type carrying the full list of frames it
//! holds. Each flight is decoded on its own so one malformed aircraft never
//! takes the rest of the frame down with it.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::FeedError;
use crate::geo::GeoPoint;
use crate::units::{Feet, Knots};

/// Top-level feed message, generic over the flight representation so the
/// server can send typed flights and the client can decode them leniently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedMessage<F> {
    Snapshot { frames: Vec<WireFrame<F>> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFrame<F> {
    pub ts: f64,
    #[serde(default = "Vec::new")]
    pub flights: Vec<F>,
}

/// One aircraft observation as it appears on the wire. Altitude is in feet,
/// speed in knots, track in degrees clockwise from north.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFlight {
    pub icao: String,
    #[serde(default)]
    pub callsign: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub track: Option<f64>,
    #[serde(default)]
    pub alt: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
}

impl WireFlight {
    /// Validate into an observation. Flights without a usable position are
    /// dropped; missing secondary fields default to zero.
    pub fn into_observation(self) -> Option<Observation> {
        let lat = self.lat.filter(|v| v.is_finite())?;
        let lon = self.lon.filter(|v| v.is_finite())?;
        if self.icao.trim().is_empty() {
            return None;
        }

        let callsign = self
            .callsign
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.icao.clone());

        Some(Observation {
            icao: self.icao,
            callsign,
            position: GeoPoint::new(lat, lon),
            track: self.track.filter(|v| v.is_finite()).unwrap_or(0.0),
            altitude: Feet(self.alt.filter(|v| v.is_finite()).unwrap_or(0.0)),
            speed: Knots(self.speed.filter(|v| v.is_finite()).unwrap_or(0.0)),
        })
    }
}

impl From<&Observation> for WireFlight {
    fn from(obs: &Observation) -> Self {
        Self {
            icao: obs.icao.clone(),
            callsign: Some(obs.callsign.clone()),
            lat: Some(obs.position.lat),
            lon: Some(obs.position.lon),
            track: Some(obs.track),
            alt: Some(obs.altitude.0),
            speed: Some(obs.speed.0),
        }
    }
}

/// A validated aircraft observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub icao: String,
    pub callsign: String,
    pub position: GeoPoint,
    /// Compass track in degrees.
    pub track: f64,
    pub altitude: Feet,
    pub speed: Knots,
}

/// One timestamped batch of observations, indexed by aircraft identifier.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub ts: f64,
    observations: HashMap<String, Observation>,
}

impl Frame {
    pub fn new(ts: f64, observations: impl IntoIterator<Item = Observation>) -> Self {
        let observations = observations
            .into_iter()
            .map(|obs| (obs.icao.clone(), obs))
            .collect();
        Self { ts, observations }
    }

    pub fn get(&self, icao: &str) -> Option<&Observation> {
        self.observations.get(icao)
    }

    pub fn contains(&self, icao: &str) -> bool {
        self.observations.contains_key(icao)
    }

    pub fn observations(&self) -> impl Iterator<Item = &Observation> {
        self.observations.values()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Sort frames ascending by timestamp. Non-finite timestamps sort last.
pub fn sort_frames(frames: &mut [Frame]) {
    frames.sort_by(|a, b| a.ts.total_cmp(&b.ts));
}

/// Decode a feed message into frames sorted by timestamp.
pub fn parse_message(text: &str) -> Result<Vec<Frame>, FeedError> {
    let message: FeedMessage<serde_json::Value> = serde_json::from_str(text)?;
    let FeedMessage::Snapshot { frames } = message;

    let mut skipped = 0usize;
    let mut decoded: Vec<Frame> = frames
        .into_iter()
        .map(|wire| {
            let observations = wire.flights.into_iter().filter_map(|value| {
                let obs = serde_json::from_value::<WireFlight>(value)
                    .ok()
                    .and_then(WireFlight::into_observation);
                if obs.is_none() {
                    skipped += 1;
                }
                obs
            });
            Frame::new(wire.ts, observations.collect::<Vec<_>>())
        })
        .collect();

    if skipped > 0 {
        debug!("Skipped {} malformed observations", skipped);
    }

    sort_frames(&mut decoded);
    Ok(decoded)
}

/// Encode frames as a snapshot message.
pub fn encode_snapshot<'a>(frames: impl IntoIterator<Item = (f64, &'a [Observation])>) -> Result<String, FeedError> {
    let message = FeedMessage::Snapshot {
        frames: frames
            .into_iter()
            .map(|(ts, observations)| WireFrame {
                ts,
                flights: observations.iter().map(WireFlight::from).collect(),
            })
            .collect(),
    };
    Ok(serde_json::to_string(&message)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_sorts_frames() {
        let text = r#"{
            "type": "snapshot",
            "frames": [
                {"ts": 20, "flights": [{"icao": "abc123", "callsign": "BA100", "lat": 50.0, "lon": 5.0, "track": 90, "alt": 30000, "speed": 420}]},
                {"ts": 10, "flights": []}
            ]
        }"#;
        let frames = parse_message(text).unwrap();
        assert_eq!(frames.len(), 2);
        assert_relative_eq!(frames[0].ts, 10.0);
        assert_relative_eq!(frames[1].ts, 20.0);
        let obs = frames[1].get("abc123").unwrap();
        assert_eq!(obs.callsign, "BA100");
        assert_relative_eq!(obs.track, 90.0);
        assert_relative_eq!(obs.altitude.0, 30000.0);
    }

    #[test]
    fn test_malformed_flights_are_skipped_individually() {
        let text = r#"{"type": "snapshot", "frames": [{"ts": 1, "flights": [
            {"icao": "a1", "lat": 50.0, "lon": 5.0},
            {"icao": "a2", "lat": null, "lon": 5.0},
            {"icao": "a3", "lon": 5.0},
            {"icao": "a4", "lat": "north", "lon": 5.0},
            {"callsign": "NOICAO", "lat": 50.0, "lon": 5.0},
            {"icao": "a5", "lat": 51.0, "lon": 6.0, "track": null, "callsign": "  "}
        ]}]}"#;
        let frames = parse_message(text).unwrap();
        let frame = &frames[0];
        assert_eq!(frame.len(), 2);
        assert!(frame.contains("a1"));
        assert!(frame.contains("a5"));
        let a5 = frame.get("a5").unwrap();
        assert_eq!(a5.callsign, "a5");
        assert_relative_eq!(a5.track, 0.0);
    }

    #[test]
    fn test_unknown_message_type_is_an_error() {
        let err = parse_message(r#"{"type": "diff", "frames": []}"#).unwrap_err();
        assert!(matches!(err, FeedError::Parse(_)));
        assert!(parse_message("not json").is_err());
    }

    #[test]
    fn test_encode_then_parse() {
        let obs = vec![Observation {
            icao: "4ca123".into(),
            callsign: "EIN12".into(),
            position: GeoPoint::new(53.4, -6.2),
            track: 120.0,
            altitude: Feet(12000.0),
            speed: Knots(300.0),
        }];
        let text = encode_snapshot([(5.0, obs.as_slice())]).unwrap();
        assert!(text.contains(r#""type":"snapshot""#));
        let frames = parse_message(&text).unwrap();
        assert_eq!(frames[0].get("4ca123"), Some(&obs[0]));
    }
}
