//! Smoothed aircraft positions between discrete feed snapshots.
//!
//! Each snapshot sets a new target per aircraft. Every tick moves the
//! displayed position from where it was when the target changed towards the
//! target, linearly in wall-clock time over a fixed duration. Headings take
//! the shorter way around the compass.

use bevy::prelude::*;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::FeedConfig;
use crate::geo::{lerp_heading, GeoPoint, Projection};
use crate::render::{Heading, Readout, RenderItem};
use crate::sim::airports::palette_color;
use crate::trail::{live_trail, lookback_frames};
use crate::units::{Feet, Knots};

use super::history::FrameHistory;
use super::snapshot::{Frame, Observation};

/// Position plus compass track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPosition {
    pub lat: f64,
    pub lon: f64,
    pub heading: f64,
}

impl TrackPosition {
    pub fn geo(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }

    fn interpolate(&self, to: &TrackPosition, t: f64) -> TrackPosition {
        let p = self.geo().lerp(to.geo(), t);
        TrackPosition {
            lat: p.lat,
            lon: p.lon,
            heading: lerp_heading(self.heading, to.heading, t),
        }
    }
}

impl From<&Observation> for TrackPosition {
    fn from(obs: &Observation) -> Self {
        Self {
            lat: obs.position.lat,
            lon: obs.position.lon,
            heading: obs.track,
        }
    }
}

/// Persistent interpolation state for one aircraft.
#[derive(Debug, Clone)]
pub struct AircraftTrack {
    pub icao: String,
    pub callsign: String,
    /// Where the marker is drawn.
    pub current: TrackPosition,
    /// Latest observed position.
    pub target: TrackPosition,
    /// Where the marker was when the target last changed.
    pub from: TrackPosition,
    /// Start of the running interpolation, or of the last completed one.
    pub last_update_ms: f64,
    pub last_seen_ms: f64,
    pub altitude: Feet,
    pub speed: Knots,
}

impl AircraftTrack {
    fn new(obs: &Observation, now_ms: f64) -> Self {
        let position = TrackPosition::from(obs);
        Self {
            icao: obs.icao.clone(),
            callsign: obs.callsign.clone(),
            current: position,
            target: position,
            from: position,
            last_update_ms: now_ms,
            last_seen_ms: now_ms,
            altitude: obs.altitude,
            speed: obs.speed,
        }
    }

    /// Take a new observation. The interpolation restarts from the current
    /// position only when the target actually moved.
    fn observe(&mut self, obs: &Observation, now_ms: f64) {
        let target = TrackPosition::from(obs);
        if target != self.target {
            self.from = self.current;
            self.target = target;
            self.last_update_ms = now_ms;
        }
        self.callsign.clone_from(&obs.callsign);
        self.altitude = obs.altitude;
        self.speed = obs.speed;
        self.last_seen_ms = now_ms;
    }

    fn advance(&mut self, now_ms: f64, duration_ms: f64) {
        if self.current == self.target {
            return;
        }
        let elapsed = (now_ms - self.last_update_ms).max(0.0);
        let t = if duration_ms > 0.0 {
            (elapsed / duration_ms).min(1.0)
        } else {
            1.0
        };

        if t >= 1.0 {
            self.current = self.target;
            self.from = self.target;
            self.last_update_ms = now_ms;
        } else {
            self.current = self.from.interpolate(&self.target, t);
        }
    }
}

/// Live tracks plus the rolling frame history they are drawn from.
#[derive(Resource, Debug)]
pub struct LiveEngine {
    tracks: HashMap<String, AircraftTrack>,
    history: FrameHistory,
    interpolation_ms: f64,
    lookback_frames: usize,
    window_ms: f64,
}

impl LiveEngine {
    pub fn new(interpolation: Duration, window: Duration, poll_interval: Duration) -> Self {
        let lookback = lookback_frames(window, poll_interval);
        Self {
            tracks: HashMap::new(),
            history: FrameHistory::new(lookback),
            interpolation_ms: interpolation.as_secs_f64() * 1000.0,
            lookback_frames: lookback,
            window_ms: window.as_secs_f64() * 1000.0,
        }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(
            Duration::from_millis(config.interpolation_ms),
            config.history_window(),
            config.poll_interval(),
        )
    }

    /// Replace the frame history with a fresh snapshot and retarget every
    /// aircraft in its newest frame. Tracks unseen for longer than the
    /// history window are dropped.
    pub fn apply_snapshot(&mut self, frames: Vec<Frame>, now_ms: f64) {
        self.history.replace(frames);

        if let Some(latest) = self.history.latest() {
            for obs in latest.observations() {
                match self.tracks.entry(obs.icao.clone()) {
                    Entry::Occupied(mut entry) => entry.get_mut().observe(obs, now_ms),
                    Entry::Vacant(entry) => {
                        debug!("New track {} ({})", obs.icao, obs.callsign);
                        entry.insert(AircraftTrack::new(obs, now_ms));
                    }
                }
            }
        }

        let window_ms = self.window_ms;
        let before = self.tracks.len();
        self.tracks.retain(|_, track| now_ms - track.last_seen_ms <= window_ms);
        let evicted = before - self.tracks.len();
        if evicted > 0 {
            debug!("Evicted {} stale tracks", evicted);
        }
    }

    /// Advance every track to `now_ms` and return the aircraft of the newest
    /// frame that sit inside the bounds, ordered by identifier.
    pub fn tick(&mut self, now_ms: f64, projection: &Projection) -> Vec<RenderItem> {
        for track in self.tracks.values_mut() {
            track.advance(now_ms, self.interpolation_ms);
        }

        let Some(latest) = self.history.latest() else {
            return Vec::new();
        };
        let bounds = projection.bounds();

        let mut items: Vec<RenderItem> = latest
            .observations()
            .filter_map(|obs| self.tracks.get(&obs.icao))
            .filter(|track| bounds.contains(track.current.geo()))
            .map(|track| {
                let mut trail = live_trail(&self.history, &track.icao, bounds, self.lookback_frames);
                trail.anchor_to(track.current.geo(), track.target.geo());
                RenderItem {
                    id: track.icao.clone(),
                    label: track.callsign.clone(),
                    position: projection.project(track.current.geo()),
                    heading: Heading::Track(track.current.heading),
                    trail: trail.project(projection),
                    color: track_color(&track.icao),
                    readout: Readout::observed(track.altitude, track.speed),
                }
            })
            .collect();

        items.sort_by(|a, b| a.id.cmp(&b.id));
        items
    }

    pub fn track(&self, icao: &str) -> Option<&AircraftTrack> {
        self.tracks.get(icao)
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn history(&self) -> &FrameHistory {
        &self.history
    }

    pub fn lookback_frames(&self) -> usize {
        self.lookback_frames
    }
}

/// Stable colour per aircraft.
fn track_color(icao: &str) -> Color {
    palette_color(icao.bytes().map(usize::from).sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{BoundingRegion, Viewport};
    use approx::assert_relative_eq;

    fn obs(icao: &str, lat: f64, lon: f64, track: f64) -> Observation {
        Observation {
            icao: icao.to_string(),
            callsign: format!("{}-CS", icao),
            position: GeoPoint::new(lat, lon),
            track,
            altitude: Feet(35000.0),
            speed: Knots(450.0),
        }
    }

    fn engine() -> LiveEngine {
        LiveEngine::from_config(&FeedConfig::default())
    }

    fn projection() -> Projection {
        Projection::new(BoundingRegion::default(), Viewport::default())
    }

    #[test]
    fn test_lookback_from_defaults() {
        let engine = engine();
        assert_eq!(engine.lookback_frames(), 360);
        assert_eq!(engine.history().capacity(), 360);
    }

    #[test]
    fn test_interpolates_between_snapshots() {
        let mut engine = engine();
        let projection = projection();
        let first = Frame::new(0.0, vec![obs("a", 50.0, 5.0, 90.0)]);
        engine.apply_snapshot(vec![first.clone()], 0.0);
        engine.tick(100.0, &projection);
        assert_relative_eq!(engine.track("a").unwrap().current.lat, 50.0);

        let second = Frame::new(5000.0, vec![obs("a", 50.1, 5.0, 90.0)]);
        engine.apply_snapshot(vec![first, second], 5000.0);

        engine.tick(6000.0, &projection);
        let lat = engine.track("a").unwrap().current.lat;
        assert!(lat > 50.0 && lat < 50.1, "lat {} not strictly between", lat);

        engine.tick(7000.0, &projection);
        let track = engine.track("a").unwrap();
        assert_eq!(track.current, track.target);
        assert_relative_eq!(track.current.lat, 50.1);

        // stationary target stays put
        engine.tick(9000.0, &projection);
        assert_relative_eq!(engine.track("a").unwrap().current.lat, 50.1);
    }

    #[test]
    fn test_interpolation_is_linear_in_time() {
        let mut engine = engine();
        let projection = projection();
        engine.apply_snapshot(vec![Frame::new(0.0, vec![obs("a", 50.0, 5.0, 90.0)])], 0.0);
        engine.apply_snapshot(vec![Frame::new(5.0, vec![obs("a", 51.0, 5.0, 90.0)])], 1000.0);

        // tick rate does not matter: many small ticks land where one big tick does
        for ms in (1001..=1500).step_by(7) {
            engine.tick(ms as f64, &projection);
        }
        engine.tick(1500.0, &projection);
        assert_relative_eq!(engine.track("a").unwrap().current.lat, 50.25, epsilon = 1e-9);
    }

    #[test]
    fn test_heading_takes_short_arc() {
        let mut engine = engine();
        let projection = projection();
        engine.apply_snapshot(vec![Frame::new(0.0, vec![obs("a", 50.0, 5.0, 350.0)])], 0.0);
        engine.apply_snapshot(vec![Frame::new(5.0, vec![obs("a", 50.0, 5.1, 10.0)])], 0.0);
        engine.tick(1000.0, &projection);
        let heading = engine.track("a").unwrap().current.heading;
        assert!(heading < 1e-6 || heading > 359.999, "heading {} went the long way", heading);
    }

    #[test]
    fn test_track_updated_in_place() {
        let mut engine = engine();
        engine.apply_snapshot(vec![Frame::new(0.0, vec![obs("a", 50.0, 5.0, 90.0)])], 0.0);
        engine.apply_snapshot(vec![Frame::new(5.0, vec![obs("a", 50.0, 5.0, 90.0)])], 5000.0);
        let track = engine.track("a").unwrap();
        // an unchanged target keeps its interpolation clock
        assert_relative_eq!(track.last_update_ms, 0.0);
        assert_relative_eq!(track.last_seen_ms, 5000.0);
    }

    #[test]
    fn test_no_ghost_markers_after_shrinking_snapshot() {
        let mut engine = engine();
        let projection = projection();
        engine.apply_snapshot(
            vec![Frame::new(0.0, vec![obs("a", 50.0, 5.0, 0.0), obs("b", 48.0, 2.0, 0.0)])],
            0.0,
        );
        assert_eq!(engine.tick(10.0, &projection).len(), 2);

        engine.apply_snapshot(vec![Frame::new(5.0, vec![obs("a", 50.0, 5.0, 0.0)])], 5000.0);
        let items = engine.tick(5010.0, &projection);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "a");
        // b is still tracked, just not drawn
        assert!(engine.track("b").is_some());
    }

    #[test]
    fn test_out_of_bounds_tracks_are_hidden_not_dropped() {
        let mut engine = engine();
        let projection = projection();
        engine.apply_snapshot(vec![Frame::new(0.0, vec![obs("far", 60.0, 5.0, 0.0)])], 0.0);
        assert!(engine.tick(10.0, &projection).is_empty());
        assert_eq!(engine.track_count(), 1);
    }

    #[test]
    fn test_stale_tracks_are_evicted() {
        let mut engine = LiveEngine::new(
            Duration::from_millis(2000),
            Duration::from_secs(60),
            Duration::from_secs(5),
        );
        engine.apply_snapshot(vec![Frame::new(0.0, vec![obs("a", 50.0, 5.0, 0.0)])], 0.0);
        engine.apply_snapshot(vec![Frame::new(30.0, vec![obs("b", 48.0, 2.0, 0.0)])], 30_000.0);
        assert_eq!(engine.track_count(), 2);
        engine.apply_snapshot(vec![Frame::new(61.0, vec![obs("b", 48.0, 2.0, 0.0)])], 61_000.0);
        assert!(engine.track("a").is_none());
        assert!(engine.track("b").is_some());
    }

    #[test]
    fn test_render_item_carries_trail() {
        let mut engine = engine();
        let projection = projection();
        engine.apply_snapshot(
            vec![
                Frame::new(0.0, vec![obs("a", 50.0, 5.0, 0.0)]),
                Frame::new(5.0, vec![obs("a", 50.1, 5.0, 0.0)]),
                Frame::new(10.0, vec![obs("a", 50.2, 5.0, 0.0)]),
            ],
            0.0,
        );
        let items = engine.tick(0.0, &projection);
        assert_eq!(items[0].trail.len(), 3);
        assert_eq!(items[0].trail[0], projection.project(GeoPoint::new(50.2, 5.0)));
        assert!(matches!(items[0].heading, Heading::Track(_)));
    }

    #[test]
    fn test_trail_starts_at_marker_while_interpolating() {
        let mut engine = engine();
        let projection = projection();
        let interpolation = FeedConfig::default().interpolation_ms as f64;
        engine.apply_snapshot(vec![Frame::new(0.0, vec![obs("a", 50.0, 5.0, 0.0)])], 0.0);
        engine.apply_snapshot(
            vec![
                Frame::new(0.0, vec![obs("a", 50.0, 5.0, 0.0)]),
                Frame::new(5.0, vec![obs("a", 50.2, 5.0, 0.0)]),
            ],
            1_000.0,
        );

        let items = engine.tick(1_000.0 + interpolation / 2.0, &projection);
        let item = &items[0];
        assert_eq!(item.trail.len(), 2);
        assert_eq!(item.trail[0], item.position);
        assert_eq!(item.trail[1], projection.project(GeoPoint::new(50.0, 5.0)));
        // the target is not drawn ahead of the marker
        assert!(item.trail[0].y > projection.project(GeoPoint::new(50.2, 5.0)).y);
    }

    #[test]
    fn test_empty_snapshot_renders_nothing() {
        let mut engine = engine();
        engine.apply_snapshot(Vec::new(), 0.0);
        assert!(engine.tick(0.0, &projection()).is_empty());
    }
}
