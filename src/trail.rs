//! Trajectory trails behind moving aircraft.
//!
//! Live trails walk the frame history backwards; simulated trails are a
//! slice of the flight's precomputed path. Both are ordered from the most
//! recent point to the oldest and skip points outside the bounding region.

use bevy::math::DVec2;
use std::time::Duration;

use crate::geo::{BoundingRegion, GeoPoint, Projection};
use crate::live::FrameHistory;
use crate::sim::FlightPath;

/// Default visible trail length for simulated flights, as a fraction of the route.
pub const DEFAULT_TRAIL_FRACTION: f64 = 0.24;

/// Ordered trail points, most recent first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trail {
    points: Vec<GeoPoint>,
}

impl Trail {
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// A single point cannot be drawn as a line.
    pub fn is_renderable(&self) -> bool {
        self.points.len() >= 2
    }

    /// Start the trail at the marker's `head` position. A leading point equal
    /// to `ahead`, a position the marker has not reached yet, is dropped.
    pub fn anchor_to(&mut self, head: GeoPoint, ahead: GeoPoint) {
        if self.points.first() == Some(&ahead) {
            self.points.remove(0);
        }
        self.points.insert(0, head);
    }

    /// Projected polyline, or nothing when the trail is not renderable.
    pub fn project(&self, projection: &Projection) -> Vec<DVec2> {
        if !self.is_renderable() {
            return Vec::new();
        }
        self.points.iter().map(|p| projection.project(*p)).collect()
    }
}

/// Number of frames covering `window` when frames arrive every `poll_interval`.
pub fn lookback_frames(window: Duration, poll_interval: Duration) -> usize {
    if poll_interval.is_zero() {
        return 1;
    }
    ((window.as_secs_f64() / poll_interval.as_secs_f64()).ceil() as usize).max(1)
}

/// Walk the history from the newest frame backwards collecting `icao`'s
/// positions. Stops at the first frame without the aircraft or after
/// `max_frames` frames. Out-of-bounds points are skipped, not treated as gaps.
pub fn live_trail(history: &FrameHistory, icao: &str, bounds: &BoundingRegion, max_frames: usize) -> Trail {
    let mut points = Vec::new();
    for frame in history.iter_newest_first().take(max_frames) {
        let Some(obs) = frame.get(icao) else {
            break;
        };
        if bounds.contains(obs.position) {
            points.push(obs.position);
        }
    }
    Trail { points }
}

/// Slice of `path` between `progress - trail_fraction` and `progress`.
pub fn path_trail(path: &FlightPath, progress: f64, trail_fraction: f64, bounds: &BoundingRegion) -> Trail {
    let points = path
        .slice((progress - trail_fraction).max(0.0), progress)
        .iter()
        .rev()
        .copied()
        .filter(|p| bounds.contains(*p))
        .collect();
    Trail { points }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::{Frame, Observation};
    use crate::units::{Feet, Knots};
    use proptest::prelude::*;

    fn obs(icao: &str, lat: f64, lon: f64) -> Observation {
        Observation {
            icao: icao.to_string(),
            callsign: icao.to_uppercase(),
            position: GeoPoint::new(lat, lon),
            track: 0.0,
            altitude: Feet(30000.0),
            speed: Knots(400.0),
        }
    }

    fn history_with(frames: Vec<Frame>) -> FrameHistory {
        let mut history = FrameHistory::new(1000);
        history.replace(frames);
        history
    }

    #[test]
    fn test_anchor_replaces_point_ahead_of_marker() {
        let mut trail = Trail {
            points: vec![GeoPoint::new(50.2, 5.0), GeoPoint::new(50.0, 5.0)],
        };
        trail.anchor_to(GeoPoint::new(50.1, 5.0), GeoPoint::new(50.2, 5.0));
        assert_eq!(trail.points(), &[GeoPoint::new(50.1, 5.0), GeoPoint::new(50.0, 5.0)]);

        // an older head is kept behind the marker
        trail.anchor_to(GeoPoint::new(50.15, 5.0), GeoPoint::new(50.3, 5.0));
        assert_eq!(trail.len(), 3);
        assert_eq!(trail.points()[0], GeoPoint::new(50.15, 5.0));

        let mut empty = Trail::default();
        empty.anchor_to(GeoPoint::new(50.0, 5.0), GeoPoint::new(50.0, 5.0));
        assert!(!empty.is_renderable());
    }

    #[test]
    fn test_lookback_for_thirty_minutes_at_five_seconds() {
        assert_eq!(lookback_frames(Duration::from_secs(1800), Duration::from_secs(5)), 360);
        assert_eq!(lookback_frames(Duration::from_secs(7), Duration::from_secs(5)), 2);
        assert_eq!(lookback_frames(Duration::from_secs(10), Duration::ZERO), 1);
    }

    #[test]
    fn test_live_trail_newest_first() {
        let history = history_with(vec![
            Frame::new(0.0, vec![obs("a", 50.0, 5.0)]),
            Frame::new(5.0, vec![obs("a", 50.1, 5.0)]),
            Frame::new(10.0, vec![obs("a", 50.2, 5.0)]),
        ]);
        let trail = live_trail(&history, "a", &BoundingRegion::default(), 360);
        let lats: Vec<f64> = trail.points().iter().map(|p| p.lat).collect();
        assert_eq!(lats, vec![50.2, 50.1, 50.0]);
    }

    #[test]
    fn test_live_trail_stops_at_gap() {
        let history = history_with(vec![
            Frame::new(0.0, vec![obs("a", 50.0, 5.0)]),
            Frame::new(5.0, vec![obs("b", 48.0, 2.0)]),
            Frame::new(10.0, vec![obs("a", 50.2, 5.0)]),
            Frame::new(15.0, vec![obs("a", 50.3, 5.0)]),
        ]);
        let trail = live_trail(&history, "a", &BoundingRegion::default(), 360);
        assert_eq!(trail.len(), 2);
        assert!(trail.is_renderable());
    }

    #[test]
    fn test_live_trail_skips_out_of_bounds_without_stopping() {
        let history = history_with(vec![
            Frame::new(0.0, vec![obs("a", 50.0, 5.0)]),
            Frame::new(5.0, vec![obs("a", 60.0, 5.0)]),
            Frame::new(10.0, vec![obs("a", 50.2, 5.0)]),
        ]);
        let trail = live_trail(&history, "a", &BoundingRegion::default(), 360);
        let lats: Vec<f64> = trail.points().iter().map(|p| p.lat).collect();
        assert_eq!(lats, vec![50.2, 50.0]);
    }

    #[test]
    fn test_single_point_trail_not_renderable() {
        let history = history_with(vec![Frame::new(0.0, vec![obs("a", 50.0, 5.0)])]);
        let trail = live_trail(&history, "a", &BoundingRegion::default(), 360);
        assert_eq!(trail.len(), 1);
        assert!(!trail.is_renderable());
        assert!(trail.project(&Projection::new(BoundingRegion::default(), Default::default())).is_empty());
    }

    #[test]
    fn test_path_trail_slice() {
        let points: Vec<GeoPoint> = (0..=100).map(|i| GeoPoint::new(48.0, i as f64 * 0.1)).collect();
        let path = FlightPath::from_points(points);
        let trail = path_trail(&path, 0.5, 0.25, &BoundingRegion::default());
        // indices 25..=50, newest first
        assert_eq!(trail.len(), 26);
        assert_eq!(trail.points()[0], path.points()[50]);
        assert_eq!(trail.points()[25], path.points()[25]);
    }

    #[test]
    fn test_path_trail_at_departure() {
        let points: Vec<GeoPoint> = (0..=10).map(|i| GeoPoint::new(48.0, i as f64)).collect();
        let path = FlightPath::from_points(points);
        let trail = path_trail(&path, 0.0, 0.24, &BoundingRegion::default());
        assert_eq!(trail.len(), 1);
        assert!(!trail.is_renderable());
    }

    proptest! {
        #[test]
        fn prop_live_trail_respects_window_and_gaps(
            presence in proptest::collection::vec(any::<bool>(), 1..60),
            max_frames in 1usize..40,
        ) {
            let frames: Vec<Frame> = presence
                .iter()
                .enumerate()
                .map(|(i, present)| {
                    let observations = if *present { vec![obs("a", 48.0, 5.0 + i as f64 * 0.01)] } else { vec![] };
                    Frame::new(i as f64, observations)
                })
                .collect();
            let history = history_with(frames);
            let trail = live_trail(&history, "a", &BoundingRegion::default(), max_frames);

            prop_assert!(trail.len() <= max_frames);
            // the trail is exactly the run of consecutive presence ending at the newest frame
            let run = presence.iter().rev().take(max_frames).take_while(|p| **p).count();
            prop_assert_eq!(trail.len(), run);
        }
    }
}
