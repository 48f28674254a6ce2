//! Curved route synthesis between two airports.
//!
//! Routes bow sideways from the direct line by a random amount through a
//! midpoint and two shoulder waypoints, and every point is nudged by a small
//! seed-driven wobble so no two routes look machine-perfect.

use rand::Rng;
use std::f64::consts::PI;
use std::sync::Arc;

use crate::geo::GeoPoint;

/// Lateral deviation of the midpoint as a fraction of the direct distance.
const MIN_DEVIATION: f64 = 0.10;
const MAX_DEVIATION: f64 = 0.25;
/// Shoulder waypoints deviate by this fraction of the midpoint deviation.
const SHOULDER_SCALE: f64 = 0.6;
/// Peak amplitude of the per-point wobble in degrees.
const WOBBLE_DEGREES: f64 = 0.02;
/// Wobble never exceeds this fraction of the direct distance, so short routes
/// keep a wobble well below their point spacing.
const WOBBLE_DISTANCE_FRACTION: f64 = 0.001;
/// Half-width, in progress, of the window a heading is measured over.
pub const HEADING_WINDOW: f64 = 0.01;

/// Ordered, immutable sequence of route points traversed by progress 0..=1.
#[derive(Debug, Clone)]
pub struct FlightPath {
    points: Arc<[GeoPoint]>,
}

impl FlightPath {
    pub fn from_points(points: Vec<GeoPoint>) -> Self {
        Self { points: points.into() }
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Index of the path point at or just behind `progress`.
    pub fn index_at(&self, progress: f64) -> usize {
        let last = self.points.len().saturating_sub(1);
        let scaled = progress.clamp(0.0, 1.0) * last as f64;
        (scaled.floor() as usize).min(last)
    }

    /// Position at `progress`, interpolated between neighbouring points.
    pub fn position_at(&self, progress: f64) -> Option<GeoPoint> {
        let last = self.points.len().checked_sub(1)?;
        let scaled = progress.clamp(0.0, 1.0) * last as f64;
        let i = (scaled.floor() as usize).min(last);
        let next = (i + 1).min(last);
        Some(self.points[i].lerp(self.points[next], scaled - i as f64))
    }

    /// Points between two progress values, inclusive at both ends.
    pub fn slice(&self, from_progress: f64, to_progress: f64) -> &[GeoPoint] {
        if self.points.is_empty() {
            return &[];
        }
        let start = self.index_at(from_progress.min(to_progress));
        let end = self.index_at(from_progress.max(to_progress));
        &self.points[start..=end]
    }

    /// Positions just behind and just ahead of `progress`, for heading
    /// computation. The window is clamped to the ends of the path.
    pub fn tangent_at(&self, progress: f64) -> Option<(GeoPoint, GeoPoint)> {
        if self.points.len() < 2 {
            return None;
        }
        let behind = self.position_at(progress - HEADING_WINDOW)?;
        let ahead = self.position_at(progress + HEADING_WINDOW)?;
        Some((behind, ahead))
    }
}

/// Build the waypoint skeleton: endpoints plus the midpoint and two shoulder
/// points, offset along the perpendicular of the direct line.
///
/// The shoulders give every route at least one spline segment, so the
/// midpoint is never a corner.
fn waypoints(origin: GeoPoint, destination: GeoPoint, rng: &mut impl Rng) -> Vec<GeoPoint> {
    let dx = destination.lon - origin.lon;
    let dy = destination.lat - origin.lat;
    let distance = dx.hypot(dy);
    if distance < f64::EPSILON {
        return vec![origin, destination];
    }

    // unit perpendicular, (lon, lat) components
    let perp_lon = -dy / distance;
    let perp_lat = dx / distance;

    let mut deviation = distance * rng.random_range(MIN_DEVIATION..MAX_DEVIATION);
    if rng.random_bool(0.5) {
        deviation = -deviation;
    }

    let offset = |t: f64, scale: f64| {
        let base = origin.lerp(destination, t);
        GeoPoint::new(
            base.lat + perp_lat * deviation * scale,
            base.lon + perp_lon * deviation * scale,
        )
    };

    vec![
        origin,
        offset(0.25, SHOULDER_SCALE),
        offset(0.5, 1.0),
        offset(0.75, SHOULDER_SCALE),
        destination,
    ]
}

/// Uniform Catmull-Rom spline between `p1` and `p2`.
fn catmull_rom(p0: GeoPoint, p1: GeoPoint, p2: GeoPoint, p3: GeoPoint, t: f64) -> GeoPoint {
    let t2 = t * t;
    let t3 = t2 * t;
    let axis = |a: f64, b: f64, c: f64, d: f64| {
        0.5 * ((2.0 * b)
            + (-a + c) * t
            + (2.0 * a - 5.0 * b + 4.0 * c - d) * t2
            + (-a + 3.0 * b - 3.0 * c + d) * t3)
    };
    GeoPoint::new(
        axis(p0.lat, p1.lat, p2.lat, p3.lat),
        axis(p0.lon, p1.lon, p2.lon, p3.lon),
    )
}

/// Generate a dense curved path from `origin` to `destination`.
///
/// `point_budget` is split evenly across waypoint segments. Interior segments
/// use Catmull-Rom with the neighbouring waypoints as anchors, the first and
/// last segments are linear. The first point is exactly `origin` and the last
/// exactly `destination`.
pub fn synthesize_path(
    origin: GeoPoint,
    destination: GeoPoint,
    seed: f64,
    point_budget: usize,
    rng: &mut impl Rng,
) -> FlightPath {
    let wps = waypoints(origin, destination, rng);
    let segments = wps.len() - 1;
    let per_segment = (point_budget / segments).max(2);

    let mut points = Vec::with_capacity(per_segment * segments + 1);
    for i in 0..segments {
        let interior = i > 0 && i + 1 < segments;
        for j in 0..per_segment {
            let t = j as f64 / per_segment as f64;
            let point = if interior {
                catmull_rom(wps[i - 1], wps[i], wps[i + 1], wps[i + 2], t)
            } else {
                wps[i].lerp(wps[i + 1], t)
            };
            points.push(point);
        }
    }

    let amplitude = WOBBLE_DEGREES.min(origin.degree_distance(destination) * WOBBLE_DISTANCE_FRACTION);
    let n = points.len() as f64;
    for (k, point) in points.iter_mut().enumerate().skip(1) {
        let envelope = (PI * k as f64 / n).sin();
        let phase = k as f64 * 0.37 + seed;
        point.lat += amplitude * envelope * phase.sin();
        point.lon += amplitude * envelope * (phase * 0.8 + seed).cos();
    }

    points.push(destination);
    FlightPath::from_points(points)
}
