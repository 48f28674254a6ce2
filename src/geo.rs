//! Geographic helpers and the lat/lon to screen-pixel projection.
//!
//! The projection is a plain linear mapping of the configured bounding
//! region onto the viewport. Headings derived from it are planar angles in
//! pixel space, which is only acceptable because the region is small.

use bevy::math::DVec2;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

// =============================================================================
// Aviation Constants
// =============================================================================

/// Conversion factor: feet to meters
pub const FEET_TO_METERS: f64 = 0.3048;

/// Conversion factor: nautical miles to kilometers
pub const NM_TO_KM: f64 = 1.852;

/// Flight level threshold in feet (at or above 18,000 ft, altitudes
/// are expressed as flight levels)
pub const FL_THRESHOLD: i32 = 18000;

// =============================================================================
// Geographic Types
// =============================================================================

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Linear interpolation in degree space.
    pub fn lerp(self, other: GeoPoint, t: f64) -> GeoPoint {
        GeoPoint {
            lat: self.lat + (other.lat - self.lat) * t,
            lon: self.lon + (other.lon - self.lon) * t,
        }
    }

    /// Straight-line distance in degrees. Used for route-length bucketing,
    /// not for anything that needs real distances.
    pub fn degree_distance(self, other: GeoPoint) -> f64 {
        (other.lat - self.lat).hypot(other.lon - self.lon)
    }
}

/// Fixed lat/lon rectangle used both for clipping and as the projection domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingRegion {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl Default for BoundingRegion {
    /// Western Europe, matching the snapshot feed's default query box.
    fn default() -> Self {
        Self {
            south: 42.0,
            north: 55.0,
            west: -5.0,
            east: 15.0,
        }
    }
}

impl BoundingRegion {
    /// Edges are inclusive.
    pub fn contains(&self, point: GeoPoint) -> bool {
        point.lat >= self.south
            && point.lat <= self.north
            && point.lon >= self.west
            && point.lon <= self.east
    }

    pub fn is_valid(&self) -> bool {
        self.south < self.north && self.west < self.east
    }
}

// =============================================================================
// Angle Helpers
// =============================================================================

/// Wrap any angle into [0, 360).
pub fn normalize_degrees(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Signed shortest angular difference from `from` to `to`, in (-180, 180].
pub fn shortest_angle_delta(from: f64, to: f64) -> f64 {
    let delta = (to - from).rem_euclid(360.0);
    if delta > 180.0 { delta - 360.0 } else { delta }
}

/// Interpolate between two headings along the minor arc.
pub fn lerp_heading(from: f64, to: f64, t: f64) -> f64 {
    normalize_degrees(from + shortest_angle_delta(from, to) * t)
}

// =============================================================================
// Geodesic Functions
// =============================================================================

/// Calculate the initial bearing (forward azimuth) from `a` to `b`.
/// Returns bearing in degrees (0-360, clockwise from north).
pub fn initial_bearing(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let x = delta_lon.sin() * lat2_rad.cos();
    let y = lat1_rad.cos() * lat2_rad.sin() - lat1_rad.sin() * lat2_rad.cos() * delta_lon.cos();

    normalize_degrees(x.atan2(y).to_degrees())
}

// =============================================================================
// Projection
// =============================================================================

/// Pixel dimensions of the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// Maps geographic coordinates into viewport pixels, origin at the top-left
/// corner (north-west), y growing southwards.
#[derive(Resource, Debug, Clone)]
pub struct Projection {
    bounds: BoundingRegion,
    viewport: Viewport,
}

impl Projection {
    pub fn new(bounds: BoundingRegion, viewport: Viewport) -> Self {
        Self { bounds, viewport }
    }

    pub fn bounds(&self) -> &BoundingRegion {
        &self.bounds
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Update the viewport size. Returns `true` when it actually changed.
    pub fn set_viewport(&mut self, width: f64, height: f64) -> bool {
        let next = Viewport { width, height };
        if next == self.viewport {
            return false;
        }
        self.viewport = next;
        true
    }

    pub fn project(&self, point: GeoPoint) -> DVec2 {
        let b = &self.bounds;
        let x = (point.lon - b.west) / (b.east - b.west) * self.viewport.width;
        let y = (b.north - point.lat) / (b.north - b.south) * self.viewport.height;
        DVec2::new(x, y)
    }

    /// Planar heading from `a` to `b` in pixel space: 0° = east, 90° = north.
    pub fn heading(&self, a: GeoPoint, b: GeoPoint) -> f64 {
        let pa = self.project(a);
        let pb = self.project(b);
        let dx = pb.x - pa.x;
        // screen y grows downwards
        let dy = pa.y - pb.y;
        normalize_degrees(dy.atan2(dx).to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn projection() -> Projection {
        Projection::new(BoundingRegion::default(), Viewport { width: 1000.0, height: 650.0 })
    }

    #[test]
    fn test_project_corners() {
        let p = projection();
        let nw = p.project(GeoPoint::new(55.0, -5.0));
        let se = p.project(GeoPoint::new(42.0, 15.0));
        assert_relative_eq!(nw.x, 0.0);
        assert_relative_eq!(nw.y, 0.0);
        assert_relative_eq!(se.x, 1000.0);
        assert_relative_eq!(se.y, 650.0);
    }

    #[test]
    fn test_set_viewport_reports_change() {
        let mut p = projection();
        assert!(!p.set_viewport(1000.0, 650.0));
        assert!(p.set_viewport(500.0, 650.0));
        assert_relative_eq!(p.project(GeoPoint::new(42.0, 15.0)).x, 500.0);
    }

    #[test]
    fn test_heading_cardinal_directions() {
        let p = projection();
        let origin = GeoPoint::new(48.0, 5.0);
        assert_relative_eq!(p.heading(origin, GeoPoint::new(48.0, 6.0)), 0.0);
        assert_relative_eq!(p.heading(origin, GeoPoint::new(49.0, 5.0)), 90.0);
        assert_relative_eq!(p.heading(origin, GeoPoint::new(48.0, 4.0)), 180.0);
        assert_relative_eq!(p.heading(origin, GeoPoint::new(47.0, 5.0)), 270.0);
    }

    #[test]
    fn test_shortest_angle_delta_wraps() {
        assert_relative_eq!(shortest_angle_delta(359.0, 1.0), 2.0);
        assert_relative_eq!(shortest_angle_delta(1.0, 359.0), -2.0);
        assert_relative_eq!(shortest_angle_delta(0.0, 180.0), 180.0);
        assert_relative_eq!(shortest_angle_delta(180.0, 0.0), 180.0);
        assert_relative_eq!(shortest_angle_delta(90.0, 90.0), 0.0);
    }

    #[test]
    fn test_lerp_heading_crosses_north() {
        let mid = lerp_heading(350.0, 10.0, 0.5);
        assert_relative_eq!(mid, 0.0);
        assert_relative_eq!(lerp_heading(350.0, 10.0, 0.25), 355.0);
    }

    #[test]
    fn test_contains_is_inclusive() {
        let b = BoundingRegion::default();
        assert!(b.contains(GeoPoint::new(42.0, -5.0)));
        assert!(b.contains(GeoPoint::new(55.0, 15.0)));
        assert!(!b.contains(GeoPoint::new(55.01, 0.0)));
        assert!(!b.contains(GeoPoint::new(50.0, 15.5)));
    }

    #[test]
    fn test_initial_bearing_east_at_equator() {
        let b = initial_bearing(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0));
        assert_relative_eq!(b, 90.0, epsilon = 1e-9);
    }

    proptest! {
        #[test]
        fn prop_lerp_heading_stays_on_minor_arc(
            h1 in 0.0f64..360.0,
            h2 in 0.0f64..360.0,
            t in 0.0f64..=1.0,
        ) {
            let total = shortest_angle_delta(h1, h2);
            prop_assert!(total.abs() <= 180.0);
            let mid = lerp_heading(h1, h2, t);
            let expected = h1 + total * t;
            prop_assert!(shortest_angle_delta(expected, mid).abs() < 1e-6);
        }

        #[test]
        fn prop_projection_is_monotonic(
            lat in 42.0f64..55.0,
            lon in -5.0f64..15.0,
            dlat in 0.0f64..1.0,
            dlon in 0.0f64..1.0,
        ) {
            let p = projection();
            let base = p.project(GeoPoint::new(lat, lon));
            let north = p.project(GeoPoint::new(lat + dlat, lon));
            let east = p.project(GeoPoint::new(lat, lon + dlon));
            prop_assert!(north.y <= base.y);
            prop_assert!(east.x >= base.x);
            if dlon > 0.0 {
                prop_assert!(east.x > base.x);
            }
        }

        #[test]
        fn prop_heading_in_range(
            lat1 in 42.0f64..55.0, lon1 in -5.0f64..15.0,
            lat2 in 42.0f64..55.0, lon2 in -5.0f64..15.0,
        ) {
            let h = projection().heading(GeoPoint::new(lat1, lon1), GeoPoint::new(lat2, lon2));
            prop_assert!((0.0..360.0).contains(&h));
        }
    }
}
