//! Per-tick render list handed from the engines to the drawing layer.

use bevy::math::DVec2;
use bevy::prelude::*;

use crate::geo::Viewport;
use crate::sim::{FlightPhase, KinematicState, Turbulence};
use crate::units::{Feet, FeetPerMinute, Knots};

/// Marker orientation. Live tracks carry a compass track from the feed,
/// simulated flights carry a planar heading measured on the projected path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Heading {
    /// Degrees clockwise from north.
    Track(f64),
    /// Degrees counter-clockwise from east, in screen space.
    Planar(f64),
}

impl Heading {
    /// Counter-clockwise angle from +x in radians, y up.
    pub fn screen_angle(&self) -> f64 {
        match *self {
            Heading::Track(track) => (90.0 - track).to_radians(),
            Heading::Planar(planar) => planar.to_radians(),
        }
    }
}

/// Numbers shown next to a marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Readout {
    pub altitude: Feet,
    pub speed: Knots,
    pub vertical_speed: Option<FeetPerMinute>,
    pub phase: Option<FlightPhase>,
    pub turbulence: Option<Turbulence>,
}

impl Readout {
    pub fn observed(altitude: Feet, speed: Knots) -> Self {
        Self {
            altitude,
            speed,
            vertical_speed: None,
            phase: None,
            turbulence: None,
        }
    }

    pub fn label(&self) -> String {
        let mut text = format!("{} {}", self.altitude, self.speed);
        if let Some(vs) = self.vertical_speed {
            text.push_str(&format!(" {}{}", vs.indicator(), vs));
        }
        if let Some(phase) = self.phase {
            text.push_str(&format!(" {}", phase.label()));
        }
        if let Some(turbulence) = self.turbulence.filter(|t| *t != Turbulence::Calm) {
            text.push_str(&format!(" ({} turbulence)", turbulence.label()));
        }
        text
    }
}

impl From<KinematicState> for Readout {
    fn from(state: KinematicState) -> Self {
        Self {
            altitude: state.altitude,
            speed: state.speed,
            vertical_speed: Some(state.vertical_speed),
            phase: Some(state.phase),
            turbulence: Some(state.turbulence),
        }
    }
}

/// One visible aircraft for one tick. Positions are viewport pixels with the
/// origin at the top-left corner.
#[derive(Debug, Clone)]
pub struct RenderItem {
    pub id: String,
    pub label: String,
    pub position: DVec2,
    pub heading: Heading,
    /// Projected trail, most recent point first. Empty when too short to draw.
    pub trail: Vec<DVec2>,
    pub color: Color,
    pub readout: Readout,
}

/// Output of the latest engine tick.
#[derive(Resource, Default, Debug)]
pub struct RenderSink {
    items: Vec<RenderItem>,
    ticks: u64,
}

impl RenderSink {
    pub fn publish(&mut self, items: Vec<RenderItem>) {
        self.items = items;
        self.ticks += 1;
    }

    pub fn items(&self) -> &[RenderItem] {
        &self.items
    }

    pub fn find(&self, id: &str) -> Option<&RenderItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

/// Convert viewport pixels to 2D world coordinates for a camera centred on
/// the viewport.
pub fn viewport_to_world(point: DVec2, viewport: Viewport) -> Vec2 {
    Vec2::new(
        (point.x - viewport.width / 2.0) as f32,
        (viewport.height / 2.0 - point.y) as f32,
    )
}

/// Opacity of trail segment `index` out of `segments`, fading from `head`
/// at the aircraft to `tail` at the oldest point.
pub fn trail_alpha(index: usize, segments: usize, head: f32, tail: f32) -> f32 {
    if segments <= 1 {
        return head;
    }
    let t = index as f32 / (segments - 1) as f32;
    head + (tail - head) * t
}
