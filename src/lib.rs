//! Animated aircraft map: live snapshots or procedurally generated traffic,
//! interpolated per tick and drawn with fading trajectory trails.

pub mod config;
pub mod error;
pub mod feed;
pub mod geo;
pub mod live;
pub mod map;
pub mod paths;
pub mod render;
pub mod sim;
pub mod trail;
pub mod units;

pub use config::{AppConfig, Mode};
pub use geo::{BoundingRegion, GeoPoint, Projection, Viewport};
pub use render::{Heading, RenderItem, RenderSink};
