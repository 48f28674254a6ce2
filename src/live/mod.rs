pub mod connection;
pub mod engine;
pub mod history;
pub mod snapshot;

pub use connection::*;
pub use engine::{AircraftTrack, LiveEngine, TrackPosition};
pub use history::FrameHistory;
pub use snapshot::{encode_snapshot, parse_message, Frame, Observation, WireFlight};

use bevy::prelude::*;

use crate::geo::Projection;
use crate::render::RenderSink;

/// Aircraft animated from snapshots pushed by a snapshot feed.
pub struct LivePlugin;

impl Plugin for LivePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RenderSink>()
            .init_resource::<FeedState>()
            .add_systems(Startup, (setup_feed_client, spawn_status_text))
            .add_systems(FixedUpdate, (drain_feed_events, tick_live).chain())
            .add_systems(Update, update_feed_status_text);
    }
}

pub fn tick_live(
    time: Res<Time>,
    projection: Res<Projection>,
    engine: Option<ResMut<LiveEngine>>,
    mut sink: ResMut<RenderSink>,
) {
    let Some(mut engine) = engine else {
        return;
    };
    let items = engine.tick(time.elapsed_secs_f64() * 1000.0, &projection);
    sink.publish(items);
}
