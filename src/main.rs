use bevy::prelude::*;
use clap::Parser;
use std::path::PathBuf;

use airtrail::config::{self, Mode};
use airtrail::geo::{Projection, Viewport};
use airtrail::live::LivePlugin;
use airtrail::map::MapPlugin;
use airtrail::paths;
use airtrail::sim::SimulationPlugin;

#[derive(Parser, Debug)]
#[command(version, about = "Animated aircraft map")]
struct Args {
    /// Path to config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured mode
    #[arg(long, value_enum)]
    mode: Option<Mode>,
}

fn main() {
    let args = Args::parse();
    let config_path = paths::resolve_config_path(args.config.as_deref());
    let mut app_config = config::load_config(&config_path);
    if let Some(mode) = args.mode {
        app_config.mode = mode;
    }

    let viewport = Viewport::default();
    let projection = Projection::new(app_config.map.bounds, viewport);
    let tick_hz = app_config.map.tick_hz;
    let mode = app_config.mode;

    let mut app = App::new();
    app.add_plugins((
        DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "AirTrail - Aircraft Map".to_string(),
                resolution: (viewport.width as u32, viewport.height as u32).into(),
                ..default()
            }),
            ..default()
        }),
        MapPlugin,
    ))
    .insert_resource(ClearColor(Color::srgb(0.05, 0.07, 0.1)))
    .insert_resource(Time::<Fixed>::from_hz(tick_hz))
    .insert_resource(projection)
    .insert_resource(app_config);

    match mode {
        Mode::Live => app.add_plugins(LivePlugin),
        Mode::Simulation => app.add_plugins(SimulationPlugin),
    };

    app.run();
}
