pub mod airports;
pub mod engine;
pub mod flight;
pub mod kinematics;
pub mod path;

pub use airports::{AirportNetwork, Route};
pub use engine::SimulationEngine;
pub use flight::{FlightTiming, SimulatedFlight};
pub use kinematics::{CruiseProfile, FlightPhase, KinematicState, PhaseModel, Turbulence};
pub use path::{synthesize_path, FlightPath};

use bevy::prelude::*;

use crate::config::AppConfig;
use crate::geo::Projection;
use crate::render::RenderSink;

/// Procedurally generated traffic between European airports.
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RenderSink>()
            .add_systems(Startup, setup_simulation)
            .add_systems(FixedUpdate, tick_simulation);
    }
}

pub fn setup_simulation(mut commands: Commands, config: Res<AppConfig>, time: Res<Time>) {
    let network = AirportNetwork::european();
    let engine = SimulationEngine::new(&config.simulation, &network, time.elapsed_secs_f64() * 1000.0);
    commands.insert_resource(engine);
}

pub fn tick_simulation(
    time: Res<Time>,
    projection: Res<Projection>,
    engine: Option<ResMut<SimulationEngine>>,
    mut sink: ResMut<RenderSink>,
) {
    let Some(mut engine) = engine else {
        return;
    };
    let items = engine.tick(time.elapsed_secs_f64() * 1000.0, &projection);
    sink.publish(items);
}
