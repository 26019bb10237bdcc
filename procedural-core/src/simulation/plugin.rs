use bevy::prelude::*;
use std::sync::{Arc, RwLock};
use tracing::error;

use crate::config::WorldConfig;
use crate::simulation::snapshot::FrameSnapshot;
use crate::simulation::{PlayerAction, SimEvent, Simulation};

/// Runs a [`Simulation`] inside a Bevy app. Hosts push input into
/// [`PendingActions`], read [`SimulationEvent`]s and draw [`LatestFrame`].
pub struct SimulationPlugin {
    pub config: WorldConfig,
}

impl SimulationPlugin {
    pub fn new(config: WorldConfig) -> Self {
        Self { config }
    }
}

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Time>()
            .init_resource::<PendingActions>()
            .init_resource::<LatestFrame>()
            .add_event::<SimulationEvent>();

        match Simulation::new(self.config.clone()) {
            Ok(simulation) => {
                app.insert_resource(SimulationResource(Arc::new(RwLock::new(simulation))))
                    .add_systems(Update, simulation_tick_system);
            }
            Err(err) => error!(%err, "simulation could not start"),
        }
    }
}

#[derive(Resource)]
pub struct SimulationResource(pub Arc<RwLock<Simulation>>);

/// Actions queued for the next tick.
#[derive(Resource, Default)]
pub struct PendingActions(pub Vec<PlayerAction>);

#[derive(Resource, Default)]
pub struct LatestFrame(pub Option<FrameSnapshot>);

#[derive(Event, Debug, Clone)]
pub struct SimulationEvent(pub SimEvent);

fn simulation_tick_system(
    time: Res<Time>,
    sim_res: Res<SimulationResource>,
    mut pending: ResMut<PendingActions>,
    mut frame: ResMut<LatestFrame>,
    mut events: EventWriter<SimulationEvent>,
) {
    let Ok(mut sim) = sim_res.0.write() else {
        return;
    };
    let dt = match time.delta_secs() {
        dt if dt > 0.0 => dt,
        _ => sim.config().tick_seconds(),
    };
    let actions = std::mem::take(&mut pending.0);
    for event in sim.tick(&actions, dt) {
        events.send(SimulationEvent(event));
    }
    frame.0 = Some(sim.snapshot());
}
