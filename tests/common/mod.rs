//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use fleet_sim::config::ScenarioConfig;
use fleet_sim::sim::{FleetConfig, PolicyMode, Simulation};

/// Zones of the island loop.
pub const ZONES: [&str; 4] = ["Jinhu", "Jinsha", "Jincheng", "Jinning"];

/// Default island configuration (6 vehicles, adaptive, seed 42).
pub fn island_config() -> Arc<FleetConfig> {
    island_with(|_| {})
}

/// Island configuration with scenario tweaks applied before building.
pub fn island_with(tweak: impl FnOnce(&mut ScenarioConfig)) -> Arc<FleetConfig> {
    let mut scenario = ScenarioConfig::island();
    tweak(&mut scenario);
    Arc::new(scenario.build().unwrap())
}

/// Simulation on `config` in `mode` with the configured seed.
pub fn simulation(config: &Arc<FleetConfig>, mode: PolicyMode) -> Simulation {
    Simulation::with_seed(Arc::clone(config), mode, config.seed)
}

/// Moves a vehicle to `progress` with the given SoC, at rest and empty.
pub fn place(sim: &mut Simulation, id: usize, progress: f64, soc: f64) {
    let v = &mut sim.vehicles_mut()[id];
    v.route_progress = progress;
    v.battery_soc = soc;
    v.speed_mps = 0.0;
    v.passenger_count = 0;
}

/// Two-vehicle island fleet, both on the long Guningtou leg about 40 m apart.
pub fn platoon_pair(mode: PolicyMode) -> Simulation {
    let config = island_with(|s| s.fleet.size = 2);
    let mut sim = simulation(&config, mode);
    let leg_m = sim.config().route.segment_length_m(7);
    place(&mut sim, 0, 7.1 + 40.0 / leg_m, 80.0);
    place(&mut sim, 1, 7.1, 80.0);
    sim
}
