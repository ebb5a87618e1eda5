//! Core simulation types: immutable configuration and per-tick results.

use std::fmt;

use crate::fleet::{DemandModel, PhysicsParams, Station};
use crate::grid::Microgrid;
use crate::grid::types::GridState;
use crate::route::Route;

use super::metrics::TickDelta;
use super::policy::{PolicyMode, PolicyParams};

/// Timing, sampling and event-stream parameters.
#[derive(Debug, Clone)]
pub struct SimParams {
    /// Simulated seconds per tick.
    pub tick_seconds: f64,
    /// Time of day at tick 0, in hours.
    pub start_hour: f64,
    /// Push a history sample every this many ticks.
    pub history_every: u64,
    /// Emit a congestion summary every this many ticks.
    pub summary_every: u64,
    /// Number of history samples retained.
    pub history_capacity: usize,
    /// A station is crowded when strictly more passengers than this wait.
    pub crowded_above: u32,
    /// Upper bound on the fraction of riders leaving at a stop.
    pub max_alight_fraction: f64,
    pub event_capacity: usize,
    pub event_burst: f64,
    pub event_refill_per_tick: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            tick_seconds: 2.0,
            start_hour: 6.0,
            history_every: 300,
            summary_every: 900,
            history_capacity: 288,
            crowded_above: 10,
            max_alight_fraction: 0.4,
            event_capacity: 50,
            event_burst: 5.0,
            event_refill_per_tick: 0.01,
        }
    }
}

/// How the fleet is populated at reset.
#[derive(Debug, Clone)]
pub struct FleetSetup {
    pub size: usize,
    pub capacity: u32,
    /// Initial SoC is drawn uniformly from `[initial_soc_min, initial_soc_max]`.
    pub initial_soc_min: f64,
    pub initial_soc_max: f64,
}

impl Default for FleetSetup {
    fn default() -> Self {
        Self {
            size: 6,
            capacity: 12,
            initial_soc_min: 45.0,
            initial_soc_max: 95.0,
        }
    }
}

/// Everything the engine needs, fixed for the lifetime of a run.
///
/// Shared behind an `Arc` so that resets and parallel runs reuse it.
#[derive(Debug, Clone)]
pub struct FleetConfig {
    pub sim: SimParams,
    pub fleet: FleetSetup,
    pub route: Route,
    /// One station per route waypoint, same order, queues empty.
    pub stations: Vec<Station>,
    pub physics: PhysicsParams,
    pub policy: PolicyParams,
    pub demand: DemandModel,
    pub grid: Microgrid,
    /// Policy in force when a simulation is created.
    pub mode: PolicyMode,
    pub seed: u64,
}

impl FleetConfig {
    /// Assembles a configuration.
    ///
    /// # Panics
    ///
    /// Panics if `stations` does not have one entry per route waypoint or the
    /// fleet is empty.
    #[expect(clippy::too_many_arguments)]
    pub fn new(
        sim: SimParams,
        fleet: FleetSetup,
        route: Route,
        stations: Vec<Station>,
        physics: PhysicsParams,
        policy: PolicyParams,
        demand: DemandModel,
        grid: Microgrid,
        mode: PolicyMode,
        seed: u64,
    ) -> Self {
        assert_eq!(stations.len(), route.len(), "one station per waypoint");
        assert!(fleet.size > 0, "fleet must not be empty");
        Self {
            sim,
            fleet,
            route,
            stations,
            physics,
            policy,
            demand,
            grid,
            mode,
            seed,
        }
    }
}

/// Outcome of one tick.
#[derive(Debug, Clone)]
pub struct TickSummary {
    pub tick: u64,
    pub sim_time_s: f64,
    pub grid: GridState,
    pub delta: TickDelta,
    /// Passengers that joined a queue this tick.
    pub arrivals: u32,
    pub total_waiting: u32,
    pub vehicles_charging: usize,
    pub vehicles_platooning: usize,
}

impl fmt::Display for TickSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>6} ({:>8.0}s) | grid={} net={:>5.1} price={:.2} | \
             energy={:.4} kWh (cf {:.4}) dist={:.1} m | waiting={} served={} \
             charging={} platooning={}",
            self.tick,
            self.sim_time_s,
            self.grid.status,
            self.grid.net_load,
            self.grid.price,
            self.delta.energy_actual_kwh,
            self.delta.energy_counterfactual_kwh,
            self.delta.distance_m,
            self.total_waiting,
            self.delta.served,
            self.vehicles_charging,
            self.vehicles_platooning,
        )
    }
}
