//! Consumer-facing, self-consistent views of the simulation.
//!
//! A [`FleetSnapshot`] is built in one call from a single committed tick and is
//! immutable afterwards, so observers can share it behind an `Arc`.

use serde::Serialize;

use crate::fleet::{StationStatus, VehicleStatus};
use crate::grid::types::{GridState, GridStatus};

use super::event::LogEvent;
use super::metrics::FleetMetrics;
use super::policy::{Action, PolicyMode};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleView {
    pub id: usize,
    /// Zone of the nearest waypoint.
    pub zone: String,
    pub nearest_stop: String,
    pub x: f64,
    pub y: f64,
    pub heading_deg: f64,
    pub route_progress: f64,
    pub battery_soc: f64,
    pub status: VehicleStatus,
    pub passenger_count: u32,
    pub capacity: u32,
    pub is_platooning: bool,
    pub drag_coefficient: f64,
    pub speed_mps: f64,
    pub action: Action,
    pub last_boarded: u32,
    pub last_alighted: u32,
    /// Battery ran flat; the vehicle stands still until recharged.
    pub stranded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationView {
    pub id: usize,
    pub name: String,
    pub zone: String,
    pub x: f64,
    pub y: f64,
    pub waiting_count: u32,
    pub total_served: u64,
    pub status: StationStatus,
    pub is_depot: bool,
}

/// Accumulators plus the ratios derived from them and the current grid state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsView {
    #[serde(flatten)]
    pub totals: FleetMetrics,
    pub platoon_rate: f64,
    pub empty_rate: f64,
    pub energy_saving_rate: f64,
    pub grid: GridState,
}

impl MetricsView {
    pub fn new(totals: FleetMetrics, grid: GridState) -> Self {
        Self {
            platoon_rate: totals.platoon_rate(),
            empty_rate: totals.empty_rate(),
            energy_saving_rate: totals.energy_saving_rate(),
            totals,
            grid,
        }
    }
}

/// One row of the periodic time series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySample {
    pub tick: u64,
    pub sim_time_s: f64,
    pub clock: String,
    pub solar_output: f64,
    pub net_load: f64,
    pub price: f64,
    pub grid_status: GridStatus,
    pub energy_actual_kwh: f64,
    pub energy_counterfactual_kwh: f64,
    pub total_served: u64,
    pub total_waiting: u32,
    pub vehicles_charging: usize,
    pub vehicles_platooning: usize,
}

/// Everything an observer sees at one instant.
///
/// An empty vehicle list means the engine has not completed a tick since the
/// last reset; consumers treat it as "not yet initialized".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetSnapshot {
    /// Incremented on every reset.
    pub generation: u64,
    pub tick: u64,
    pub sim_time_s: f64,
    pub clock: String,
    pub running: bool,
    pub mode: PolicyMode,
    pub vehicles: Vec<VehicleView>,
    pub stations: Vec<StationView>,
    pub metrics: MetricsView,
    /// Newest first.
    pub events: Vec<LogEvent>,
    /// Events the rate limiter dropped since the last reset.
    pub events_suppressed: u64,
    /// Oldest first.
    pub history: Vec<HistorySample>,
}

impl FleetSnapshot {
    /// Placeholder published before the first tick of a generation.
    pub fn pending(generation: u64, mode: PolicyMode, running: bool) -> Self {
        Self {
            generation,
            tick: 0,
            sim_time_s: 0.0,
            clock: String::new(),
            running,
            mode,
            vehicles: Vec::new(),
            stations: Vec::new(),
            metrics: MetricsView::new(FleetMetrics::default(), GridState::default()),
            events: Vec::new(),
            events_suppressed: 0,
            history: Vec::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        !self.vehicles.is_empty()
    }

    /// Total passengers waiting across all stations.
    pub fn total_waiting(&self) -> u32 {
        self.stations.iter().map(|s| s.waiting_count).sum()
    }

    pub fn vehicles_charging(&self) -> usize {
        self.vehicles
            .iter()
            .filter(|v| v.status == VehicleStatus::Charging)
            .count()
    }
}
