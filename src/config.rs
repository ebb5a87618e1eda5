//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::fleet::{DemandModel, PhysicsParams, Station};
use crate::grid::Microgrid;
use crate::grid::load::LoadProfile;
use crate::grid::solar::SolarProfile;
use crate::grid::tariff::Tariff;
use crate::grid::wind::WindProfile;
use crate::route::{Point, Route, Waypoint};
use crate::runtime::RuntimeConfig;
use crate::sim::policy::{PolicyMode, PolicyParams};
use crate::sim::types::{FleetConfig, FleetSetup, SimParams};

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the island service. Load from TOML with
/// [`ScenarioConfig::from_toml_file`] or start from a named preset with
/// [`ScenarioConfig::from_preset`]. Call [`ScenarioConfig::build`] to obtain
/// the immutable [`FleetConfig`] the engine runs on.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Simulated timing, sampling, seed and starting policy.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Wall-clock pacing of the live runtime.
    #[serde(default)]
    pub runtime: RuntimeSection,
    #[serde(default)]
    pub fleet: FleetSection,
    /// Vehicle power model and charger.
    #[serde(default)]
    pub physics: PhysicsSection,
    /// Adaptive policy thresholds.
    #[serde(default)]
    pub policy: PolicySection,
    /// Passenger arrivals and station behaviour.
    #[serde(default)]
    pub demand: DemandSection,
    /// Microgrid signal shape and tariff.
    #[serde(default)]
    pub grid: GridSection,
    #[serde(default)]
    pub events: EventsSection,
    /// Loop geometry and stops.
    #[serde(default)]
    pub route: RouteSection,
}

/// Simulated timing and global parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Simulated seconds per tick (must be > 0).
    pub tick_seconds: f64,
    /// Time of day at tick 0, in hours.
    pub start_hour: f64,
    /// Length of a batch run in simulated hours.
    pub duration_hours: f64,
    /// Ticks between history samples.
    pub history_every: u64,
    /// Ticks between congestion summaries.
    pub summary_every: u64,
    /// Master random seed.
    pub seed: u64,
    /// Starting policy: `"BASELINE"` or `"ADAPTIVE"`.
    pub mode: PolicyMode,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 2.0,
            start_hour: 6.0,
            duration_hours: 24.0,
            history_every: 300,
            summary_every: 900,
            seed: 42,
            mode: PolicyMode::Adaptive,
        }
    }
}

/// Wall-clock pacing of the live runtime.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeSection {
    /// Wall-clock milliseconds between stepper ticks.
    pub tick_interval_ms: u64,
    /// Wall-clock milliseconds between snapshot broadcasts.
    pub broadcast_interval_ms: u64,
    /// History samples retained in snapshots.
    pub history_capacity: usize,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            broadcast_interval_ms: 1000,
            history_capacity: 288,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FleetSection {
    /// Number of vehicles (must be > 0).
    pub size: usize,
    /// Seats per vehicle.
    pub capacity: u32,
    /// Lower bound of the initial SoC draw, percent.
    pub initial_soc_min: f64,
    /// Upper bound of the initial SoC draw, percent.
    pub initial_soc_max: f64,
}

impl Default for FleetSection {
    fn default() -> Self {
        Self {
            size: 6,
            capacity: 12,
            initial_soc_min: 45.0,
            initial_soc_max: 95.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhysicsSection {
    pub drag_solo: f64,
    pub drag_platoon: f64,
    /// Aerodynamic power per unit drag per (m/s)^3, watts.
    pub aero_coeff_w: f64,
    /// Auxiliary draw, kW.
    pub base_power_kw: f64,
    pub passenger_load_factor: f64,
    pub cruise_speed_mps: f64,
    pub platoon_speed_boost: f64,
    pub limp_soc: f64,
    pub limp_speed_mps: f64,
    pub accel_mps2: f64,
    pub charger_kw: f64,
    pub battery_kwh: f64,
    pub platoon_min_m: f64,
    pub platoon_max_m: f64,
    /// Local wind above which drag is penalized, m/s.
    pub strong_wind_mps: f64,
    pub wind_drag_penalty: f64,
}

impl Default for PhysicsSection {
    fn default() -> Self {
        let p = PhysicsParams::default();
        Self {
            drag_solo: p.drag_solo,
            drag_platoon: p.drag_platoon,
            aero_coeff_w: p.aero_coeff_w,
            base_power_kw: p.base_power_kw,
            passenger_load_factor: p.passenger_load_factor,
            cruise_speed_mps: p.cruise_speed_mps,
            platoon_speed_boost: p.platoon_speed_boost,
            limp_soc: p.limp_soc,
            limp_speed_mps: p.limp_speed_mps,
            accel_mps2: p.accel_mps2,
            charger_kw: p.charger_kw,
            battery_kwh: p.battery_kwh,
            platoon_min_m: p.platoon_min_m,
            platoon_max_m: p.platoon_max_m,
            strong_wind_mps: p.strong_wind_mps,
            wind_drag_penalty: p.wind_drag_penalty,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicySection {
    /// SoC below which adaptive vehicles always head for a depot.
    pub charge_threshold: f64,
    /// SoC at which a charging session ends.
    pub charge_target: f64,
    /// SoC below which vehicles top up under a GREEN tariff.
    pub green_topup_soc: f64,
    pub max_concurrent_charging: usize,
    /// Fleet-wide waiting count at which GREEN top-ups stop.
    pub busy_waiting: u32,
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            charge_threshold: 25.0,
            charge_target: 95.0,
            green_topup_soc: 40.0,
            max_concurrent_charging: 2,
            busy_waiting: 25,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemandSection {
    /// Arrival probability per tick at popularity 1.0 off-peak.
    pub base_probability: f64,
    /// `[start, end)` hour windows.
    pub rush_windows: Vec<[f64; 2]>,
    pub rush_multiplier: f64,
    pub queue_cap: u32,
    pub max_alight_fraction: f64,
    /// Queue length above which a station reports CROWDED.
    pub crowded_above: u32,
}

impl Default for DemandSection {
    fn default() -> Self {
        Self {
            base_probability: 0.02,
            rush_windows: vec![[7.0, 9.0], [17.0, 19.0]],
            rush_multiplier: 2.5,
            queue_cap: 40,
            max_alight_fraction: 0.4,
            crowded_above: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridSection {
    pub sunrise_h: f64,
    pub sunset_h: f64,
    pub solar_peak: f64,
    pub base_load: f64,
    pub load_amplitude: f64,
    /// Upward zero crossing of the diurnal sine.
    pub load_phase_h: f64,
    pub evening_peak_hour: f64,
    pub evening_peak_height: f64,
    pub evening_peak_width_h: f64,
    /// Fraction of solar output subtracted from demand.
    pub solar_offset: f64,
    pub net_load_floor: f64,
    pub green_below: f64,
    pub peak_above: f64,
    pub green_price: f64,
    pub normal_price: f64,
    pub peak_price: f64,
    pub wind_mean_mps: f64,
    pub wind_gust_mps: f64,
    pub wind_cycles_per_day: u32,
}

impl Default for GridSection {
    fn default() -> Self {
        Self {
            sunrise_h: 6.0,
            sunset_h: 18.0,
            solar_peak: 100.0,
            base_load: 50.0,
            load_amplitude: 15.0,
            load_phase_h: 8.0,
            evening_peak_hour: 19.0,
            evening_peak_height: 35.0,
            evening_peak_width_h: 1.5,
            solar_offset: 0.5,
            net_load_floor: 20.0,
            green_below: 40.0,
            peak_above: 70.0,
            green_price: 0.08,
            normal_price: 0.15,
            peak_price: 0.32,
            wind_mean_mps: 5.0,
            wind_gust_mps: 5.0,
            wind_cycles_per_day: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EventsSection {
    /// Entries kept in the ring.
    pub capacity: usize,
    /// Token bucket size.
    pub burst: f64,
    /// Tokens regained per tick.
    pub refill_per_tick: f64,
}

impl Default for EventsSection {
    fn default() -> Self {
        Self {
            capacity: 50,
            burst: 5.0,
            refill_per_tick: 0.01,
        }
    }
}

/// One stop on the loop, in travel order.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StopConfig {
    pub name: String,
    pub zone: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default = "default_terrain")]
    pub terrain_factor: f64,
    /// Extra wind on the segment leaving this stop, m/s.
    #[serde(default)]
    pub wind_exposure_mps: f64,
    #[serde(default)]
    pub depot: bool,
}

fn default_terrain() -> f64 {
    1.0
}

impl StopConfig {
    fn new(name: &str, zone: &str, x: f64, y: f64, popularity: f64, terrain: f64, depot: bool) -> Self {
        Self {
            name: name.to_string(),
            zone: zone.to_string(),
            x,
            y,
            popularity,
            terrain_factor: terrain,
            wind_exposure_mps: 0.0,
            depot,
        }
    }

    fn exposed(mut self, wind_mps: f64) -> Self {
        self.wind_exposure_mps = wind_mps;
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouteSection {
    /// Meters per map unit.
    pub meters_per_unit: f64,
    pub stops: Vec<StopConfig>,
}

impl Default for RouteSection {
    fn default() -> Self {
        Self {
            meters_per_unit: 5.0,
            stops: island_loop(),
        }
    }
}

/// The eight-stop Kinmen shuttle loop.
fn island_loop() -> Vec<StopConfig> {
    vec![
        StopConfig::new("Cultural Park (Depot)", "Jinhu", 950.0, 200.0, 0.0, 1.0, true),
        StopConfig::new("Shanhou Folk Village", "Jinsha", 1150.0, 150.0, 0.8, 1.0, false),
        StopConfig::new("Shishan Howitzer Fort", "Jinsha", 1250.0, 300.0, 0.9, 1.0, false),
        StopConfig::new("Mt. Taiwu", "Jinhu", 800.0, 400.0, 0.6, 1.35, false).exposed(10.0),
        StopConfig::new("Chen Jinglan Mansion", "Jinhu", 650.0, 600.0, 0.7, 1.0, false).exposed(10.0),
        StopConfig::new("Zhaishan Tunnel", "Jincheng", 250.0, 700.0, 1.0, 1.2, false),
        StopConfig::new("Juguang Tower (Depot)", "Jincheng", 200.0, 450.0, 0.0, 1.0, true),
        StopConfig::new("Guningtou", "Jinning", 200.0, 200.0, 0.5, 1.0, false),
    ]
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.tick_seconds"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Six vehicles under the adaptive policy.
    pub fn island() -> Self {
        Self::default()
    }

    /// The same fleet driven by the baseline policy.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig {
                mode: PolicyMode::Baseline,
                ..SimulationConfig::default()
            },
            ..Self::default()
        }
    }

    /// Ten vehicles: tighter headways and more platooning opportunity.
    pub fn dense() -> Self {
        Self {
            fleet: FleetSection {
                size: 10,
                ..FleetSection::default()
            },
            ..Self::default()
        }
    }

    /// Fleet starts between 20% and 40% SoC.
    pub fn low_battery() -> Self {
        Self {
            fleet: FleetSection {
                initial_soc_min: 20.0,
                initial_soc_max: 40.0,
                ..FleetSection::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["default", "baseline", "dense", "low_battery"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` listing the available presets if the name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "default" => Ok(Self::island()),
            "baseline" => Ok(Self::baseline()),
            "dense" => Ok(Self::dense()),
            "low_battery" => Ok(Self::low_battery()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid. Never panics.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut check = |ok: bool, field: &str, message: &str| {
            if !ok {
                errors.push(ConfigError::new(field, message));
            }
        };

        let s = &self.simulation;
        check(s.tick_seconds > 0.0, "simulation.tick_seconds", "must be > 0");
        check(
            (0.0..24.0).contains(&s.start_hour),
            "simulation.start_hour",
            "must be in [0, 24)",
        );
        check(s.duration_hours > 0.0, "simulation.duration_hours", "must be > 0");
        check(s.history_every > 0, "simulation.history_every", "must be > 0");
        check(s.summary_every > 0, "simulation.summary_every", "must be > 0");

        let r = &self.runtime;
        check(r.tick_interval_ms > 0, "runtime.tick_interval_ms", "must be > 0");
        check(
            r.broadcast_interval_ms > 0,
            "runtime.broadcast_interval_ms",
            "must be > 0",
        );

        let f = &self.fleet;
        check(f.size > 0, "fleet.size", "must be > 0");
        check(f.capacity > 0, "fleet.capacity", "must be > 0");
        check(
            (0.0..=100.0).contains(&f.initial_soc_min),
            "fleet.initial_soc_min",
            "must be in [0, 100]",
        );
        check(
            (0.0..=100.0).contains(&f.initial_soc_max),
            "fleet.initial_soc_max",
            "must be in [0, 100]",
        );
        check(
            f.initial_soc_min <= f.initial_soc_max,
            "fleet.initial_soc_min",
            "must be <= fleet.initial_soc_max",
        );

        let p = &self.physics;
        check(p.drag_platoon > 0.0, "physics.drag_platoon", "must be > 0");
        check(
            p.drag_platoon <= p.drag_solo,
            "physics.drag_platoon",
            "must be <= physics.drag_solo",
        );
        check(p.aero_coeff_w >= 0.0, "physics.aero_coeff_w", "must be >= 0");
        check(p.base_power_kw >= 0.0, "physics.base_power_kw", "must be >= 0");
        check(
            p.passenger_load_factor >= 0.0,
            "physics.passenger_load_factor",
            "must be >= 0",
        );
        check(p.cruise_speed_mps > 0.0, "physics.cruise_speed_mps", "must be > 0");
        check(
            p.platoon_speed_boost > 0.0,
            "physics.platoon_speed_boost",
            "must be > 0",
        );
        check(p.limp_speed_mps > 0.0, "physics.limp_speed_mps", "must be > 0");
        check(p.accel_mps2 > 0.0, "physics.accel_mps2", "must be > 0");
        check(p.charger_kw > 0.0, "physics.charger_kw", "must be > 0");
        check(p.battery_kwh > 0.0, "physics.battery_kwh", "must be > 0");
        check(p.platoon_min_m >= 0.0, "physics.platoon_min_m", "must be >= 0");
        check(
            p.platoon_min_m < p.platoon_max_m,
            "physics.platoon_min_m",
            "must be < physics.platoon_max_m",
        );
        check(p.strong_wind_mps >= 0.0, "physics.strong_wind_mps", "must be >= 0");
        check(
            p.wind_drag_penalty >= 0.0,
            "physics.wind_drag_penalty",
            "must be >= 0",
        );

        let pol = &self.policy;
        check(
            (0.0..=100.0).contains(&pol.charge_threshold),
            "policy.charge_threshold",
            "must be in [0, 100]",
        );
        check(
            (0.0..=100.0).contains(&pol.charge_target),
            "policy.charge_target",
            "must be in [0, 100]",
        );
        check(
            pol.charge_threshold < pol.charge_target,
            "policy.charge_threshold",
            "must be < policy.charge_target",
        );
        check(
            (0.0..=100.0).contains(&pol.green_topup_soc),
            "policy.green_topup_soc",
            "must be in [0, 100]",
        );

        let d = &self.demand;
        check(
            (0.0..=1.0).contains(&d.base_probability),
            "demand.base_probability",
            "must be in [0, 1]",
        );
        check(d.rush_multiplier >= 0.0, "demand.rush_multiplier", "must be >= 0");
        check(
            d.rush_windows
                .iter()
                .all(|w| w[0] >= 0.0 && w[0] < w[1] && w[1] <= 24.0),
            "demand.rush_windows",
            "each window must satisfy 0 <= start < end <= 24",
        );
        check(
            (0.0..=1.0).contains(&d.max_alight_fraction),
            "demand.max_alight_fraction",
            "must be in [0, 1]",
        );

        let g = &self.grid;
        check(
            g.sunrise_h >= 0.0 && g.sunrise_h < g.sunset_h && g.sunset_h <= 24.0,
            "grid.sunrise_h",
            "must satisfy 0 <= sunrise_h < sunset_h <= 24",
        );
        check(
            (0.0..=100.0).contains(&g.solar_peak),
            "grid.solar_peak",
            "must be in [0, 100]",
        );
        check(
            g.evening_peak_width_h > 0.0,
            "grid.evening_peak_width_h",
            "must be > 0",
        );
        check(g.solar_offset >= 0.0, "grid.solar_offset", "must be >= 0");
        check(
            g.green_below <= g.peak_above,
            "grid.green_below",
            "must be <= grid.peak_above",
        );
        check(
            g.green_price >= 0.0 && g.normal_price >= 0.0 && g.peak_price >= 0.0,
            "grid.green_price",
            "prices must be >= 0",
        );
        check(g.wind_mean_mps >= 0.0, "grid.wind_mean_mps", "must be >= 0");
        check(g.wind_gust_mps >= 0.0, "grid.wind_gust_mps", "must be >= 0");

        let e = &self.events;
        check(e.capacity > 0, "events.capacity", "must be > 0");
        check(e.burst >= 1.0, "events.burst", "must be >= 1");
        check(e.refill_per_tick >= 0.0, "events.refill_per_tick", "must be >= 0");

        let rt = &self.route;
        check(rt.meters_per_unit > 0.0, "route.meters_per_unit", "must be > 0");
        check(rt.stops.len() >= 2, "route.stops", "needs at least two stops");
        check(
            rt.stops.iter().any(|s| s.depot),
            "route.stops",
            "needs at least one depot",
        );
        for (i, stop) in rt.stops.iter().enumerate() {
            check(
                (0.0..=1.0).contains(&stop.popularity),
                &format!("route.stops[{i}].popularity"),
                "must be in [0, 1]",
            );
            check(
                stop.terrain_factor > 0.0,
                &format!("route.stops[{i}].terrain_factor"),
                "must be > 0",
            );
            check(
                stop.wind_exposure_mps >= 0.0,
                &format!("route.stops[{i}].wind_exposure_mps"),
                "must be >= 0",
            );
            let next = &rt.stops[(i + 1) % rt.stops.len()];
            check(
                rt.stops.len() < 2 || (stop.x, stop.y) != (next.x, next.y),
                &format!("route.stops[{i}]"),
                "must not coincide with the next stop",
            );
        }

        errors
    }

    /// Validates and assembles the immutable engine configuration.
    ///
    /// # Errors
    ///
    /// Returns every validation error if the scenario is invalid.
    pub fn build(&self) -> Result<FleetConfig, Vec<ConfigError>> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }

        let waypoints = self
            .route
            .stops
            .iter()
            .enumerate()
            .map(|(id, s)| Waypoint {
                id,
                name: s.name.clone(),
                zone: s.zone.clone(),
                position: Point::new(s.x, s.y),
                terrain_factor: s.terrain_factor,
                wind_exposure_mps: s.wind_exposure_mps,
            })
            .collect();
        let route = Route::new(waypoints, self.route.meters_per_unit);

        let stations = self
            .route
            .stops
            .iter()
            .enumerate()
            .map(|(id, s)| {
                let weight = if s.depot { 0.0 } else { s.popularity };
                Station::new(id, s.name.clone(), s.zone.clone(), Point::new(s.x, s.y), weight, s.depot)
            })
            .collect();

        let s = &self.simulation;
        let sim = SimParams {
            tick_seconds: s.tick_seconds,
            start_hour: s.start_hour,
            history_every: s.history_every,
            summary_every: s.summary_every,
            history_capacity: self.runtime.history_capacity,
            crowded_above: self.demand.crowded_above,
            max_alight_fraction: self.demand.max_alight_fraction,
            event_capacity: self.events.capacity,
            event_burst: self.events.burst,
            event_refill_per_tick: self.events.refill_per_tick,
        };

        let fleet = FleetSetup {
            size: self.fleet.size,
            capacity: self.fleet.capacity,
            initial_soc_min: self.fleet.initial_soc_min,
            initial_soc_max: self.fleet.initial_soc_max,
        };

        let p = &self.physics;
        let physics = PhysicsParams {
            drag_solo: p.drag_solo,
            drag_platoon: p.drag_platoon,
            aero_coeff_w: p.aero_coeff_w,
            base_power_kw: p.base_power_kw,
            passenger_load_factor: p.passenger_load_factor,
            cruise_speed_mps: p.cruise_speed_mps,
            platoon_speed_boost: p.platoon_speed_boost,
            limp_soc: p.limp_soc,
            limp_speed_mps: p.limp_speed_mps,
            accel_mps2: p.accel_mps2,
            charger_kw: p.charger_kw,
            battery_kwh: p.battery_kwh,
            charge_target_soc: self.policy.charge_target,
            platoon_min_m: p.platoon_min_m,
            platoon_max_m: p.platoon_max_m,
            strong_wind_mps: p.strong_wind_mps,
            wind_drag_penalty: p.wind_drag_penalty,
        };

        let policy = PolicyParams {
            charge_threshold: self.policy.charge_threshold,
            charge_target: self.policy.charge_target,
            green_topup_soc: self.policy.green_topup_soc,
            max_concurrent_charging: self.policy.max_concurrent_charging,
            busy_waiting: self.policy.busy_waiting,
        };

        let d = &self.demand;
        let demand = DemandModel {
            base_probability: d.base_probability,
            rush_windows: d.rush_windows.iter().map(|w| (w[0], w[1])).collect(),
            rush_multiplier: d.rush_multiplier,
            queue_cap: d.queue_cap,
        };

        let g = &self.grid;
        let grid = Microgrid::new(
            SolarProfile::new(g.solar_peak, g.sunrise_h, g.sunset_h),
            LoadProfile::new(
                g.base_load,
                g.load_amplitude,
                g.load_phase_h,
                g.evening_peak_hour,
                g.evening_peak_height,
                g.evening_peak_width_h,
            ),
            Tariff::new(
                g.green_below,
                g.peak_above,
                g.green_price,
                g.normal_price,
                g.peak_price,
            ),
            WindProfile::new(g.wind_mean_mps, g.wind_gust_mps, g.wind_cycles_per_day),
            g.solar_offset,
            g.net_load_floor,
        );

        Ok(FleetConfig::new(
            sim, fleet, route, stations, physics, policy, demand, grid, s.mode, s.seed,
        ))
    }

    /// Wall-clock pacing for the live runtime.
    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            tick_interval: Duration::from_millis(self.runtime.tick_interval_ms.max(1)),
            broadcast_interval: Duration::from_millis(self.runtime.broadcast_interval_ms.max(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_preset_valid() {
        let cfg = ScenarioConfig::island();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "default should be valid: {errors:?}");
    }

    #[test]
    fn all_presets_build() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let built = cfg.as_ref().map(|c| c.build().is_ok()).unwrap_or(false);
            assert!(built, "preset \"{name}\" should build");
        }
    }

    #[test]
    fn from_preset_unknown_lists_available() {
        let err = ScenarioConfig::from_preset("nonexistent").unwrap_err();
        assert!(err.message.contains("unknown preset"));
        assert!(err.message.contains("low_battery"));
        assert_eq!(err.field, "preset");
    }

    #[test]
    fn island_loop_layout() {
        let built = ScenarioConfig::island().build().unwrap();
        assert_eq!(built.route.len(), 8);
        let depots: Vec<usize> = built
            .stations
            .iter()
            .filter(|s| s.is_depot)
            .map(|s| s.id)
            .collect();
        assert_eq!(depots, vec![0, 6]);
        assert_eq!(built.route.waypoint(3).terrain_factor, 1.35);
        assert_eq!(built.route.waypoint(5).terrain_factor, 1.2);
        assert_eq!(built.route.waypoint(1).zone, "Jinsha");
        let exposed: Vec<usize> = (0..8)
            .filter(|&i| built.route.waypoint(i).wind_exposure_mps > 0.0)
            .collect();
        assert_eq!(exposed, vec![3, 4]);
        assert_eq!(built.route.waypoint(3).wind_exposure_mps, 10.0);
        assert_eq!(built.policy.busy_waiting, 25);
        assert_eq!(built.fleet.size, 6);
        assert_eq!(built.mode, PolicyMode::Adaptive);
    }

    #[test]
    fn presets_differ_where_expected() {
        assert_eq!(ScenarioConfig::baseline().simulation.mode, PolicyMode::Baseline);
        assert_eq!(ScenarioConfig::dense().fleet.size, 10);
        assert!(ScenarioConfig::low_battery().fleet.initial_soc_max <= 40.0);
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[simulation]
tick_seconds = 1.0
start_hour = 7.5
seed = 99
mode = "BASELINE"

[fleet]
size = 4
capacity = 20

[physics]
drag_solo = 0.9
drag_platoon = 0.5

[demand]
rush_windows = [[6.0, 8.0]]

[[route.stops]]
name = "Depot"
zone = "North"
x = 0.0
y = 0.0
depot = true

[[route.stops]]
name = "Market"
zone = "South"
x = 100.0
y = 0.0
popularity = 0.9
terrain_factor = 1.1
"#;
        let cfg = ScenarioConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.unwrap();
        assert_eq!(cfg.simulation.mode, PolicyMode::Baseline);
        assert_eq!(cfg.fleet.size, 4);
        assert_eq!(cfg.route.stops.len(), 2);
        assert_eq!(cfg.route.stops[0].terrain_factor, 1.0);
        let built = cfg.build().unwrap();
        assert_eq!(built.demand.rush_windows, vec![(6.0, 8.0)]);
        assert_eq!(built.route.len(), 2);
    }

    #[test]
    fn lower_case_mode_accepted() {
        let cfg = ScenarioConfig::from_toml_str("[simulation]\nmode = \"baseline\"\n").unwrap();
        assert_eq!(cfg.simulation.mode, PolicyMode::Baseline);
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[simulation]
tick_seconds = 2.0
bogus_field = true
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let cfg = ScenarioConfig::from_toml_str("[simulation]\nseed = 7\n").unwrap();
        assert_eq!(cfg.simulation.seed, 7);
        assert_eq!(cfg.simulation.tick_seconds, 2.0);
        assert_eq!(cfg.route.stops.len(), 8);
        assert_eq!(cfg.runtime.broadcast_interval_ms, 1000);
    }

    #[test]
    fn validation_collects_multiple_errors() {
        let mut cfg = ScenarioConfig::island();
        cfg.simulation.tick_seconds = 0.0;
        cfg.fleet.size = 0;
        cfg.policy.charge_threshold = 99.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "simulation.tick_seconds"));
        assert!(errors.iter().any(|e| e.field == "fleet.size"));
        assert!(errors.iter().any(|e| e.field == "policy.charge_threshold"));
        assert!(cfg.build().is_err());
    }

    #[test]
    fn validation_catches_bad_platoon_window() {
        let mut cfg = ScenarioConfig::island();
        cfg.physics.platoon_min_m = 80.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "physics.platoon_min_m"));
    }

    #[test]
    fn wind_settings_parse_and_validate() {
        let toml = r#"
[grid]
wind_mean_mps = 3.0
wind_gust_mps = 2.0
wind_cycles_per_day = 4

[policy]
busy_waiting = 10

[physics]
strong_wind_mps = 8.0
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).unwrap();
        let built = cfg.build().unwrap();
        assert_eq!(built.grid.wind.mean_mps, 3.0);
        assert_eq!(built.grid.wind.cycles_per_day, 4);
        assert_eq!(built.policy.busy_waiting, 10);
        assert_eq!(built.physics.strong_wind_mps, 8.0);
        assert_eq!(built.physics.wind_drag_penalty, 0.1);

        let mut bad = cfg;
        bad.grid.wind_gust_mps = -1.0;
        bad.route.stops[2].wind_exposure_mps = -4.0;
        let errors = bad.validate();
        assert!(errors.iter().any(|e| e.field == "grid.wind_gust_mps"));
        assert!(errors.iter().any(|e| e.field == "route.stops[2].wind_exposure_mps"));
    }

    #[test]
    fn validation_catches_route_without_depot() {
        let mut cfg = ScenarioConfig::island();
        for stop in &mut cfg.route.stops {
            stop.depot = false;
        }
        assert!(cfg.validate().iter().any(|e| e.field == "route.stops"));
    }

    #[test]
    fn validation_catches_coincident_stops() {
        let mut cfg = ScenarioConfig::island();
        cfg.route.stops[1].x = cfg.route.stops[0].x;
        cfg.route.stops[1].y = cfg.route.stops[0].y;
        assert!(cfg.validate().iter().any(|e| e.field == "route.stops[0]"));
    }

    #[test]
    fn error_display_names_field() {
        let e = ConfigError::new("fleet.size", "must be > 0");
        assert_eq!(e.to_string(), "config error: fleet.size: must be > 0");
    }

    #[test]
    fn runtime_config_uses_milliseconds() {
        let rc = ScenarioConfig::island().runtime_config();
        assert_eq!(rc.tick_interval, Duration::from_millis(100));
        assert_eq!(rc.broadcast_interval, Duration::from_secs(1));
    }
}
