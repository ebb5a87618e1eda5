//! Fixed-tick simulation engine.

use std::collections::VecDeque;
use std::sync::Arc;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::fleet::physics::{self, MotionOutcome};
use crate::fleet::{Station, Vehicle};
use crate::grid::types::GridState;

use super::clock::SimClock;
use super::event::{EventCategory, EventLog, Gate, LogEvent, TokenBucket};
use super::metrics::{FleetMetrics, TickDelta};
use super::policy::{self, Action, FleetSummary, PolicyMode};
use super::snapshot::{FleetSnapshot, HistorySample, MetricsView, StationView, VehicleView};
use super::types::{FleetConfig, TickSummary};

/// The simulation state and the only code that mutates it.
///
/// Each call to [`Simulation::step`] applies one whole tick. Observers get
/// consistent copies through [`Simulation::snapshot`].
pub struct Simulation {
    config: Arc<FleetConfig>,
    mode: PolicyMode,
    seed: u64,
    generation: u64,
    rng: StdRng,
    clock: SimClock,
    grid: GridState,
    vehicles: Vec<Vehicle>,
    stations: Vec<Station>,
    actions: Vec<Action>,
    metrics: FleetMetrics,
    events: EventLog,
    history: VecDeque<HistorySample>,
}

impl Simulation {
    /// Creates a simulation with the configured mode and seed.
    pub fn new(config: Arc<FleetConfig>) -> Self {
        let mode = config.mode;
        let seed = config.seed;
        Self::with_seed(config, mode, seed)
    }

    /// Creates a simulation with an explicit policy mode and RNG seed.
    ///
    /// Vehicles are spread evenly around the loop with SoC drawn uniformly from
    /// the configured range.
    pub fn with_seed(config: Arc<FleetConfig>, mode: PolicyMode, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let setup = &config.fleet;
        let n = config.route.len() as f64;
        let lo = setup.initial_soc_min.min(setup.initial_soc_max);
        let hi = setup.initial_soc_max.max(setup.initial_soc_min);

        let vehicles = (0..setup.size)
            .map(|i| {
                let progress = config.route.wrap(i as f64 * n / setup.size as f64);
                let soc = rng.random_range(lo..=hi).clamp(0.0, 100.0);
                Vehicle::new(i, progress, soc, setup.capacity, config.physics.drag_solo)
            })
            .collect::<Vec<_>>();

        let sim = &config.sim;
        let clock = SimClock::new(sim.tick_seconds, sim.start_hour);
        let grid = config.grid.state_at(clock.time_of_day_h());
        let events = EventLog::new(
            sim.event_capacity,
            TokenBucket::new(sim.event_burst, sim.event_refill_per_tick),
        );

        let mut s = Self {
            mode,
            seed,
            generation: 0,
            rng,
            clock,
            grid,
            actions: vec![Action::default(); vehicles.len()],
            vehicles,
            stations: config.stations.clone(),
            metrics: FleetMetrics::default(),
            events,
            history: VecDeque::with_capacity(sim.history_capacity),
            config,
        };
        s.log(
            EventCategory::System,
            format!(
                "Fleet of {} vehicles deployed in {} mode",
                s.vehicles.len(),
                s.mode
            ),
            Gate::Always,
        );
        s
    }

    /// Builds a fresh simulation for the next reset generation.
    ///
    /// The RNG is reseeded with `seed + generation` so every generation draws
    /// new demand yet stays reproducible.
    pub fn next_generation(&self) -> Self {
        let generation = self.generation + 1;
        let mut next = Self::with_seed(
            Arc::clone(&self.config),
            self.mode,
            self.seed.wrapping_add(generation),
        );
        next.seed = self.seed;
        next.generation = generation;
        next
    }

    /// Switches policy from the next tick on.
    pub fn set_mode(&mut self, mode: PolicyMode) {
        if mode == self.mode {
            return;
        }
        self.mode = mode;
        self.log(
            EventCategory::System,
            format!("Dispatch policy switched to {mode}"),
            Gate::Always,
        );
    }

    /// Advances the simulation by exactly one tick.
    ///
    /// Order: clock, microgrid, demand, policy, platoon detection, then per
    /// vehicle physics and boarding, then metrics and periodic sampling.
    pub fn step(&mut self) -> TickSummary {
        let cfg = Arc::clone(&self.config);
        let dt = self.clock.tick_seconds();
        let tick = self.clock.advance();
        let hour = self.clock.time_of_day_h();

        self.grid = cfg.grid.state_at(hour);
        let arrivals = cfg.demand.generate(&mut self.stations, hour, &mut self.rng);

        let summary = FleetSummary::from_parts(
            &self.vehicles,
            self.total_waiting(),
            cfg.policy.green_topup_soc,
        );
        self.actions = self
            .vehicles
            .iter()
            .map(|v| policy::decide(v, &summary, &self.grid, self.mode, &cfg.policy))
            .collect();

        self.update_platoons(tick);

        let mut delta = TickDelta::default();
        let mut charging_now = summary.vehicles_charging;
        for i in 0..self.vehicles.len() {
            self.step_vehicle(i, dt, &mut charging_now, &mut delta);
        }

        let total_waiting = self.total_waiting();
        delta.wait_time_s = f64::from(total_waiting) * dt;
        self.metrics.fold(&delta);

        let vehicles_charging = self.vehicles.iter().filter(|v| v.is_charging()).count();
        let vehicles_platooning = self.vehicles.iter().filter(|v| v.is_platooning).count();

        if tick % cfg.sim.history_every.max(1) == 0 {
            self.push_history(total_waiting, vehicles_charging, vehicles_platooning);
        }
        if tick % cfg.sim.summary_every.max(1) == 0 {
            self.congestion_summary(total_waiting);
        }

        tracing::trace!(
            tick,
            waiting = total_waiting,
            charging = vehicles_charging,
            platooning = vehicles_platooning,
            "tick applied"
        );

        TickSummary {
            tick,
            sim_time_s: self.clock.elapsed_s(),
            grid: self.grid,
            delta,
            arrivals,
            total_waiting,
            vehicles_charging,
            vehicles_platooning,
        }
    }

    /// Runs `ticks` ticks back to back.
    pub fn run(&mut self, ticks: u64) -> &FleetMetrics {
        for _ in 0..ticks {
            self.step();
        }
        &self.metrics
    }

    /// Runs for `hours` of simulated time.
    pub fn run_hours(&mut self, hours: f64) -> &FleetMetrics {
        let ticks = self.clock.ticks_for_hours(hours);
        self.run(ticks)
    }

    fn update_platoons(&mut self, tick: u64) {
        let eligible: Vec<bool> = self.actions.iter().map(|a| a.allows_platooning()).collect();
        let flags = physics::detect_platoons(
            &self.config.route,
            &self.vehicles,
            &eligible,
            &self.config.physics,
        );

        let mut engaged = Vec::new();
        for (v, now) in self.vehicles.iter_mut().zip(flags) {
            if now && !v.is_platooning {
                engaged.push(v.id);
            }
            v.is_platooning = now;
        }
        for id in engaged {
            let zone = self.config.route.zone_at(self.vehicles[id].route_progress).to_string();
            self.log_at(
                tick,
                EventCategory::Policy,
                format!("Vehicle {id} engaged platoon near {zone}"),
                Gate::Limited,
            );
        }
    }

    fn step_vehicle(&mut self, i: usize, dt: f64, charging_now: &mut usize, delta: &mut TickDelta) {
        let cfg = Arc::clone(&self.config);
        let threshold = cfg.policy.charge_threshold;
        let action = self.actions[i];
        let soc_before = self.vehicles[i].battery_soc;
        let was_empty = self.vehicles[i].is_empty();
        let was_platooning = self.vehicles[i].is_platooning;

        // Top-ups above the threshold only start while a charger slot is free.
        let may_charge = action.wants_charge()
            && (soc_before < threshold || *charging_now < cfg.policy.max_concurrent_charging);

        let docked_at = self.vehicles[i]
            .at_waypoint(&cfg.route)
            .filter(|&wp| self.vehicles[i].is_moving() && may_charge && self.stations[wp].is_depot);

        let out = if let Some(wp) = docked_at {
            self.call_at_station(i, wp, true, charging_now, delta);
            MotionOutcome::default()
        } else {
            let stations = &self.stations;
            let out = physics::integrate(
                &mut self.vehicles[i],
                &cfg.route,
                &cfg.physics,
                dt,
                self.grid.wind_mps,
                |wp| may_charge && stations[wp].is_depot,
            );
            let last = out.arrivals.len();
            for (k, &wp) in out.arrivals.iter().enumerate() {
                let charge_here = out.halted && k + 1 == last;
                self.call_at_station(i, wp, charge_here, charging_now, delta);
            }
            out
        };

        delta.energy_actual_kwh += out.energy_actual_kwh;
        delta.energy_counterfactual_kwh += out.energy_counterfactual_kwh;
        delta.distance_m += out.traveled_m;
        if was_platooning {
            delta.platoon_distance_m += out.traveled_m;
        }
        if was_empty {
            delta.empty_distance_m += out.traveled_m;
        }
        delta.energy_charged_kwh += out.energy_charged_kwh;
        delta.charging_cost += out.energy_charged_kwh * self.grid.price;

        let v = &self.vehicles[i];
        let (id, soc) = (v.id, v.battery_soc);
        if out.charge_completed {
            *charging_now = charging_now.saturating_sub(1);
            self.log(
                EventCategory::Policy,
                format!("Vehicle {id} charge complete ({soc:.0}%), resuming service"),
                Gate::Limited,
            );
        }
        if soc_before >= threshold && soc < threshold {
            self.log(
                EventCategory::Warning,
                format!("Vehicle {id} battery low ({soc:.1}%)"),
                Gate::Limited,
            );
        }
        if out.depleted {
            let zone = cfg.route.zone_at(self.vehicles[i].route_progress).to_string();
            self.log(
                EventCategory::Warning,
                format!("Vehicle {id} battery depleted, stranded in {zone}"),
                Gate::Always,
            );
        }
    }

    fn call_at_station(
        &mut self,
        i: usize,
        wp: usize,
        wants_charge: bool,
        charging_now: &mut usize,
        delta: &mut TickDelta,
    ) {
        let max_alight = self.config.sim.max_alight_fraction;
        let ex = self.stations[wp].exchange(
            &mut self.vehicles[i],
            wants_charge,
            max_alight,
            &mut self.rng,
        );
        delta.served += u64::from(ex.boarded);

        if ex.started_charging {
            *charging_now += 1;
            self.vehicles[i].drag_coefficient = self.config.physics.drag_solo;
            let v = &self.vehicles[i];
            let msg = format!(
                "Vehicle {} docked at {} to charge ({:.0}%, {} off)",
                v.id, self.stations[wp].name, v.battery_soc, ex.alighted
            );
            self.log(EventCategory::Policy, msg, Gate::Limited);
        }
    }

    fn push_history(&mut self, total_waiting: u32, charging: usize, platooning: usize) {
        let capacity = self.config.sim.history_capacity;
        if capacity == 0 {
            return;
        }
        while self.history.len() >= capacity {
            self.history.pop_front();
        }
        self.history.push_back(HistorySample {
            tick: self.clock.tick(),
            sim_time_s: self.clock.elapsed_s(),
            clock: self.clock.label(),
            solar_output: self.grid.solar_output,
            net_load: self.grid.net_load,
            price: self.grid.price,
            grid_status: self.grid.status,
            energy_actual_kwh: self.metrics.total_energy_actual,
            energy_counterfactual_kwh: self.metrics.total_energy_counterfactual,
            total_served: self.metrics.total_served,
            total_waiting,
            vehicles_charging: charging,
            vehicles_platooning: platooning,
        });
    }

    fn congestion_summary(&mut self, total_waiting: u32) {
        let crowded_above = self.config.sim.crowded_above;
        let crowded = self
            .stations
            .iter()
            .filter(|s| s.queue_length > crowded_above)
            .count();
        let busiest = self
            .stations
            .iter()
            .filter(|s| !s.is_depot)
            .max_by_key(|s| s.queue_length)
            .map(|s| format!("{} ({})", s.name, s.queue_length))
            .unwrap_or_else(|| "none".to_string());
        let (category, msg) = if crowded > 0 {
            (
                EventCategory::Warning,
                format!("{crowded} crowded stations, {total_waiting} waiting, busiest {busiest}"),
            )
        } else {
            (
                EventCategory::System,
                format!("Network clear, {total_waiting} waiting, busiest {busiest}"),
            )
        };
        self.log(category, msg, Gate::Always);
    }

    fn log(&mut self, category: EventCategory, message: String, gate: Gate) -> bool {
        let tick = self.clock.tick();
        self.log_at(tick, category, message, gate)
    }

    fn log_at(&mut self, tick: u64, category: EventCategory, message: String, gate: Gate) -> bool {
        let label = self.clock.label();
        self.events
            .record(tick, self.clock.elapsed_s(), &label, category, message, gate)
    }

    pub fn total_waiting(&self) -> u32 {
        self.stations.iter().map(|s| s.queue_length).sum()
    }

    /// Builds a consistent view of the current committed tick.
    pub fn snapshot(&self, running: bool) -> FleetSnapshot {
        let route = &self.config.route;
        let crowded_above = self.config.sim.crowded_above;

        let vehicles = self
            .vehicles
            .iter()
            .zip(&self.actions)
            .map(|(v, &action)| {
                let pose = v.pose(route);
                let nearest = route.waypoint(route.nearest_waypoint(&pose.point()));
                VehicleView {
                    id: v.id,
                    zone: nearest.zone.clone(),
                    nearest_stop: nearest.name.clone(),
                    x: pose.x,
                    y: pose.y,
                    heading_deg: pose.heading_deg,
                    route_progress: v.route_progress,
                    battery_soc: v.battery_soc,
                    status: v.status,
                    passenger_count: v.passenger_count,
                    capacity: v.capacity,
                    is_platooning: v.is_platooning,
                    drag_coefficient: v.drag_coefficient,
                    speed_mps: v.speed_mps,
                    action,
                    last_boarded: v.last_boarded,
                    last_alighted: v.last_alighted,
                    stranded: v.stranded,
                }
            })
            .collect();

        let stations = self
            .stations
            .iter()
            .map(|s| StationView {
                id: s.id,
                name: s.name.clone(),
                zone: s.zone.clone(),
                x: s.position.x,
                y: s.position.y,
                waiting_count: s.queue_length,
                total_served: s.total_served,
                status: s.status(crowded_above),
                is_depot: s.is_depot,
            })
            .collect();

        FleetSnapshot {
            generation: self.generation,
            tick: self.clock.tick(),
            sim_time_s: self.clock.elapsed_s(),
            clock: self.clock.label(),
            running,
            mode: self.mode,
            vehicles,
            stations,
            metrics: MetricsView::new(self.metrics, self.grid),
            events: self.events.iter().cloned().collect(),
            events_suppressed: self.events.suppressed(),
            history: self.history.iter().cloned().collect(),
        }
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    pub fn mode(&self) -> PolicyMode {
        self.mode
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn tick(&self) -> u64 {
        self.clock.tick()
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn grid(&self) -> &GridState {
        &self.grid
    }

    pub fn metrics(&self) -> &FleetMetrics {
        &self.metrics
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    /// Mutable access for scenario set-up between ticks.
    pub fn vehicles_mut(&mut self) -> &mut [Vehicle] {
        &mut self.vehicles
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    /// Mutable access for scenario set-up between ticks.
    pub fn stations_mut(&mut self) -> &mut [Station] {
        &mut self.stations
    }

    /// Actions chosen in the last tick.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn events(&self) -> impl Iterator<Item = &LogEvent> {
        self.events.iter()
    }

    /// Events dropped by the rate limiter in this generation.
    pub fn events_suppressed(&self) -> u64 {
        self.events.suppressed()
    }

    pub fn history(&self) -> impl Iterator<Item = &HistorySample> {
        self.history.iter()
    }
}
