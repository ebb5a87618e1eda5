//! Kinematics, power draw and dual-track energy accounting.

use crate::fleet::vehicle::{Vehicle, VehicleStatus};
use crate::route::Route;

/// Physical constants shared by every vehicle.
#[derive(Debug, Clone)]
pub struct PhysicsParams {
    /// Drag coefficient when driving alone.
    pub drag_solo: f64,
    /// Drag coefficient when drafting in a platoon.
    pub drag_platoon: f64,
    /// Aerodynamic power per unit drag per (m/s)^3, in watts.
    pub aero_coeff_w: f64,
    /// Constant auxiliary draw (climate, electronics) in kW.
    pub base_power_kw: f64,
    /// Extra draw of a full vehicle relative to an empty one.
    pub passenger_load_factor: f64,
    pub cruise_speed_mps: f64,
    /// Speed multiplier while platooning.
    pub platoon_speed_boost: f64,
    /// Below this SoC the vehicle is capped at `limp_speed_mps`.
    pub limp_soc: f64,
    pub limp_speed_mps: f64,
    pub accel_mps2: f64,
    /// Depot charger power in kW.
    pub charger_kw: f64,
    pub battery_kwh: f64,
    /// SoC at which a charging session ends.
    pub charge_target_soc: f64,
    /// Platoon window: strictly farther than `platoon_min_m`, strictly closer than `platoon_max_m`.
    pub platoon_min_m: f64,
    pub platoon_max_m: f64,
    /// Local wind strictly above this adds `wind_drag_penalty` to the drag coefficient.
    pub strong_wind_mps: f64,
    pub wind_drag_penalty: f64,
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            drag_solo: 0.8,
            drag_platoon: 0.4,
            aero_coeff_w: 3.6,
            base_power_kw: 3.0,
            passenger_load_factor: 0.3,
            cruise_speed_mps: 12.0,
            platoon_speed_boost: 1.1,
            limp_soc: 15.0,
            limp_speed_mps: 8.0,
            accel_mps2: 1.0,
            charger_kw: 60.0,
            battery_kwh: 40.0,
            charge_target_soc: 95.0,
            platoon_min_m: 20.0,
            platoon_max_m: 70.0,
            strong_wind_mps: 10.0,
            wind_drag_penalty: 0.1,
        }
    }
}

impl PhysicsParams {
    /// Instantaneous traction plus auxiliary power in kW.
    ///
    /// Used for both the actual and the counterfactual draw; only `drag` may
    /// differ between the two calls.
    ///
    /// # Arguments
    ///
    /// * `drag` - Drag coefficient
    /// * `speed_mps` - Speed in m/s
    /// * `load_fraction` - Occupied fraction of seats, `[0, 1]`
    /// * `terrain` - Terrain multiplier of the current segment
    pub fn power_kw(&self, drag: f64, speed_mps: f64, load_fraction: f64, terrain: f64) -> f64 {
        let aero_kw = self.aero_coeff_w * drag * speed_mps.powi(3) / 1000.0;
        let load = 1.0 + self.passenger_load_factor * load_fraction.clamp(0.0, 1.0);
        ((aero_kw + self.base_power_kw) * load * terrain).max(0.0)
    }

    /// Speed the vehicle tries to reach this tick.
    pub fn target_speed(&self, vehicle: &Vehicle, terrain: f64) -> f64 {
        if vehicle.battery_soc <= 0.0 {
            return 0.0;
        }
        let boost = if vehicle.is_platooning {
            self.platoon_speed_boost
        } else {
            1.0
        };
        let mut target = self.cruise_speed_mps * boost / terrain.max(1.0);
        if vehicle.battery_soc < self.limp_soc {
            target = target.min(self.limp_speed_mps);
        }
        target
    }

    /// Drag added by a local wind speed; zero unless the wind is strong.
    pub fn wind_drag(&self, local_wind_mps: f64) -> f64 {
        if local_wind_mps > self.strong_wind_mps {
            self.wind_drag_penalty
        } else {
            0.0
        }
    }

    fn soc_delta(&self, kwh: f64) -> f64 {
        kwh / self.battery_kwh * 100.0
    }
}

/// Per-vehicle result of one integration step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotionOutcome {
    pub traveled_m: f64,
    /// Energy drawn from the battery.
    pub energy_actual_kwh: f64,
    /// Energy the same motion would have drawn at solo drag.
    pub energy_counterfactual_kwh: f64,
    /// Energy put into the battery by the depot charger.
    pub energy_charged_kwh: f64,
    /// Waypoints reached this tick, in order.
    pub arrivals: Vec<usize>,
    /// Movement stopped on the last arrival (a depot the vehicle wants to charge at).
    pub halted: bool,
    pub charge_completed: bool,
    /// Battery reached zero this tick.
    pub depleted: bool,
}

/// Flags vehicles that are drafting behind or ahead of a fleet mate.
///
/// A vehicle is platooning iff it is moving with charge left, `eligible[i]` is
/// set, and another vehicle meeting the same conditions is inside the
/// platoon window. Positions are the derived poses at the time of the call.
pub fn detect_platoons(
    route: &Route,
    vehicles: &[Vehicle],
    eligible: &[bool],
    params: &PhysicsParams,
) -> Vec<bool> {
    let active: Vec<bool> = vehicles
        .iter()
        .zip(eligible)
        .map(|(v, &ok)| ok && v.is_moving() && v.battery_soc > 0.0)
        .collect();
    let poses: Vec<_> = vehicles.iter().map(|v| v.pose(route)).collect();

    let mut flags = vec![false; vehicles.len()];
    for i in 0..vehicles.len() {
        if !active[i] {
            continue;
        }
        for j in (i + 1)..vehicles.len() {
            if !active[j] {
                continue;
            }
            let d = route.distance_m(&poses[i], &poses[j]);
            if d > params.platoon_min_m && d < params.platoon_max_m {
                flags[i] = true;
                flags[j] = true;
            }
        }
    }
    flags
}

/// Advances one vehicle by `dt_s` seconds.
///
/// A charging vehicle stays put and gains charge until the target is reached.
/// A moving vehicle accelerates towards its target speed, moves along the
/// route and drains the battery; `halt_at` decides which reached waypoints
/// stop it. Strong local wind (`ambient_wind_mps` plus the segment's
/// exposure) adds the same drag penalty to both tracks. The counterfactual
/// draw always uses solo drag with the same speed, load, terrain and wind as
/// the actual draw and never touches `battery_soc`.
pub fn integrate(
    vehicle: &mut Vehicle,
    route: &Route,
    params: &PhysicsParams,
    dt_s: f64,
    ambient_wind_mps: f64,
    halt_at: impl Fn(usize) -> bool,
) -> MotionOutcome {
    let dt_h = dt_s / 3600.0;
    let mut out = MotionOutcome::default();

    if vehicle.status == VehicleStatus::Charging {
        vehicle.speed_mps = 0.0;
        vehicle.drag_coefficient = params.drag_solo;
        let room_kwh = (100.0 - vehicle.battery_soc).max(0.0) / 100.0 * params.battery_kwh;
        let charged = (params.charger_kw * dt_h).min(room_kwh);
        vehicle.battery_soc = (vehicle.battery_soc + params.soc_delta(charged)).clamp(0.0, 100.0);
        vehicle.stranded = false;
        out.energy_charged_kwh = charged;
        if vehicle.battery_soc >= params.charge_target_soc {
            vehicle.status = VehicleStatus::Moving;
            out.charge_completed = true;
        }
        return out;
    }

    let wind_drag = params.wind_drag(ambient_wind_mps + route.wind_exposure(vehicle.route_progress));
    let base_drag = if vehicle.is_platooning {
        params.drag_platoon
    } else {
        params.drag_solo
    };
    vehicle.drag_coefficient = base_drag + wind_drag;

    let terrain = route.terrain_factor(vehicle.route_progress);
    let target = params.target_speed(vehicle, terrain);
    vehicle.speed_mps = if vehicle.speed_mps < target {
        (vehicle.speed_mps + params.accel_mps2 * dt_s).min(target)
    } else {
        target
    };

    if vehicle.speed_mps <= 0.0 {
        vehicle.speed_mps = 0.0;
        return out;
    }

    let planned_m = vehicle.speed_mps * dt_s;
    let step = route.advance(vehicle.route_progress, planned_m, halt_at);
    vehicle.route_progress = step.progress;

    // Energy is drawn only for the part of the tick actually spent moving.
    let moving_h = dt_h * (step.traveled_m / planned_m).clamp(0.0, 1.0);
    let load = vehicle.load_fraction();
    let actual = params.power_kw(vehicle.drag_coefficient, vehicle.speed_mps, load, terrain);
    let counterfactual = params.power_kw(params.drag_solo + wind_drag, vehicle.speed_mps, load, terrain);

    out.traveled_m = step.traveled_m;
    out.energy_actual_kwh = actual * moving_h;
    out.energy_counterfactual_kwh = counterfactual * moving_h;
    out.arrivals = step.arrivals;
    out.halted = step.halted;

    let before = vehicle.battery_soc;
    vehicle.battery_soc = (before - params.soc_delta(out.energy_actual_kwh)).clamp(0.0, 100.0);
    if vehicle.battery_soc <= 0.0 && before > 0.0 {
        vehicle.stranded = true;
        out.depleted = true;
    }
    if step.halted {
        vehicle.speed_mps = 0.0;
    }
    out
}
