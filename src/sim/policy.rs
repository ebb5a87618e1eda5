//! Per-vehicle dispatch decisions.
//!
//! The policy only expresses intent. Whether a vehicle can actually charge
//! (it must reach a depot) or platoon (a partner must be in range) is decided
//! by the physics step.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::fleet::vehicle::Vehicle;
use crate::grid::types::{GridState, GridStatus};

/// Which policy drives the fleet.
///
/// Serializes upper case; parses and deserializes in any case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyMode {
    Baseline,
    #[default]
    Adaptive,
}

impl fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Baseline => f.write_str("BASELINE"),
            Self::Adaptive => f.write_str("ADAPTIVE"),
        }
    }
}

impl FromStr for PolicyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "baseline" => Ok(Self::Baseline),
            "adaptive" => Ok(Self::Adaptive),
            other => Err(format!(
                "unknown policy mode '{other}' (expected BASELINE or ADAPTIVE)"
            )),
        }
    }
}

impl<'de> Deserialize<'de> for PolicyMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Intent for one vehicle for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    #[default]
    Cruise,
    Charge,
    PlatoonEligible,
}

impl Action {
    pub fn wants_charge(self) -> bool {
        self == Self::Charge
    }

    /// A vehicle heading to the depot may still draft on the way.
    pub fn allows_platooning(self) -> bool {
        matches!(self, Self::PlatoonEligible | Self::Charge)
    }
}

/// Fleet-wide facts a policy may look at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FleetSummary {
    pub vehicles_charging: usize,
    pub total_waiting: u32,
    /// Moving vehicle with the lowest SoC below the top-up level, if any.
    /// Ties go to the lower id.
    pub topup_candidate: Option<usize>,
}

impl FleetSummary {
    pub fn from_parts(vehicles: &[Vehicle], total_waiting: u32, topup_soc: f64) -> Self {
        let topup_candidate = vehicles
            .iter()
            .filter(|v| v.is_moving() && v.battery_soc > 0.0 && v.battery_soc < topup_soc)
            .min_by(|a, b| a.battery_soc.total_cmp(&b.battery_soc).then(a.id.cmp(&b.id)))
            .map(|v| v.id);
        Self {
            vehicles_charging: vehicles.iter().filter(|v| v.is_charging()).count(),
            total_waiting,
            topup_candidate,
        }
    }
}

/// Thresholds used by the adaptive policy.
#[derive(Debug, Clone)]
pub struct PolicyParams {
    /// Below this SoC a vehicle always requests charge.
    pub charge_threshold: f64,
    /// A charging session runs until this SoC.
    pub charge_target: f64,
    /// Under a GREEN tariff, vehicles below this SoC top up.
    pub green_topup_soc: f64,
    /// Top-ups are only requested while fewer vehicles than this are charging.
    pub max_concurrent_charging: usize,
    /// Top-ups are only requested while fewer passengers than this are waiting.
    pub busy_waiting: u32,
}

impl Default for PolicyParams {
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

/// A pure decision function.
pub trait DispatchPolicy {
    fn decide(&self, vehicle: &Vehicle, fleet: &FleetSummary, grid: &GridState) -> Action;
}

/// Ignores battery, fleet and grid: every vehicle just cruises.
#[derive(Debug, Default, Clone, Copy)]
pub struct BaselinePolicy;

impl DispatchPolicy for BaselinePolicy {
    fn decide(&self, _vehicle: &Vehicle, _fleet: &FleetSummary, _grid: &GridState) -> Action {
        Action::Cruise
    }
}

/// Battery-, grid- and demand-aware policy.
///
/// Low batteries always charge. Discretionary GREEN top-ups go to one
/// vehicle at a time (the fleet's lowest SoC) and only while the network
/// is quiet and a charger slot is free.
#[derive(Debug, Clone, Copy)]
pub struct AdaptivePolicy<'a> {
    pub params: &'a PolicyParams,
}

impl<'a> AdaptivePolicy<'a> {
    pub fn new(params: &'a PolicyParams) -> Self {
        Self { params }
    }
}

impl DispatchPolicy for AdaptivePolicy<'_> {
    fn decide(&self, vehicle: &Vehicle, fleet: &FleetSummary, grid: &GridState) -> Action {
        let p = self.params;
        let soc = vehicle.battery_soc;

        if vehicle.is_charging() && soc < p.charge_target {
            return Action::Charge;
        }
        if soc < p.charge_threshold {
            return Action::Charge;
        }
        if grid.status == GridStatus::Green
            && soc < p.green_topup_soc
            && fleet.topup_candidate == Some(vehicle.id)
            && fleet.total_waiting < p.busy_waiting
            && fleet.vehicles_charging < p.max_concurrent_charging
        {
            return Action::Charge;
        }
        Action::PlatoonEligible
    }
}

/// Dispatches to the policy selected by `mode`.
pub fn decide(
    vehicle: &Vehicle,
    fleet: &FleetSummary,
    grid: &GridState,
    mode: PolicyMode,
    params: &PolicyParams,
) -> Action {
    match mode {
        PolicyMode::Baseline => BaselinePolicy.decide(vehicle, fleet, grid),
        PolicyMode::Adaptive => AdaptivePolicy::new(params).decide(vehicle, fleet, grid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::vehicle::VehicleStatus;

    fn vehicle(soc: f64) -> Vehicle {
        Vehicle::new(0, 0.0, soc, 12, 0.8)
    }

    fn grid(status: GridStatus) -> GridState {
        GridState {
            status,
            ..GridState::default()
        }
    }

    #[test]
    fn baseline_always_cruises() {
        let params = PolicyParams::default();
        let fleet = FleetSummary::default();
        for soc in [0.0, 10.0, 24.0, 50.0, 100.0] {
            for status in [GridStatus::Green, GridStatus::Normal, GridStatus::Peak] {
                let a = decide(&vehicle(soc), &fleet, &grid(status), PolicyMode::Baseline, &params);
                assert_eq!(a, Action::Cruise);
                assert!(!a.allows_platooning());
            }
        }
    }

    #[test]
    fn adaptive_charges_below_threshold() {
        let params = PolicyParams::default();
        let fleet = FleetSummary {
            vehicles_charging: 5,
            total_waiting: 40,
            topup_candidate: Some(3),
        };
        let a = decide(&vehicle(24.0), &fleet, &grid(GridStatus::Peak), PolicyMode::Adaptive, &params);
        assert_eq!(a, Action::Charge);
    }

    #[test]
    fn adaptive_cruises_platoon_eligible_above_threshold() {
        let params = PolicyParams::default();
        let fleet = FleetSummary::default();
        let a = decide(&vehicle(60.0), &fleet, &grid(GridStatus::Normal), PolicyMode::Adaptive, &params);
        assert_eq!(a, Action::PlatoonEligible);
        assert!(a.allows_platooning());
    }

    #[test]
    fn adaptive_keeps_charging_until_target() {
        let params = PolicyParams::default();
        let fleet = FleetSummary::default();
        let mut v = vehicle(80.0);
        v.status = VehicleStatus::Charging;
        let a = decide(&v, &fleet, &grid(GridStatus::Peak), PolicyMode::Adaptive, &params);
        assert_eq!(a, Action::Charge);
        v.battery_soc = 95.0;
        let a = decide(&v, &fleet, &grid(GridStatus::Peak), PolicyMode::Adaptive, &params);
        assert_eq!(a, Action::PlatoonEligible);
    }

    fn quiet_fleet(candidate: usize) -> FleetSummary {
        FleetSummary {
            vehicles_charging: 1,
            total_waiting: 0,
            topup_candidate: Some(candidate),
        }
    }

    #[test]
    fn green_top_up_respects_concurrency() {
        let params = PolicyParams::default();
        let mut fleet = quiet_fleet(0);
        let v = vehicle(35.0);
        assert_eq!(
            decide(&v, &fleet, &grid(GridStatus::Green), PolicyMode::Adaptive, &params),
            Action::Charge
        );
        assert_eq!(
            decide(&v, &fleet, &grid(GridStatus::Normal), PolicyMode::Adaptive, &params),
            Action::PlatoonEligible
        );
        fleet.vehicles_charging = 2;
        assert_eq!(
            decide(&v, &fleet, &grid(GridStatus::Green), PolicyMode::Adaptive, &params),
            Action::PlatoonEligible
        );
    }

    #[test]
    fn green_top_up_waits_for_a_quiet_network() {
        let params = PolicyParams::default();
        let mut fleet = quiet_fleet(0);
        let v = vehicle(35.0);
        fleet.total_waiting = 24;
        assert_eq!(
            decide(&v, &fleet, &grid(GridStatus::Green), PolicyMode::Adaptive, &params),
            Action::Charge
        );
        fleet.total_waiting = 25;
        assert_eq!(
            decide(&v, &fleet, &grid(GridStatus::Green), PolicyMode::Adaptive, &params),
            Action::PlatoonEligible
        );
    }

    #[test]
    fn busy_network_still_charges_low_batteries() {
        let params = PolicyParams::default();
        let fleet = FleetSummary {
            vehicles_charging: 0,
            total_waiting: 200,
            topup_candidate: None,
        };
        assert_eq!(
            decide(&vehicle(20.0), &fleet, &grid(GridStatus::Peak), PolicyMode::Adaptive, &params),
            Action::Charge
        );
    }

    #[test]
    fn only_the_lowest_vehicle_tops_up() {
        let params = PolicyParams::default();
        let mut fleet_vehicles = vec![
            Vehicle::new(0, 0.0, 38.0, 12, 0.8),
            Vehicle::new(1, 1.0, 31.0, 12, 0.8),
            Vehicle::new(2, 2.0, 31.0, 12, 0.8),
            Vehicle::new(3, 3.0, 70.0, 12, 0.8),
        ];
        let fleet = FleetSummary::from_parts(&fleet_vehicles, 3, params.green_topup_soc);
        assert_eq!(fleet.topup_candidate, Some(1));

        let green = grid(GridStatus::Green);
        let actions: Vec<Action> = fleet_vehicles
            .iter()
            .map(|v| decide(v, &fleet, &green, PolicyMode::Adaptive, &params))
            .collect();
        assert_eq!(
            actions,
            vec![
                Action::PlatoonEligible,
                Action::Charge,
                Action::PlatoonEligible,
                Action::PlatoonEligible
            ]
        );

        fleet_vehicles[1].status = VehicleStatus::Charging;
        let fleet = FleetSummary::from_parts(&fleet_vehicles, 3, params.green_topup_soc);
        assert_eq!(fleet.vehicles_charging, 1);
        assert_eq!(fleet.topup_candidate, Some(2));
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("BASELINE".parse::<PolicyMode>(), Ok(PolicyMode::Baseline));
        assert_eq!("adaptive".parse::<PolicyMode>(), Ok(PolicyMode::Adaptive));
        assert!("greedy".parse::<PolicyMode>().is_err());
        assert_eq!(PolicyMode::Adaptive.to_string(), "ADAPTIVE");
    }

    #[test]
    fn mode_round_trips_through_json() {
        for raw in ["\"BASELINE\"", "\"baseline\"", "\"Baseline\""] {
            let m: PolicyMode = serde_json::from_str(raw).unwrap();
            assert_eq!(m, PolicyMode::Baseline);
        }
        assert_eq!(serde_json::to_string(&PolicyMode::Baseline).unwrap(), "\"BASELINE\"");
        let err = serde_json::from_str::<PolicyMode>("\"turbo\"").unwrap_err();
        assert!(err.to_string().contains("unknown policy mode"));
        assert_eq!(serde_json::to_string(&Action::PlatoonEligible).unwrap(), "\"PLATOON_ELIGIBLE\"");
    }
}
