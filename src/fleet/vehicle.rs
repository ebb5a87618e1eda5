use std::fmt;

use serde::Serialize;

use crate::route::{Pose, Route};

/// Operating state of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    #[default]
    Moving,
    Charging,
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Moving => f.write_str("MOVING"),
            Self::Charging => f.write_str("CHARGING"),
        }
    }
}

/// One shuttle on the loop.
///
/// `route_progress` is the only positional state; pose and zone are always
/// derived from it through the [`Route`].
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: usize,

    /// Route-relative progress, kept wrapped into `[0, N)`.
    pub route_progress: f64,

    /// State of charge in percent, `[0, 100]`.
    pub battery_soc: f64,

    pub status: VehicleStatus,

    /// Passengers on board, never above `capacity`.
    pub passenger_count: u32,

    pub capacity: u32,

    pub is_platooning: bool,

    /// Drag coefficient applied during the last tick.
    pub drag_coefficient: f64,

    /// Current speed in m/s.
    pub speed_mps: f64,

    pub last_boarded: u32,
    pub last_alighted: u32,

    /// Set once the battery is flat; cleared when charge is regained.
    pub stranded: bool,
}

impl Vehicle {
    /// Creates a moving, empty vehicle.
    ///
    /// # Arguments
    ///
    /// * `id` - Fleet index
    /// * `route_progress` - Initial progress (any magnitude, wrapped by the route)
    /// * `battery_soc` - Initial state of charge in percent
    /// * `capacity` - Seat count (must be > 0)
    /// * `drag_coefficient` - Initial (solo) drag coefficient
    ///
    /// # Panics
    ///
    /// Panics if `battery_soc` is outside `[0, 100]` or `capacity` is zero.
    pub fn new(
        id: usize,
        route_progress: f64,
        battery_soc: f64,
        capacity: u32,
        drag_coefficient: f64,
    ) -> Self {
        assert!((0.0..=100.0).contains(&battery_soc), "battery_soc out of range");
        assert!(capacity > 0, "capacity must be > 0");

        Self {
            id,
            route_progress,
            battery_soc,
            status: VehicleStatus::Moving,
            passenger_count: 0,
            capacity,
            is_platooning: false,
            drag_coefficient,
            speed_mps: 0.0,
            last_boarded: 0,
            last_alighted: 0,
            stranded: false,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.status == VehicleStatus::Moving
    }

    pub fn is_charging(&self) -> bool {
        self.status == VehicleStatus::Charging
    }

    pub fn is_empty(&self) -> bool {
        self.passenger_count == 0
    }

    /// Fraction of seats occupied, `[0, 1]`.
    pub fn load_fraction(&self) -> f64 {
        f64::from(self.passenger_count.min(self.capacity)) / f64::from(self.capacity)
    }

    /// Free seats.
    pub fn free_seats(&self) -> u32 {
        self.capacity.saturating_sub(self.passenger_count)
    }

    /// Derived position and heading.
    pub fn pose(&self, route: &Route) -> Pose {
        route.position_at(self.route_progress)
    }

    /// Index of the waypoint the vehicle is exactly on, if any.
    pub fn at_waypoint(&self, route: &Route) -> Option<usize> {
        let p = route.wrap(self.route_progress);
        if p.fract() == 0.0 {
            Some(p as usize % route.len())
        } else {
            None
        }
    }
}
