use rand::Rng;
use serde::Serialize;

use crate::fleet::vehicle::{Vehicle, VehicleStatus};
use crate::route::Point;

/// Externally reported congestion level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StationStatus {
    Normal,
    Crowded,
}

/// A stop with a passenger queue.
#[derive(Debug, Clone)]
pub struct Station {
    /// Same index as the waypoint the station sits on.
    pub id: usize,
    pub name: String,
    pub zone: String,
    pub position: Point,

    /// Relative arrival rate, `[0, 1]`.
    pub popularity_weight: f64,

    /// Passengers waiting. Unsigned, and only ever reduced through `min`.
    pub queue_length: u32,

    /// Passengers boarded here since reset. Never decreases.
    pub total_served: u64,

    /// Depots charge vehicles and generate no demand.
    pub is_depot: bool,
}

/// What happened when a vehicle called at a station.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Exchange {
    pub alighted: u32,
    pub boarded: u32,
    pub started_charging: bool,
}

impl Station {
    /// # Panics
    ///
    /// Panics if `popularity_weight` is outside `[0, 1]`.
    pub fn new(
        id: usize,
        name: impl Into<String>,
        zone: impl Into<String>,
        position: Point,
        popularity_weight: f64,
        is_depot: bool,
    ) -> Self {
        assert!(
            (0.0..=1.0).contains(&popularity_weight),
            "popularity_weight must be in [0, 1]"
        );
        Self {
            id,
            name: name.into(),
            zone: zone.into(),
            position,
            popularity_weight,
            queue_length: 0,
            total_served: 0,
            is_depot,
        }
    }

    /// `Crowded` when strictly more than `crowded_above` are waiting.
    pub fn status(&self, crowded_above: u32) -> StationStatus {
        if self.queue_length > crowded_above {
            StationStatus::Crowded
        } else {
            StationStatus::Normal
        }
    }

    /// Adds one waiting passenger unless the queue is at `cap`.
    ///
    /// # Returns
    ///
    /// `true` if the passenger joined, `false` if they balked.
    pub fn enqueue(&mut self, cap: u32) -> bool {
        if self.queue_length >= cap {
            return false;
        }
        self.queue_length += 1;
        true
    }

    /// Resolves a vehicle call.
    ///
    /// At a depot with `wants_charge` set, every passenger is let off and the
    /// vehicle starts charging. Otherwise up to `max_alight_fraction` of the
    /// riders leave and as many waiting passengers board as there are free seats.
    pub fn exchange<R: Rng + ?Sized>(
        &mut self,
        vehicle: &mut Vehicle,
        wants_charge: bool,
        max_alight_fraction: f64,
        rng: &mut R,
    ) -> Exchange {
        if self.is_depot && wants_charge {
            let alighted = vehicle.passenger_count;
            vehicle.passenger_count = 0;
            vehicle.status = VehicleStatus::Charging;
            vehicle.speed_mps = 0.0;
            vehicle.is_platooning = false;
            vehicle.last_alighted = alighted;
            vehicle.last_boarded = 0;
            return Exchange {
                alighted,
                boarded: 0,
                started_charging: true,
            };
        }

        let max_frac = max_alight_fraction.clamp(0.0, 1.0);
        let frac = if max_frac > 0.0 {
            rng.random_range(0.0..=max_frac)
        } else {
            0.0
        };
        let alighted = ((f64::from(vehicle.passenger_count) * frac).floor() as u32)
            .min(vehicle.passenger_count);
        vehicle.passenger_count -= alighted;

        let boarded = self.queue_length.min(vehicle.free_seats());
        self.queue_length -= boarded;
        self.total_served += u64::from(boarded);
        vehicle.passenger_count += boarded;

        vehicle.last_alighted = alighted;
        vehicle.last_boarded = boarded;
        Exchange {
            alighted,
            boarded,
            started_charging: false,
        }
    }
}
