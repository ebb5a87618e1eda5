use rand::Rng;

use crate::fleet::station::Station;
use crate::grid::types::wrap_hour;

/// Stochastic passenger arrivals.
///
/// Each tick every non-depot station gets one Bernoulli trial with
/// probability `base_probability * rush_factor(hour) * popularity_weight`.
/// Successful arrivals join the queue unless it is already at `queue_cap`.
#[derive(Debug, Clone)]
pub struct DemandModel {
    /// Arrival probability per tick for a station of popularity 1.0 off-peak.
    pub base_probability: f64,
    /// Half-open `[start, end)` hour windows with elevated demand.
    pub rush_windows: Vec<(f64, f64)>,
    pub rush_multiplier: f64,
    pub queue_cap: u32,
}

impl Default for DemandModel {
    fn default() -> Self {
        Self {
            base_probability: 0.02,
            rush_windows: vec![(7.0, 9.0), (17.0, 19.0)],
            rush_multiplier: 2.5,
            queue_cap: 40,
        }
    }
}

impl DemandModel {
    pub fn is_rush_hour(&self, hour: f64) -> bool {
        let h = wrap_hour(hour);
        self.rush_windows.iter().any(|&(s, e)| h >= s && h < e)
    }

    pub fn rush_factor(&self, hour: f64) -> f64 {
        if self.is_rush_hour(hour) {
            self.rush_multiplier
        } else {
            1.0
        }
    }

    /// Per-tick arrival probability, clamped to `[0, 1]`.
    pub fn arrival_probability(&self, hour: f64, popularity_weight: f64) -> f64 {
        (self.base_probability * self.rush_factor(hour) * popularity_weight).clamp(0.0, 1.0)
    }

    /// Runs one tick of arrivals.
    ///
    /// # Returns
    ///
    /// Number of passengers that actually joined a queue.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        stations: &mut [Station],
        hour: f64,
        rng: &mut R,
    ) -> u32 {
        let mut joined = 0;
        for station in stations.iter_mut().filter(|s| !s.is_depot) {
            let p = self.arrival_probability(hour, station.popularity_weight);
            if rng.random_bool(p) && station.enqueue(self.queue_cap) {
                joined += 1;
            }
        }
        joined
    }
}
