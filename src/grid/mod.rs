//! Time-of-day driven environment signal: solar, demand, tariff and wind.

pub mod load;
pub mod solar;
pub mod tariff;
pub mod types;
pub mod wind;

use load::LoadProfile;
use solar::SolarProfile;
use tariff::Tariff;
use types::{DailyProfile, GridState, wrap_hour};
use wind::WindProfile;

/// Island microgrid model.
///
/// Holds only immutable parameters. [`Microgrid::state_at`] is a pure function
/// of the time of day, so it can be queried at any instant in any order.
#[derive(Debug, Clone)]
pub struct Microgrid {
    pub solar: SolarProfile,
    pub load: LoadProfile,
    pub tariff: Tariff,
    pub wind: WindProfile,
    /// Fraction of solar output that offsets demand.
    pub solar_offset: f64,
    /// Minimum net load.
    pub net_load_floor: f64,
}

impl Microgrid {
    /// # Panics
    ///
    /// Panics if `solar_offset` is negative.
    pub fn new(
        solar: SolarProfile,
        load: LoadProfile,
        tariff: Tariff,
        wind: WindProfile,
        solar_offset: f64,
        net_load_floor: f64,
    ) -> Self {
        assert!(solar_offset >= 0.0, "solar_offset must be >= 0");
        Self {
            solar,
            load,
            tariff,
            wind,
            solar_offset,
            net_load_floor,
        }
    }

    /// Computes the grid signals at `time_of_day_h` (wrapped modulo 24 h).
    ///
    /// # Returns
    ///
    /// A [`GridState`] with `net_load = max(floor, base_load - k * solar)` and
    /// the tariff tier for that net load.
    pub fn state_at(&self, time_of_day_h: f64) -> GridState {
        let hour = wrap_hour(time_of_day_h);
        let solar_output = self.solar.value_at(hour);
        let base_load = self.load.value_at(hour);
        let net_load = (base_load - self.solar_offset * solar_output).max(self.net_load_floor);
        let (status, price) = self.tariff.classify(net_load);

        GridState {
            hour,
            solar_output,
            base_load,
            net_load,
            price,
            status,
            wind_mps: self.wind.value_at(hour),
        }
    }
}

impl Default for Microgrid {
    fn default() -> Self {
        Self::new(
            SolarProfile::new(100.0, 6.0, 18.0),
            LoadProfile::new(50.0, 15.0, 8.0, 19.0, 35.0, 1.5),
            Tariff::new(40.0, 70.0, 0.08, 0.15, 0.32),
            WindProfile::default(),
            0.5,
            20.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::types::GridStatus;

    #[test]
    fn state_is_pure_function_of_hour() {
        let grid = Microgrid::default();
        for i in 0..96 {
            let h = i as f64 * 0.25;
            assert_eq!(grid.state_at(h), grid.state_at(h));
            assert_eq!(grid.state_at(h), grid.state_at(h + 24.0));
        }
    }

    #[test]
    fn net_load_respects_floor() {
        let grid = Microgrid::default();
        for i in 0..240 {
            let s = grid.state_at(i as f64 * 0.1);
            assert!(s.net_load >= 20.0);
            assert!((0.0..=100.0).contains(&s.solar_output));
        }
    }

    #[test]
    fn solar_offsets_demand_at_midday() {
        let grid = Microgrid::default();
        let noon = grid.state_at(12.0);
        assert!(noon.net_load < noon.base_load);
        assert_eq!(noon.status, GridStatus::Green);
        assert_eq!(noon.price, 0.08);
    }

    #[test]
    fn evening_peak_is_expensive() {
        let grid = Microgrid::default();
        let evening = grid.state_at(19.0);
        assert_eq!(evening.solar_output, 0.0);
        assert_eq!(evening.status, GridStatus::Peak);
        assert_eq!(evening.price, 0.32);
    }

    #[test]
    fn late_evening_is_normal_tier() {
        let grid = Microgrid::default();
        let late = grid.state_at(22.0);
        assert_eq!(late.status, GridStatus::Normal);
        assert_eq!(late.price, 0.15);
    }

    #[test]
    fn wind_is_part_of_the_state() {
        let grid = Microgrid::default();
        assert!((grid.state_at(0.75).wind_mps - 10.0).abs() < 1e-9);
        let calm = Microgrid {
            wind: WindProfile::new(0.0, 0.0, 0),
            ..Microgrid::default()
        };
        assert_eq!(calm.state_at(0.75).wind_mps, 0.0);
        assert_eq!(calm.state_at(12.0).net_load, grid.state_at(12.0).net_load);
    }
}
