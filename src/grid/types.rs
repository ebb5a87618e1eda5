//! Common types and traits for microgrid signal components.

use std::fmt;

use serde::Serialize;

/// Tariff tier derived from net load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GridStatus {
    Green,
    #[default]
    Normal,
    Peak,
}

impl fmt::Display for GridStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Green => "GREEN",
            Self::Normal => "NORMAL",
            Self::Peak => "PEAK",
        };
        f.write_str(s)
    }
}

/// Environment signals at one instant.
///
/// Fully recomputed from the time of day; carries no history.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct GridState {
    /// Time of day in hours, `[0, 24)`.
    pub hour: f64,
    /// Solar generation index, `[0, 100]`.
    pub solar_output: f64,
    /// Demand before solar offset.
    pub base_load: f64,
    /// Demand after solar offset, never below the configured floor.
    pub net_load: f64,
    /// Energy price per kWh.
    pub price: f64,
    pub status: GridStatus,
    /// Ambient wind speed in m/s, before local exposure.
    pub wind_mps: f64,
}

/// A smooth signal that repeats every 24 hours.
///
/// Implementations must be pure: the same hour always yields the same value.
pub trait DailyProfile {
    /// Returns the signal value at `hour` (any magnitude, wrapped to 24 h).
    fn value_at(&self, hour: f64) -> f64;
}

/// Wraps an hour of any magnitude into `[0, 24)`.
pub fn wrap_hour(hour: f64) -> f64 {
    let h = hour.rem_euclid(24.0);
    if h >= 24.0 { 0.0 } else { h }
}

/// Sine-shaped daylight fraction: zero at the window edges and outside,
/// one at the midpoint.
///
/// # Arguments
///
/// * `hour` - Time of day in hours
/// * `sunrise` - Start of the daylight window (inclusive)
/// * `sunset` - End of the daylight window (exclusive)
pub fn daylight_frac(hour: f64, sunrise: f64, sunset: f64) -> f64 {
    let h = wrap_hour(hour);
    if h < sunrise || h >= sunset || sunset <= sunrise {
        return 0.0;
    }
    let x = (h - sunrise) / (sunset - sunrise);
    (std::f64::consts::PI * x).sin().clamp(0.0, 1.0)
}
