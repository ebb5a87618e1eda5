use std::f64::consts::PI;

use crate::grid::types::{DailyProfile, wrap_hour};

/// Ambient wind over the day.
///
/// A gusting sine around a mean speed, completing a whole number of cycles
/// per day so the curve is continuous across midnight:
///
/// ```text
/// wind(h) = max(0, mean + gust * sin(2π cycles h / 24))
/// ```
///
/// Local exposure (ridges, open coast) is added per route segment by the
/// caller, not here.
#[derive(Debug, Clone)]
pub struct WindProfile {
    /// Mean wind speed in m/s.
    pub mean_mps: f64,

    /// Gust amplitude in m/s.
    pub gust_mps: f64,

    /// Gust cycles per day.
    pub cycles_per_day: u32,
}

impl WindProfile {
    /// # Panics
    ///
    /// Panics if `mean_mps` or `gust_mps` is negative.
    pub fn new(mean_mps: f64, gust_mps: f64, cycles_per_day: u32) -> Self {
        assert!(mean_mps >= 0.0, "mean_mps must be >= 0");
        assert!(gust_mps >= 0.0, "gust_mps must be >= 0");
        Self {
            mean_mps,
            gust_mps,
            cycles_per_day,
        }
    }
}

impl Default for WindProfile {
    fn default() -> Self {
        Self::new(5.0, 5.0, 8)
    }
}

impl DailyProfile for WindProfile {
    fn value_at(&self, hour: f64) -> f64 {
        let h = wrap_hour(hour);
        let phase = 2.0 * PI * f64::from(self.cycles_per_day) * h / 24.0;
        (self.mean_mps + self.gust_mps * phase.sin()).max(0.0)
    }
}
