use std::f64::consts::PI;

use crate::grid::types::{DailyProfile, wrap_hour};

/// Island demand over the day.
///
/// `LoadProfile` sums a smooth diurnal sine with a sharp Gaussian bump for the
/// evening peak:
///
/// ```text
/// load(h) = base + amplitude * sin(2π (h - phase_h) / 24)
///         + peak_height * exp(-(h - peak_hour)² / (2 peak_width_h²))
/// ```
///
/// The Gaussian is evaluated on the circular distance to `peak_hour` so the
/// curve stays continuous across midnight.
///
/// # Examples
///
/// ```
/// use fleet_sim::grid::load::LoadProfile;
/// use fleet_sim::grid::types::DailyProfile;
///
/// let load = LoadProfile::new(50.0, 15.0, 8.0, 19.0, 35.0, 1.5);
/// assert!(load.value_at(19.0) > load.value_at(3.0));
/// ```
#[derive(Debug, Clone)]
pub struct LoadProfile {
    /// Mean demand level.
    pub base: f64,

    /// Amplitude of the diurnal oscillation.
    pub amplitude: f64,

    /// Hour at which the diurnal sine crosses upward through `base`.
    pub phase_h: f64,

    /// Centre of the evening peak.
    pub peak_hour: f64,

    /// Height of the evening peak above the diurnal curve.
    pub peak_height: f64,

    /// Standard deviation of the evening peak in hours.
    pub peak_width_h: f64,
}

impl LoadProfile {
    /// Creates a new load profile.
    ///
    /// # Panics
    ///
    /// Panics if `peak_width_h` is not positive.
    pub fn new(
        base: f64,
        amplitude: f64,
        phase_h: f64,
        peak_hour: f64,
        peak_height: f64,
        peak_width_h: f64,
    ) -> Self {
        assert!(peak_width_h > 0.0, "peak_width_h must be > 0");
        Self {
            base,
            amplitude,
            phase_h,
            peak_hour,
            peak_height,
            peak_width_h,
        }
    }

    fn evening_peak(&self, hour: f64) -> f64 {
        let d = (hour - self.peak_hour).abs() % 24.0;
        let d = d.min(24.0 - d);
        self.peak_height * (-(d * d) / (2.0 * self.peak_width_h * self.peak_width_h)).exp()
    }
}

impl DailyProfile for LoadProfile {
    fn value_at(&self, hour: f64) -> f64 {
        let h = wrap_hour(hour);
        let diurnal = self.amplitude * (2.0 * PI * (h - self.phase_h) / 24.0).sin();
        (self.base + diurnal + self.evening_peak(h)).max(0.0)
    }
}
