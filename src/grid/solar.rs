use crate::grid::types::{DailyProfile, daylight_frac};

/// Upper bound of the solar output index.
pub const SOLAR_MAX: f64 = 100.0;

/// Solar generation over the day.
///
/// `SolarProfile` produces a sine-shaped curve between sunrise and sunset,
/// zero at both edges and `peak` at the midpoint. Output is zero at night and
/// always bounded to `[0, 100]`.
#[derive(Debug, Clone)]
pub struct SolarProfile {
    /// Output at the middle of the daylight window.
    pub peak: f64,

    /// Hour generation starts (inclusive).
    pub sunrise_h: f64,

    /// Hour generation ends (exclusive).
    pub sunset_h: f64,
}

impl SolarProfile {
    /// Creates a new solar profile.
    ///
    /// `peak` is clamped into `[0, 100]`.
    ///
    /// # Panics
    ///
    /// Panics if `sunrise_h >= sunset_h` or the window leaves `[0, 24]`.
    pub fn new(peak: f64, sunrise_h: f64, sunset_h: f64) -> Self {
        assert!(sunrise_h < sunset_h && sunrise_h >= 0.0 && sunset_h <= 24.0);
        Self {
            peak: peak.clamp(0.0, SOLAR_MAX),
            sunrise_h,
            sunset_h,
        }
    }
}

impl DailyProfile for SolarProfile {
    fn value_at(&self, hour: f64) -> f64 {
        let frac = daylight_frac(hour, self.sunrise_h, self.sunset_h);
        (self.peak * frac).clamp(0.0, SOLAR_MAX)
    }
}
