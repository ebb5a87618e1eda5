/// Simulated time advanced by a fixed delta per tick.
///
/// Simulated time depends only on the number of ticks taken, never on how
/// often or how regularly [`SimClock::advance`] is called.
///
/// # Examples
///
/// ```
/// use fleet_sim::sim::clock::SimClock;
///
/// let mut clock = SimClock::new(2.0, 6.0);
/// assert_eq!(clock.advance(), 1);
/// assert_eq!(clock.elapsed_s(), 2.0);
/// assert_eq!(clock.label(), "06:00:02");
/// ```
#[derive(Debug, Clone)]
pub struct SimClock {
    /// Ticks taken since construction
    tick: u64,
    /// Simulated seconds per tick
    tick_seconds: f64,
    /// Time of day at tick 0, in hours
    start_hour: f64,
}

impl SimClock {
    /// Creates a clock at tick 0.
    ///
    /// # Arguments
    ///
    /// * `tick_seconds` - Simulated seconds per tick (must be > 0)
    /// * `start_hour` - Time of day at tick 0, `[0, 24)`
    ///
    /// # Panics
    ///
    /// Panics if `tick_seconds` is not positive or `start_hour` is out of range.
    pub fn new(tick_seconds: f64, start_hour: f64) -> Self {
        assert!(tick_seconds > 0.0, "tick_seconds must be > 0");
        assert!((0.0..24.0).contains(&start_hour), "start_hour must be in [0, 24)");
        Self {
            tick: 0,
            tick_seconds,
            start_hour,
        }
    }

    /// Advances by one tick.
    ///
    /// # Returns
    ///
    /// The new tick count.
    pub fn advance(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn tick_seconds(&self) -> f64 {
        self.tick_seconds
    }

    /// Simulated seconds since tick 0.
    pub fn elapsed_s(&self) -> f64 {
        self.tick as f64 * self.tick_seconds
    }

    /// Time of day in hours, `[0, 24)`.
    pub fn time_of_day_h(&self) -> f64 {
        crate::grid::types::wrap_hour(self.start_hour + self.elapsed_s() / 3600.0)
    }

    /// Number of ticks covering `hours` of simulated time, rounded up.
    pub fn ticks_for_hours(&self, hours: f64) -> u64 {
        (hours.max(0.0) * 3600.0 / self.tick_seconds).ceil() as u64
    }

    /// Wall-style `HH:MM:SS` time of day.
    pub fn label(&self) -> String {
        let total = (self.time_of_day_h() * 3600.0).round() as u64 % 86_400;
        format!("{:02}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
    }
}
