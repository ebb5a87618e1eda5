//! Fleet-wide KPI accumulators.

use std::fmt;

use serde::Serialize;

/// Non-negative contributions of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickDelta {
    pub energy_actual_kwh: f64,
    pub energy_counterfactual_kwh: f64,
    pub distance_m: f64,
    pub platoon_distance_m: f64,
    pub empty_distance_m: f64,
    pub served: u64,
    /// Passenger-seconds spent waiting this tick.
    pub wait_time_s: f64,
    pub energy_charged_kwh: f64,
    pub charging_cost: f64,
}

/// Monotonically non-decreasing accumulators.
///
/// Ratios are never stored; they are recomputed from the accumulators on
/// every call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FleetMetrics {
    pub total_energy_actual: f64,
    pub total_energy_counterfactual: f64,
    pub total_distance: f64,
    pub platoon_distance: f64,
    pub empty_distance: f64,
    pub total_served: u64,
    /// Sum of queued passengers times tick duration, in passenger-seconds.
    pub total_wait_time: f64,
    pub total_energy_charged_kwh: f64,
    pub total_charging_cost: f64,
}

impl FleetMetrics {
    /// Adds one tick of deltas. Negative inputs are treated as zero.
    pub fn fold(&mut self, d: &TickDelta) {
        self.total_energy_actual += d.energy_actual_kwh.max(0.0);
        self.total_energy_counterfactual += d.energy_counterfactual_kwh.max(0.0);
        self.total_distance += d.distance_m.max(0.0);
        self.platoon_distance += d.platoon_distance_m.max(0.0);
        self.empty_distance += d.empty_distance_m.max(0.0);
        self.total_served += d.served;
        self.total_wait_time += d.wait_time_s.max(0.0);
        self.total_energy_charged_kwh += d.energy_charged_kwh.max(0.0);
        self.total_charging_cost += d.charging_cost.max(0.0);
    }

    /// Share of distance driven in a platoon, `[0, 1]`.
    pub fn platoon_rate(&self) -> f64 {
        ratio(self.platoon_distance, self.total_distance)
    }

    /// Share of distance driven without passengers, `[0, 1]`.
    pub fn empty_rate(&self) -> f64 {
        ratio(self.empty_distance, self.total_distance)
    }

    /// Energy saved relative to the no-platooning counterfactual, `[0, 1]`.
    pub fn energy_saving_rate(&self) -> f64 {
        ratio(
            self.total_energy_counterfactual - self.total_energy_actual,
            self.total_energy_counterfactual,
        )
    }

    /// Energy saved in kWh, never negative.
    pub fn energy_saved_kwh(&self) -> f64 {
        (self.total_energy_counterfactual - self.total_energy_actual).max(0.0)
    }

    /// Mean energy use per kilometre.
    pub fn kwh_per_km(&self) -> f64 {
        if self.total_distance > 0.0 {
            self.total_energy_actual / (self.total_distance / 1000.0)
        } else {
            0.0
        }
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 && num.is_finite() {
        (num / den).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

impl fmt::Display for FleetMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ---")?;
        writeln!(f, "Distance:              {:.2} km", self.total_distance / 1000.0)?;
        writeln!(
            f,
            "Energy (actual):       {:.2} kWh ({:.3} kWh/km)",
            self.total_energy_actual,
            self.kwh_per_km()
        )?;
        writeln!(f, "Energy (no platoon):   {:.2} kWh", self.total_energy_counterfactual)?;
        writeln!(
            f,
            "Energy saved:          {:.2} kWh ({:.1}%)",
            self.energy_saved_kwh(),
            100.0 * self.energy_saving_rate()
        )?;
        writeln!(f, "Platoon distance:      {:.1}%", 100.0 * self.platoon_rate())?;
        writeln!(f, "Empty distance:        {:.1}%", 100.0 * self.empty_rate())?;
        writeln!(f, "Passengers served:     {}", self.total_served)?;
        writeln!(f, "Wait time (queued):    {:.1} passenger-h", self.total_wait_time / 3600.0)?;
        write!(
            f,
            "Charging:              {:.2} kWh, cost {:.2}",
            self.total_energy_charged_kwh, self.total_charging_cost
        )
    }
}

/// Side-by-side KPIs of a baseline and an adaptive run on the same seed.
///
/// The two runs cover different distances (a baseline fleet never recharges
/// and strands), so raw energy totals are not comparable. Efficiency is
/// compared per kilometre and the platooning saving is taken from the
/// adaptive run's own counterfactual track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyComparison {
    pub baseline: FleetMetrics,
    pub adaptive: FleetMetrics,
}

impl PolicyComparison {
    pub fn new(baseline: FleetMetrics, adaptive: FleetMetrics) -> Self {
        Self { baseline, adaptive }
    }

    /// kWh the adaptive fleet saved by platooning, never negative.
    pub fn platoon_saving_kwh(&self) -> f64 {
        self.adaptive.energy_saved_kwh()
    }

    /// Relative per-km energy difference, positive when adaptive is cheaper.
    ///
    /// Zero when either run covered no distance.
    pub fn per_km_saving_rate(&self) -> f64 {
        let base = self.baseline.kwh_per_km();
        let adaptive = self.adaptive.kwh_per_km();
        if base > 0.0 && adaptive > 0.0 {
            (base - adaptive) / base
        } else {
            0.0
        }
    }
}

impl fmt::Display for PolicyComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Distance:                    {:.2} km baseline, {:.2} km adaptive",
            self.baseline.total_distance / 1000.0,
            self.adaptive.total_distance / 1000.0
        )?;
        writeln!(
            f,
            "Energy per km:               {:.3} baseline, {:.3} adaptive kWh/km ({:+.1}%)",
            self.baseline.kwh_per_km(),
            self.adaptive.kwh_per_km(),
            100.0 * self.per_km_saving_rate()
        )?;
        writeln!(
            f,
            "Adaptive platooning saved:   {:.2} kWh ({:.1}% of solo-drag energy)",
            self.platoon_saving_kwh(),
            100.0 * self.adaptive.energy_saving_rate()
        )?;
        writeln!(
            f,
            "Adaptive platooning share:   {:.1}% of distance",
            100.0 * self.adaptive.platoon_rate()
        )?;
        write!(
            f,
            "Passengers served:           {} baseline, {} adaptive",
            self.baseline.total_served, self.adaptive.total_served
        )
    }
}
