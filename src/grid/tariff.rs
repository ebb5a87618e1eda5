use crate::grid::types::GridStatus;

/// Threshold-based price tiers on net load.
#[derive(Debug, Clone)]
pub struct Tariff {
    /// Net load strictly below this is GREEN.
    pub green_below: f64,
    /// Net load strictly above this is PEAK.
    pub peak_above: f64,
    pub green_price: f64,
    pub normal_price: f64,
    pub peak_price: f64,
}

impl Tariff {
    /// # Panics
    ///
    /// Panics if `green_below > peak_above` or any price is negative.
    pub fn new(
        green_below: f64,
        peak_above: f64,
        green_price: f64,
        normal_price: f64,
        peak_price: f64,
    ) -> Self {
        assert!(green_below <= peak_above);
        assert!(green_price >= 0.0 && normal_price >= 0.0 && peak_price >= 0.0);
        Self {
            green_below,
            peak_above,
            green_price,
            normal_price,
            peak_price,
        }
    }

    /// Returns the tier and price for a net load.
    pub fn classify(&self, net_load: f64) -> (GridStatus, f64) {
        if net_load < self.green_below {
            (GridStatus::Green, self.green_price)
        } else if net_load > self.peak_above {
            (GridStatus::Peak, self.peak_price)
        } else {
            (GridStatus::Normal, self.normal_price)
        }
    }
}
