//! Stateless energy conversions and estimates.

/// Default panel efficiency used by [`EnergyCalculator::estimate_solar_generation`].
pub const DEFAULT_PANEL_EFFICIENCY: f64 = 0.85;

const KWH_PER_MWH: f64 = 1000.0;

/// Collection of pure energy formulas.
pub struct EnergyCalculator;

impl EnergyCalculator {
    pub fn kwh_to_mwh(kwh: f64) -> f64 {
        kwh / KWH_PER_MWH
    }

    pub fn mwh_to_kwh(mwh: f64) -> f64 {
        mwh * KWH_PER_MWH
    }

    /// Cost of `kwh` at the given per-kWh rate.
    pub fn calculate_cost(kwh: f64, rate_per_kwh: f64) -> f64 {
        kwh * rate_per_kwh
    }

    /// Grid spend avoided by consuming self-generated energy.
    ///
    /// Only the self-consumed share counts, i.e. `min(generated, consumed)`.
    pub fn calculate_savings(generated: f64, consumed: f64, grid_rate: f64) -> f64 {
        generated.min(consumed) * grid_rate
    }

    pub fn estimate_solar_generation(panel_capacity_kw: f64, hours_sun: f64, efficiency: f64) -> f64 {
        panel_capacity_kw * hours_sun * efficiency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn unit_conversions() {
        assert!(approx(EnergyCalculator::kwh_to_mwh(2500.0), 2.5));
        assert!(approx(EnergyCalculator::mwh_to_kwh(2.5), 2500.0));
        assert!(approx(EnergyCalculator::kwh_to_mwh(0.0), 0.0));
    }

    #[test]
    fn cost_is_linear_in_rate() {
        assert!(approx(EnergyCalculator::calculate_cost(40.0, 0.2), 8.0));
        assert!(approx(EnergyCalculator::calculate_cost(40.0, 0.0), 0.0));
    }

    #[test]
    fn savings_use_self_consumed_share() {
        assert!(approx(EnergyCalculator::calculate_savings(50.0, 80.0, 0.2), 10.0));
        assert!(approx(EnergyCalculator::calculate_savings(80.0, 50.0, 0.2), 10.0));
    }

    #[test]
    fn solar_estimate() {
        assert!(approx(
            EnergyCalculator::estimate_solar_generation(5.0, 6.0, DEFAULT_PANEL_EFFICIENCY),
            25.5
        ));
        assert!(approx(EnergyCalculator::estimate_solar_generation(5.0, 6.0, 1.0), 30.0));
    }
}
