//! Pluggable momentum scoring models.
//!
//! A model turns a validated price series into a risk-adjusted score read as
//! the expected fractional return over one trading week.

use trading::ScoringModelKind;

pub trait ScoringModel: Send + Sync {
    fn name(&self) -> &str;

    /// Scores a price series.
    ///
    /// # Arguments
    ///
    /// * `prices` - Oldest first, ending with the current quote. At least three
    ///   points, all finite and positive.
    /// * `volatility` - Volatility of the same series.
    /// * `horizon` - Number of steps in one trading week.
    fn score(&self, prices: &[f64], volatility: f64, horizon: usize) -> f64;
}

/// Dampens the raw signal of noisy instruments without ever zeroing it.
pub fn risk_scale(volatility: f64) -> f64 {
    (1.0 - volatility).max(0.1)
}

/// Weighted blend of the last step's return and the return over the weekly horizon.
pub struct BlendedMomentum {
    pub short_weight: f64,
    pub weekly_weight: f64,
}

impl Default for BlendedMomentum {
    fn default() -> Self {
        Self {
            short_weight: 0.4,
            weekly_weight: 0.6,
        }
    }
}

impl ScoringModel for BlendedMomentum {
    fn name(&self) -> &str {
        "BlendedMomentum"
    }

    fn score(&self, prices: &[f64], volatility: f64, horizon: usize) -> f64 {
        let n = prices.len();
        if n < 2 {
            return 0.0;
        }
        let last = prices[n - 1];
        let short_return = last / prices[n - 2] - 1.0;
        let steps = horizon.clamp(1, n - 1);
        let weekly_return = last / prices[n - 1 - steps] - 1.0;
        (self.short_weight * short_return + self.weekly_weight * weekly_return) * risk_scale(volatility)
    }
}

/// Least-squares slope of log prices, projected over the weekly horizon.
#[derive(Default)]
pub struct TrendSlopeMomentum;

impl ScoringModel for TrendSlopeMomentum {
    fn name(&self) -> &str {
        "TrendSlopeMomentum"
    }

    fn score(&self, prices: &[f64], volatility: f64, horizon: usize) -> f64 {
        let n = prices.len();
        if n < 2 {
            return 0.0;
        }
        let logs: Vec<f64> = prices.iter().map(|p| p.ln()).collect();
        let x_mean = (n - 1) as f64 / 2.0;
        let y_mean = logs.iter().sum::<f64>() / n as f64;
        let (mut covariance, mut spread) = (0.0, 0.0);
        for (i, y) in logs.iter().enumerate() {
            let dx = i as f64 - x_mean;
            covariance += dx * (y - y_mean);
            spread += dx * dx;
        }
        let slope = covariance / spread;
        slope * horizon as f64 * risk_scale(volatility)
    }
}

pub fn model_for(kind: ScoringModelKind) -> Box<dyn ScoringModel> {
    match kind {
        ScoringModelKind::Blended => Box::new(BlendedMomentum::default()),
        ScoringModelKind::TrendSlope => Box::new(TrendSlopeMomentum),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blended_weights_short_and_weekly_returns() {
        let prices = [100.0, 100.0, 100.0, 100.0, 100.0, 110.0];
        let score = BlendedMomentum::default().score(&prices, 0.0, 5);
        assert!((score - (0.4 * 0.1 + 0.6 * 0.1)).abs() < 1e-12);
    }

    #[test]
    fn test_blended_horizon_is_clamped_to_series() {
        let prices = [100.0, 105.0, 110.25];
        let score = BlendedMomentum::default().score(&prices, 0.0, 5);
        assert!((score - (0.4 * 0.05 + 0.6 * 0.1025)).abs() < 1e-12);
    }

    #[test]
    fn test_risk_scale_floors_at_ten_percent() {
        assert_eq!(risk_scale(0.0), 1.0);
        assert!((risk_scale(0.3) - 0.7).abs() < 1e-12);
        assert_eq!(risk_scale(2.0), 0.1);
    }

    #[test]
    fn test_trend_slope_of_geometric_growth() {
        let prices: Vec<f64> = (0..10).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let score = TrendSlopeMomentum.score(&prices, 0.0, 5);
        assert!((score - 5.0 * 1.01f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn test_models_agree_on_direction() {
        let falling = [120.0, 115.0, 111.0, 104.0, 100.0, 97.0];
        for kind in [ScoringModelKind::Blended, ScoringModelKind::TrendSlope] {
            assert!(model_for(kind).score(&falling, 0.05, 5) < 0.0);
        }
    }
}
