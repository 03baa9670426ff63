use serde::{Deserialize, Serialize};

fn default_max_commission_ratio() -> f64 {
    0.01
}

/// Transaction costs: a fixed fee per order plus a rate on traded value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    pub fixed_fee: f64,
    pub variable_rate: f64,
    /// Orders whose commission exceeds this fraction of their value are dropped.
    #[serde(default = "default_max_commission_ratio")]
    pub max_commission_ratio: f64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            fixed_fee: 29.0,
            variable_rate: 0.00055,
            max_commission_ratio: default_max_commission_ratio(),
        }
    }
}

impl FeeSchedule {
    pub fn commission(&self, notional: f64) -> f64 {
        if notional <= 0.0 {
            return 0.0;
        }
        self.fixed_fee + notional * self.variable_rate
    }

    /// A trade is worth doing only if its commission stays within the ratio cap.
    pub fn within_commission_ratio(&self, notional: f64, commission: f64) -> bool {
        notional > 0.0 && commission <= self.max_commission_ratio * notional
    }

    /// Largest whole quantity whose `quantity * price + commission` fits in `budget`.
    pub fn max_affordable_quantity(&self, price: f64, budget: f64) -> u64 {
        if price <= 0.0 || budget <= self.fixed_fee {
            return 0;
        }
        let mut quantity = ((budget - self.fixed_fee) / (price * (1.0 + self.variable_rate))).floor() as u64;
        // Guard against rounding pushing the total a hair over budget.
        while quantity > 0 {
            let notional = quantity as f64 * price;
            if notional + self.commission(notional) <= budget {
                break;
            }
            quantity -= 1;
        }
        quantity
    }
}

/// Hard limits applied by the risk guard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLimits {
    /// Max fraction of total valuation held in one instrument.
    pub max_single_exposure: f64,
    /// Max per-instrument volatility for a candidate to be eligible.
    pub max_volatility: f64,
    /// Holdings count whose equal-weight diversification score acts as the floor.
    pub min_distinct_holdings: usize,
    /// Minimum traded volume for a candidate to be eligible.
    pub min_volume: f64,
    /// Max distinct holdings per sector. Unclassified instruments are not counted.
    pub max_per_sector: Option<usize>,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_single_exposure: 0.25,
            max_volatility: 0.25,
            min_distinct_holdings: 3,
            min_volume: 0.0,
            max_per_sector: Some(2),
        }
    }
}

impl RiskLimits {
    /// Diversification score of `min_distinct_holdings` equally weighted holdings.
    pub fn diversification_floor(&self) -> f64 {
        if self.min_distinct_holdings <= 1 {
            return 0.0;
        }
        1.0 - 1.0 / self.min_distinct_holdings as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringModelKind {
    #[default]
    Blended,
    TrendSlope,
}

/// Tuning knobs of the momentum strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    /// Number of price points fetched per instrument.
    pub lookback_window: usize,
    /// Fewer price points than this excludes the instrument for the cycle.
    pub min_history: usize,
    /// Steps in one trading week, used to project returns.
    pub weekly_horizon: usize,
    /// Held instruments scoring below `-decay_threshold` are sold.
    pub decay_threshold: f64,
    /// Candidates must score strictly above this to be bought.
    pub min_buy_score: f64,
    /// Also sell holdings whose unrealized return reached the weekly target.
    pub take_profit_at_target: bool,
    pub model: ScoringModelKind,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            lookback_window: 20,
            min_history: 6,
            weekly_horizon: 5,
            decay_threshold: 0.02,
            min_buy_score: 0.0,
            take_profit_at_target: false,
            model: ScoringModelKind::Blended,
        }
    }
}
