//! Risk model and the policies that gate buy orders.
//!
//! The free functions are pure: same inputs, same answer, no logging. The
//! `RiskGuard` runs a list of `Policy` objects over a proposed order and the
//! pro-forma portfolio it would be applied to.

use std::collections::BTreeMap;
use trading::{CandidateScore, Instrument, InstrumentId, PlannedOrder, Portfolio, RiskError, RiskLimits};

pub mod diversification;
pub mod max_position_size;
pub mod sector;

use diversification::DiversificationPolicy;
use max_position_size::MaxPositionSizePolicy;
use sector::SectorConcentrationPolicy;

/// Known sector of each instrument. Instruments missing from the map are unclassified.
pub type SectorMap = BTreeMap<InstrumentId, String>;

/// Sectors carried by scored candidates.
pub fn sector_map(candidates: &[CandidateScore]) -> SectorMap {
    candidates
        .iter()
        .filter_map(|c| c.sector.clone().map(|s| (c.instrument_id.clone(), s)))
        .collect()
}

/// Sample standard deviation of simple returns over the instrument's price series.
///
/// # Arguments
///
/// * `instrument` - Snapshot whose `price_series()` (history then last price) is used.
/// * `min_history` - Minimum number of price points. Never less than 3, the
///   fewest that yield two returns.
///
/// # Returns
///
/// * `Ok(f64)` - Non-negative volatility.
/// * `Err(RiskError::InsufficientHistory)` - Too few price points.
/// * `Err(RiskError::InvalidPrice)` - A price is zero, negative or not finite.
pub fn volatility(instrument: &Instrument, min_history: usize) -> Result<f64, RiskError> {
    let series = instrument.price_series();
    let required = min_history.max(3);
    if series.len() < required {
        return Err(RiskError::InsufficientHistory {
            instrument: instrument.id().clone(),
            required,
            available: series.len(),
        });
    }
    if let Some(&bad) = series.iter().find(|p| !p.is_finite() || **p <= 0.0) {
        return Err(RiskError::InvalidPrice {
            instrument: instrument.id().clone(),
            price: bad,
        });
    }

    let returns: Vec<f64> = series.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Ok(variance.max(0.0).sqrt())
}

/// `1 - HHI` over position market values, in `[0, 1]`.
///
/// An empty portfolio, or one whose positions are worth nothing, scores 0.
pub fn diversification_score(portfolio: &Portfolio) -> f64 {
    let total = portfolio.positions_value();
    if total <= 0.0 {
        return 0.0;
    }
    let hhi: f64 = portfolio
        .positions()
        .map(|p| {
            let weight = p.market_value() / total;
            weight * weight
        })
        .sum();
    (1.0 - hhi).clamp(0.0, 1.0)
}

/// True if holding `held + proposed` units at `price` would be worth more than
/// `max_exposure * valuation`. Monotonic in `proposed`.
pub fn exceeds_exposure(held: u64, price: f64, proposed: u64, max_exposure: f64, valuation: f64) -> bool {
    let post_trade_value = (held + proposed) as f64 * price;
    post_trade_value > max_exposure * valuation
}

/// True if buying `proposed_quantity` more of `instrument` would push that
/// position past `limits.max_single_exposure` of the portfolio's total valuation.
///
/// The portfolio must already be marked against the snapshot `instrument` comes from.
pub fn exceeds_exposure_limit(
    portfolio: &Portfolio,
    instrument: &Instrument,
    proposed_quantity: u64,
    limits: &RiskLimits,
) -> bool {
    exceeds_exposure(
        portfolio.quantity(instrument.id()),
        instrument.last_price(),
        proposed_quantity,
        limits.max_single_exposure,
        portfolio.total_valuation(),
    )
}

/// Largest additional quantity that keeps the position within the exposure cap.
pub fn exposure_headroom(held: u64, price: f64, max_exposure: f64, valuation: f64) -> u64 {
    if price <= 0.0 || valuation <= 0.0 {
        return 0;
    }
    let cap = (max_exposure * valuation / price).floor().max(0.0) as u64;
    let mut headroom = cap.saturating_sub(held);
    while headroom > 0 && exceeds_exposure(held, price, headroom, max_exposure, valuation) {
        headroom -= 1;
    }
    headroom
}

/// Value-weighted average volatility of the held positions.
///
/// Positions without a volatility estimate (excluded this cycle) carry no weight.
pub fn portfolio_volatility(portfolio: &Portfolio, volatilities: &BTreeMap<InstrumentId, f64>) -> f64 {
    let mut weighted = 0.0;
    let mut total = 0.0;
    for position in portfolio.positions() {
        if let Some(vol) = volatilities.get(position.instrument_id()) {
            weighted += position.market_value() * vol;
            total += position.market_value();
        }
    }
    if total <= 0.0 {
        0.0
    } else {
        weighted / total
    }
}

/// Market value held per sector. Unclassified holdings are grouped under `"unknown"`.
pub fn exposure_by_sector(portfolio: &Portfolio, sectors: &SectorMap) -> BTreeMap<String, f64> {
    let mut exposure = BTreeMap::new();
    for position in portfolio.positions() {
        let sector = sectors
            .get(position.instrument_id())
            .map(String::as_str)
            .unwrap_or("unknown");
        *exposure.entry(sector.to_string()).or_insert(0.0) += position.market_value();
    }
    exposure
}

#[derive(Debug, PartialEq)]
pub enum RiskDecision {
    Approved,
    Rejected(String),
}

/// Context passed to policies to make decisions.
pub struct RiskContext<'a> {
    /// Portfolio the order would be applied to, including earlier orders of the plan.
    pub portfolio: &'a Portfolio,
    pub limits: &'a RiskLimits,
    /// Total valuation at cycle start. Exposure caps are fractions of this.
    pub valuation: f64,
    pub sectors: &'a SectorMap,
}

pub trait Policy: Send + Sync {
    fn name(&self) -> &str;
    fn check(&self, order: &PlannedOrder, ctx: &RiskContext) -> RiskDecision;
}

pub struct RiskGuard {
    policies: Vec<Box<dyn Policy>>,
}

impl Default for RiskGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl RiskGuard {
    pub fn new() -> Self {
        Self {
            policies: Vec::new(),
        }
    }

    /// Exposure cap, then the diversification floor, then the per-sector cap if set.
    pub fn for_limits(limits: &RiskLimits) -> Self {
        let mut guard = Self::new();
        guard.add_policy(Box::new(MaxPositionSizePolicy {
            max_percent: limits.max_single_exposure,
        }));
        guard.add_policy(Box::new(DiversificationPolicy {
            floor: limits.diversification_floor(),
        }));
        if let Some(max_per_sector) = limits.max_per_sector {
            guard.add_policy(Box::new(SectorConcentrationPolicy { max_per_sector }));
        }
        guard
    }

    pub fn add_policy(&mut self, policy: Box<dyn Policy>) {
        self.policies.push(policy);
    }

    pub fn check(&self, order: &PlannedOrder, ctx: &RiskContext) -> RiskDecision {
        for policy in &self.policies {
            if let RiskDecision::Rejected(reason) = policy.check(order, ctx) {
                log::debug!(
                    "{} {} x{} rejected by {}: {}",
                    order.side(),
                    order.instrument_id(),
                    order.quantity(),
                    policy.name(),
                    reason
                );
                return RiskDecision::Rejected(format!("{}: {}", policy.name(), reason));
            }
        }
        RiskDecision::Approved
    }
}
