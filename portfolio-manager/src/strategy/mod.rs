//! Momentum scoring, ranking and the tentative trade proposal.

use crate::risk_guard::{self, exposure_headroom, sector_map, RiskContext, RiskDecision, RiskGuard};
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use trading::{
    CandidateScore, FeeSchedule, Instrument, InstrumentId, MarketSnapshot, OrderPlan, OrderRationale,
    PlannedOrder, Portfolio, RiskError, RiskLimits, Side, StrategyParams, WeeklyTarget,
};

pub mod models;

pub use models::{model_for, BlendedMomentum, ScoringModel, TrendSlopeMomentum};


/// Scores of one snapshot, split into usable candidates and excluded instruments.
#[derive(Debug, Default)]
pub struct ScoredUniverse {
    pub scores: Vec<CandidateScore>,
    pub excluded: Vec<RiskError>,
}

impl ScoredUniverse {
    pub fn excluded_ids(&self) -> Vec<InstrumentId> {
        self.excluded.iter().map(|e| e.instrument().clone()).collect()
    }

    pub fn volatilities(&self) -> BTreeMap<InstrumentId, f64> {
        self.scores
            .iter()
            .map(|s| (s.instrument_id.clone(), s.volatility))
            .collect()
    }
}

pub struct MomentumStrategy {
    model: Box<dyn ScoringModel>,
    params: StrategyParams,
    limits: RiskLimits,
    fees: FeeSchedule,
}

impl MomentumStrategy {
    /// Builds the strategy with the model selected in `params`.
    pub fn new(params: StrategyParams, limits: RiskLimits, fees: FeeSchedule) -> Self {
        Self::with_model(model_for(params.model), params, limits, fees)
    }

    pub fn with_model(
        model: Box<dyn ScoringModel>,
        params: StrategyParams,
        limits: RiskLimits,
        fees: FeeSchedule,
    ) -> Self {
        Self {
            model,
            params,
            limits,
            fees,
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Scores one instrument.
    ///
    /// # Returns
    ///
    /// * `Ok(CandidateScore)` - `eligible` is false when the instrument is too
    ///   volatile or too thinly traded to be bought.
    /// * `Err(RiskError)` - Not enough usable history; the instrument is
    ///   excluded for this cycle.
    pub fn score(&self, instrument: &Instrument) -> Result<CandidateScore, RiskError> {
        let volatility = risk_guard::volatility(instrument, self.params.min_history)?;
        let series = instrument.price_series();
        let score = self.model.score(&series, volatility, self.params.weekly_horizon);
        let eligible = instrument.last_price() > 0.0
            && score.is_finite()
            && volatility <= self.limits.max_volatility
            && instrument.volume() >= self.limits.min_volume;

        Ok(CandidateScore {
            instrument_id: instrument.id().clone(),
            score,
            volatility,
            price: instrument.last_price(),
            eligible,
            sector: instrument.sector().map(str::to_string),
        })
    }

    /// Scores every instrument of the snapshot. Instrument-level failures are
    /// collected, never propagated.
    pub fn score_snapshot(&self, snapshot: &MarketSnapshot) -> ScoredUniverse {
        let mut universe = ScoredUniverse::default();
        for instrument in snapshot.iter() {
            match self.score(instrument) {
                Ok(score) => {
                    debug!(
                        "{} scored {:.5} (vol {:.4}, eligible {})",
                        score.instrument_id, score.score, score.volatility, score.eligible
                    );
                    universe.scores.push(score);
                }
                Err(e) => {
                    warn!("Excluding {}: {}", e.instrument(), e);
                    universe.excluded.push(e);
                }
            }
        }
        universe
    }

    /// Orders candidates by descending score, then ascending volatility, then id.
    pub fn rank_candidates(mut scores: Vec<CandidateScore>) -> Vec<CandidateScore> {
        scores.sort_by(|a, b| a.rank_cmp(b));
        scores
    }

    /// Builds the tentative plan for this cycle.
    ///
    /// Sells come first: held instruments whose momentum decayed below
    /// `-decay_threshold` (and, if enabled, those that reached the weekly
    /// target) are sold in full so their proceeds fund the buys. Buys then
    /// walk the ranking and allocate toward the profit the weekly target still
    /// requires, each sized at `remaining / score`, capped by cash and by the
    /// exposure limit, and screened by the risk guard (exposure, diversification
    /// and sector caps) against the pro-forma portfolio.
    ///
    /// `portfolio` must already be marked against the snapshot the ranking
    /// was computed from.
    pub fn propose_trades(
        &self,
        ranked: &[CandidateScore],
        portfolio: &Portfolio,
        target: &WeeklyTarget,
        limits: &RiskLimits,
    ) -> OrderPlan {
        let by_id: BTreeMap<&InstrumentId, &CandidateScore> =
            ranked.iter().map(|c| (&c.instrument_id, c)).collect();
        let valuation = portfolio.total_valuation();
        let mut plan = OrderPlan::default();
        let mut pro_forma = portfolio.clone();
        let mut selling = BTreeSet::new();

        for position in portfolio.positions() {
            let id = position.instrument_id();
            let Some(candidate) = by_id.get(id) else {
                continue;
            };
            let rationale = if candidate.score < -self.params.decay_threshold {
                OrderRationale::MomentumDecay
            } else if self.params.take_profit_at_target
                && position.unrealized_return() >= target.growth_target()
            {
                OrderRationale::TargetReached
            } else {
                continue;
            };

            let quantity = position.quantity();
            let notional = quantity as f64 * candidate.price;
            let order = PlannedOrder::new(
                id.clone(),
                Side::Sell,
                quantity,
                candidate.price,
                self.fees.commission(notional),
                rationale,
            );
            info!(
                "Proposing SELL {} x{} ({:?}, score {:.5})",
                id, quantity, rationale, candidate.score
            );
            pro_forma.apply_fill(id, Side::Sell, quantity, candidate.price, order.estimated_commission());
            selling.insert(id.clone());
            plan.push(order);
        }

        let carried: f64 = portfolio
            .positions()
            .filter(|p| !selling.contains(p.instrument_id()))
            .map(|p| {
                let score = by_id.get(p.instrument_id()).map(|c| c.score).unwrap_or(0.0);
                p.market_value() * score.max(0.0)
            })
            .sum();
        let mut remaining = target.growth_target() * valuation - carried;
        debug!(
            "Weekly target needs {:.2} profit on {:.2}; holdings carry {:.2}",
            target.growth_target() * valuation,
            valuation,
            carried
        );

        let guard = RiskGuard::for_limits(limits);
        let sectors = sector_map(ranked);
        for candidate in ranked {
            if remaining <= 0.0 {
                break;
            }
            let id = &candidate.instrument_id;
            if !candidate.eligible
                || candidate.score <= self.params.min_buy_score
                || candidate.score <= 0.0
                || candidate.price <= 0.0
                || selling.contains(id)
            {
                continue;
            }

            let price = candidate.price;
            let wanted = (remaining / candidate.score / price).ceil() as u64;
            let affordable = self.fees.max_affordable_quantity(price, pro_forma.cash());
            let headroom =
                exposure_headroom(pro_forma.quantity(id), price, limits.max_single_exposure, valuation);
            let quantity = wanted.min(affordable).min(headroom);
            if quantity == 0 {
                debug!(
                    "Skipping {}: wanted {}, affordable {}, exposure headroom {}",
                    id, wanted, affordable, headroom
                );
                continue;
            }

            let notional = quantity as f64 * price;
            let order = PlannedOrder::new(
                id.clone(),
                Side::Buy,
                quantity,
                price,
                self.fees.commission(notional),
                OrderRationale::Momentum,
            );
            let ctx = RiskContext {
                portfolio: &pro_forma,
                limits,
                valuation,
                sectors: &sectors,
            };
            if let RiskDecision::Rejected(reason) = guard.check(&order, &ctx) {
                info!("Not buying {}: {}", id, reason);
                continue;
            }

            info!(
                "Proposing BUY {} x{} @ {:.2} (score {:.5})",
                id, quantity, price, candidate.score
            );
            pro_forma.apply_fill(id, Side::Buy, quantity, price, order.estimated_commission());
            remaining -= notional * candidate.score;
            plan.push(order);
        }

        plan
    }
}
