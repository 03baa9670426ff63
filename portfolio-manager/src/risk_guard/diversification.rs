use super::{diversification_score, Policy, RiskContext, RiskDecision};
use trading::{PlannedOrder, Side};

/// Blocks buys that would leave the portfolio below the diversification floor
/// and less diversified than before.
///
/// Buys that move a concentrated portfolio toward the floor (a first position,
/// a new name) are allowed even while the floor is not yet reached.
pub struct DiversificationPolicy {
    pub floor: f64,
}

impl Policy for DiversificationPolicy {
    fn name(&self) -> &str {
        "Diversification"
    }

    fn check(&self, order: &PlannedOrder, ctx: &RiskContext) -> RiskDecision {
        if order.side() == Side::Sell {
            return RiskDecision::Approved;
        }

        let before = diversification_score(ctx.portfolio);
        let mut after_trade = ctx.portfolio.clone();
        after_trade.apply_fill(
            order.instrument_id(),
            Side::Buy,
            order.quantity(),
            order.reference_price(),
            order.estimated_commission(),
        );
        let after = diversification_score(&after_trade);

        if after < self.floor && after < before {
            return RiskDecision::Rejected(format!(
                "Diversification would drop from {:.3} to {:.3}, below floor {:.3}",
                before, after, self.floor
            ));
        }
        RiskDecision::Approved
    }
}
