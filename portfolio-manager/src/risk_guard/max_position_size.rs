use super::{exceeds_exposure, Policy, RiskContext, RiskDecision};
use trading::{PlannedOrder, Side};

/// Enforces that no single position exceeds a fixed fraction of total valuation.
/// Sells only ever reduce exposure and are always approved.
pub struct MaxPositionSizePolicy {
    pub max_percent: f64,
}

impl Policy for MaxPositionSizePolicy {
    fn name(&self) -> &str {
        "MaxPositionSize"
    }

    fn check(&self, order: &PlannedOrder, ctx: &RiskContext) -> RiskDecision {
        if order.side() == Side::Sell {
            return RiskDecision::Approved;
        }
        if ctx.valuation <= 0.0 {
            return RiskDecision::Rejected("Zero or negative valuation".to_string());
        }

        let held = ctx.portfolio.quantity(order.instrument_id());
        let price = order.reference_price();
        if exceeds_exposure(held, price, order.quantity(), self.max_percent, ctx.valuation) {
            return RiskDecision::Rejected(format!(
                "Position {} value {:.2} exceeds limit {:.2} ({:.1}% of valuation {:.2})",
                order.instrument_id(),
                (held + order.quantity()) as f64 * price,
                self.max_percent * ctx.valuation,
                self.max_percent * 100.0,
                ctx.valuation
            ));
        }

        RiskDecision::Approved
    }
}
