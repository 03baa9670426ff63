use super::{Policy, RiskContext, RiskDecision, SectorMap};
use trading::{PlannedOrder, Side};

/// Caps the number of distinct holdings per sector.
///
/// Only buys that open a new name are checked; topping up an existing
/// holding is left to the exposure cap. Instruments without a known sector
/// are never counted or blocked.
pub struct SectorConcentrationPolicy {
    pub max_per_sector: usize,
}

impl Policy for SectorConcentrationPolicy {
    fn name(&self) -> &str {
        "SectorConcentration"
    }

    fn check(&self, order: &PlannedOrder, ctx: &RiskContext) -> RiskDecision {
        if order.side() == Side::Sell || ctx.portfolio.quantity(order.instrument_id()) > 0 {
            return RiskDecision::Approved;
        }
        let Some(sector) = ctx.sectors.get(order.instrument_id()) else {
            return RiskDecision::Approved;
        };

        let held = holdings_in(ctx, sector);
        if held >= self.max_per_sector {
            return RiskDecision::Rejected(format!(
                "Sector {} already holds {} of at most {} names",
                sector, held, self.max_per_sector
            ));
        }
        RiskDecision::Approved
    }
}

fn holdings_in(ctx: &RiskContext, sector: &str) -> usize {
    ctx.portfolio
        .positions()
        .filter(|p| ctx.sectors.get(p.instrument_id()).map(String::as_str) == Some(sector))
        .count()
}
