use anyhow::Result;
use manuf_domain::market::{liquidity_weighted_average, OrderSide};
use manuf_domain::{MarketProfile, ProductionRoute, SupplyPlan};
use tracing::debug;

use crate::market_estimator::MarketPriceEstimator;

/// Rolls procurement cost and the estimated sale revenue of the root-level
/// products into one profitability summary. Revenue is priced across every
/// cached region at the liquidity-weighted sell and buy averages.
pub fn calculate_market_profile(routes: &[ProductionRoute], supply_plan: &SupplyPlan, estimator: &MarketPriceEstimator) -> Result<MarketProfile> {
    let material_cost = supply_plan.total_cost();

    let mut sell_order_revenue = 0.0;
    let mut buy_order_revenue = 0.0;

    for route in routes.iter().filter(|route| route.is_root()) {
        let orders = estimator.orders_for_type(route.material_type_id)?;
        let (sell_average, _) = liquidity_weighted_average(OrderSide::Sell, &orders);
        let (buy_average, _) = liquidity_weighted_average(OrderSide::Buy, &orders);

        let produced = route.produced() as f64;
        debug!(
            "Pricing {} produced {} at sell {:.2} / buy {:.2}",
            route.material_name, produced, sell_average, buy_average
        );

        sell_order_revenue += sell_average * produced;
        buy_order_revenue += buy_average * produced;
    }

    Ok(MarketProfile {
        material_cost,
        sell_order_revenue,
        buy_order_revenue,
    })
}
