use crate::industry_model::{MarketOrder, PurchaseRequisition, TypeId};
use itertools::Itertools;
use ordered_float::OrderedFloat;

/// Greedily fills a needed quantity from candidate sell orders, cheapest
/// first. Returns one requisition per consumed order. Insufficient liquidity
/// is not an error; the shortfall is simply left unfilled.
pub fn fill_requisitions(type_id: TypeId, type_name: &str, needed: u64, candidate_orders: &[MarketOrder]) -> Vec<PurchaseRequisition> {
    let sorted_sell_orders = candidate_orders
        .iter()
        .filter(|order| !order.is_buy_order && order.type_id == type_id)
        .sorted_by_key(|order| OrderedFloat(order.price))
        .collect_vec();

    let mut remaining = needed;
    let mut requisitions = Vec::new();
    for order in sorted_sell_orders {
        if remaining == 0 {
            break;
        }
        let quantity = remaining.min(order.volume_remain);
        if quantity == 0 {
            continue;
        }
        requisitions.push(PurchaseRequisition {
            station_id: order.station_id,
            type_id,
            type_name: type_name.to_string(),
            quantity,
            unit_price: order.price,
            source_order_id: order.order_id,
        });
        remaining -= quantity;
    }

    requisitions
}
