use crate::industry_model::{MarketOrder, MarketStat, StationId, TypeId};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use ordered_float::OrderedFloat;
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Price achievable for a meaningful trade size on one side of the book.
///
/// Orders are walked best-price first (ascending for sells, descending for
/// buys) until ceil(5%) of the side's total remaining volume has been
/// consumed; the last fill is clipped so the target is never exceeded. The
/// result is the volume-weighted average over the consumed fills, or zero
/// when the side is empty.
pub fn liquidity_weighted_average(side: OrderSide, orders: &[MarketOrder]) -> (f64, u64) {
    let candidates = orders
        .iter()
        .filter(|order| match side {
            OrderSide::Buy => order.is_buy_order,
            OrderSide::Sell => !order.is_buy_order,
        })
        .collect_vec();

    let sorted = match side {
        OrderSide::Sell => candidates
            .into_iter()
            .sorted_by_key(|order| OrderedFloat(order.price))
            .collect_vec(),
        OrderSide::Buy => candidates
            .into_iter()
            .sorted_by_key(|order| OrderedFloat(-order.price))
            .collect_vec(),
    };

    let total_volume: u64 = sorted.iter().map(|order| order.volume_remain).sum();
    if total_volume == 0 {
        return (0.0, 0);
    }

    let target_volume = (total_volume as f64 * 0.05).ceil() as u64;

    let mut accumulated_value = 0.0;
    let mut accumulated_volume = 0u64;
    for order in sorted {
        if accumulated_volume >= target_volume {
            break;
        }
        let fill = order.volume_remain.min(target_volume - accumulated_volume);
        accumulated_value += order.price * fill as f64;
        accumulated_volume += fill;
    }

    if accumulated_volume == 0 {
        (0.0, total_volume)
    } else {
        (accumulated_value / accumulated_volume as f64, total_volume)
    }
}

/// Derives the cached per-(type, station) statistic from a region order book.
pub fn compute_market_stat(type_id: TypeId, station_id: StationId, region_orders: &[MarketOrder], computed_at: DateTime<Utc>) -> MarketStat {
    let station_orders = region_orders
        .iter()
        .filter(|order| order.type_id == type_id && order.station_id == station_id)
        .cloned()
        .collect_vec();

    let (avg_sell_price, sell_volume) = liquidity_weighted_average(OrderSide::Sell, &station_orders);
    let (avg_buy_price, buy_volume) = liquidity_weighted_average(OrderSide::Buy, &station_orders);

    MarketStat {
        type_id,
        station_id,
        avg_sell_price,
        sell_volume,
        avg_buy_price,
        buy_volume,
        computed_at,
    }
}
