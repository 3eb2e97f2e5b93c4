use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use strum::Display;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct TypeId(pub u32);

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct BlueprintId(pub u32);

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct StationId(pub u64);

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct RegionId(pub u32);

impl Display for TypeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for RegionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for StationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Display)]
pub enum Activity {
    Manufacturing,
    Invention,
}

impl Activity {
    pub fn activity_id(&self) -> u32 {
        match self {
            Activity::Manufacturing => 1,
            Activity::Invention => 8,
        }
    }
}

pub const MAX_MATERIAL_EFFICIENCY: u8 = 10;
pub const MAX_TIME_EFFICIENCY: u8 = 20;

/// A manufacturing or invention request. Root orders come from the caller;
/// child orders are spawned during route expansion and carry the blueprint id
/// of the order that demanded them.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub blueprint_id: BlueprintId,
    pub activity: Activity,
    pub product_type_id: TypeId,
    pub product_name: String,
    pub copies: u32,
    pub runs: u32,
    pub material_efficiency: u8,
    pub time_efficiency: u8,
    pub parent_blueprint_id: Option<BlueprintId>,
}

impl Order {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        blueprint_id: BlueprintId,
        activity: Activity,
        product_type_id: TypeId,
        product_name: String,
        copies: u32,
        runs: u32,
        material_efficiency: u8,
        time_efficiency: u8,
        parent_blueprint_id: Option<BlueprintId>,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            material_efficiency <= MAX_MATERIAL_EFFICIENCY,
            "material efficiency {} out of range 0..={}",
            material_efficiency,
            MAX_MATERIAL_EFFICIENCY
        );
        anyhow::ensure!(
            time_efficiency <= MAX_TIME_EFFICIENCY && time_efficiency % 2 == 0,
            "time efficiency {} must be an even value in 0..={}",
            time_efficiency,
            MAX_TIME_EFFICIENCY
        );

        Ok(Order {
            blueprint_id,
            activity,
            product_type_id,
            product_name,
            copies,
            runs,
            material_efficiency,
            time_efficiency,
            parent_blueprint_id,
        })
    }

    pub fn quantity(&self) -> u64 {
        self.copies as u64 * self.runs as u64
    }

    pub fn is_root(&self) -> bool {
        self.parent_blueprint_id.is_none()
    }
}

/// Key of a consolidated production route. Two orders for the same material
/// only share a route when they also share the efficiency levels.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct RouteKey {
    pub material_type_id: TypeId,
    pub material_efficiency: u8,
    pub time_efficiency: u8,
}

/// Visited-set key used by the route builder: (parent blueprint or 0, blueprint).
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct VisitKey(pub BlueprintId, pub BlueprintId);

impl VisitKey {
    pub fn of(order: &Order) -> Self {
        VisitKey(order.parent_blueprint_id.unwrap_or(BlueprintId(0)), order.blueprint_id)
    }
}

/// One consolidated manufacturing step of a batch.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ProductionRoute {
    pub material_type_id: TypeId,
    pub material_name: String,
    pub blueprint_id: BlueprintId,
    pub blueprint_name: String,
    pub requisitioned: u64,
    /// The authoritative order driving the run count after consolidation.
    pub order: Order,
    /// Every order that contributed demand to this route, for auditing.
    pub contributing_orders: Vec<Order>,
    pub produced_per_run: u64,
    pub inventory: u64,
    pub duration_seconds: u64,
}

impl ProductionRoute {
    pub fn key(&self) -> RouteKey {
        RouteKey {
            material_type_id: self.material_type_id,
            material_efficiency: self.order.material_efficiency,
            time_efficiency: self.order.time_efficiency,
        }
    }

    pub fn produced(&self) -> u64 {
        self.order.runs as u64 * self.order.copies as u64 * self.produced_per_run
    }

    pub fn is_root(&self) -> bool {
        self.order.is_root()
    }
}

/// A live order snapshot as delivered by the external market data source.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct MarketOrder {
    pub order_id: u64,
    pub type_id: TypeId,
    pub station_id: StationId,
    pub is_buy_order: bool,
    pub price: f64,
    pub volume_remain: u64,
    pub volume_total: u64,
    pub issued: DateTime<Utc>,
}

/// Liquidity-weighted summary for one (type, station) pair.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct MarketStat {
    pub type_id: TypeId,
    pub station_id: StationId,
    pub avg_sell_price: f64,
    pub sell_volume: u64,
    pub avg_buy_price: f64,
    pub buy_volume: u64,
    pub computed_at: DateTime<Utc>,
}

impl MarketStat {
    pub fn zero(type_id: TypeId, station_id: StationId, computed_at: DateTime<Utc>) -> Self {
        MarketStat {
            type_id,
            station_id,
            avg_sell_price: 0.0,
            sell_volume: 0,
            avg_buy_price: 0.0,
            buy_volume: 0,
            computed_at,
        }
    }
}

/// One terminal (non-buildable) material requirement of a batch.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct BomLineItem {
    pub type_id: TypeId,
    pub type_name: String,
    pub requisitioned: u64,
    pub inventory: u64,
    pub market_stats: Vec<MarketStat>,
}

impl BomLineItem {
    pub fn net_requisitioned(&self) -> u64 {
        self.requisitioned.saturating_sub(self.inventory)
    }

    pub fn lowest_sell_price(&self) -> Option<f64> {
        self.market_stats
            .iter()
            .filter(|stat| stat.sell_volume > 0)
            .map(|stat| stat.avg_sell_price)
            .min_by(|a, b| a.total_cmp(b))
    }

    pub fn highest_buy_price(&self) -> Option<f64> {
        self.market_stats
            .iter()
            .filter(|stat| stat.buy_volume > 0)
            .map(|stat| stat.avg_buy_price)
            .max_by(|a, b| a.total_cmp(b))
    }
}

/// A planned purchase against one concrete sell order.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PurchaseRequisition {
    pub station_id: StationId,
    pub type_id: TypeId,
    pub type_name: String,
    pub quantity: u64,
    pub unit_price: f64,
    pub source_order_id: u64,
}

impl PurchaseRequisition {
    pub fn estimated_cost(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

/// All requisitions planned against one station.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ProcurementPlan {
    pub station_id: StationId,
    pub station_name: String,
    pub requisitions: Vec<PurchaseRequisition>,
}

impl ProcurementPlan {
    pub fn total_volume(&self) -> u64 {
        self.requisitions.iter().map(|req| req.quantity).sum()
    }

    pub fn estimated_cost(&self) -> f64 {
        self.requisitions.iter().map(|req| req.estimated_cost()).sum()
    }

    /// One "quantity x name" line per material, for display.
    pub fn import_summary(&self) -> Vec<String> {
        self.requisitions
            .iter()
            .into_group_map_by(|req| (req.type_id, req.type_name.clone()))
            .into_iter()
            .map(|((_, type_name), reqs)| {
                let total: u64 = reqs.iter().map(|req| req.quantity).sum();
                format!("{} x {}", total, type_name)
            })
            .sorted()
            .collect_vec()
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct SupplyPlan {
    pub procurement_plans: Vec<ProcurementPlan>,
}

impl SupplyPlan {
    pub fn total_cost(&self) -> f64 {
        self.procurement_plans.iter().map(|plan| plan.estimated_cost()).sum()
    }

    pub fn total_volume(&self) -> u64 {
        self.procurement_plans.iter().map(|plan| plan.total_volume()).sum()
    }
}

/// Procurement cost vs. estimated sale revenue of the finished products.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct MarketProfile {
    pub material_cost: f64,
    pub sell_order_revenue: f64,
    pub buy_order_revenue: f64,
}

impl MarketProfile {
    pub fn sell_order_profit(&self) -> f64 {
        self.sell_order_revenue - self.material_cost
    }

    pub fn buy_order_profit(&self) -> f64 {
        self.buy_order_revenue - self.material_cost
    }
}

/// Aggregate result of one manufacturing batch calculation. Never persisted.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ManufBatch {
    pub production_routes: Vec<ProductionRoute>,
    pub bill_of_materials: Vec<BomLineItem>,
    pub supply_plan: SupplyPlan,
    pub market_profile: MarketProfile,
    pub production_summary: Vec<String>,
    pub bom_summary: Vec<String>,
    pub stock: HashMap<TypeId, u64>,
}
