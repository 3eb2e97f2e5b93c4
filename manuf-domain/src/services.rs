use crate::industry_model::{Activity, BlueprintId, MarketOrder, RegionId, StationId, TypeId};
use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};

/// One raw-material line of a blueprint/activity, quantity per single run.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MaterialRequirement {
    pub type_id: TypeId,
    pub type_name: String,
    pub quantity: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct BlueprintInfo {
    pub blueprint_id: BlueprintId,
    pub blueprint_name: String,
    /// Whether the blueprint's manufacturing activity is actually usable.
    pub buildable: bool,
}

/// Read-only lookup into the static game reference data. `Ok(None)` and empty
/// lists mean "no further expansion possible", never an error.
#[automock]
#[async_trait]
pub trait StaticDataService: Send + Sync {
    /// Raw materials of the blueprint for which a manufacturing blueprint exists.
    async fn buildable_materials(&self, blueprint_id: BlueprintId, activity: Activity) -> anyhow::Result<Vec<MaterialRequirement>>;
    /// Terminal raw materials of the blueprint (no manufacturing blueprint).
    async fn unbuildable_materials(&self, blueprint_id: BlueprintId, activity: Activity) -> anyhow::Result<Vec<MaterialRequirement>>;
    async fn produced_per_run(&self, blueprint_id: BlueprintId, activity: Activity) -> anyhow::Result<u64>;
    async fn base_production_seconds(&self, blueprint_id: BlueprintId, activity: Activity) -> anyhow::Result<u64>;
    async fn blueprint_for_product(&self, type_id: TypeId) -> anyhow::Result<Option<BlueprintInfo>>;
    async fn type_name(&self, type_id: TypeId) -> anyhow::Result<Option<String>>;
}

/// Resolves stations to regions and knows the configured market hubs.
#[automock]
#[async_trait]
pub trait LocationService: Send + Sync {
    async fn region_of_station(&self, station_id: StationId) -> anyhow::Result<Option<RegionId>>;
    async fn station_name(&self, station_id: StationId) -> anyhow::Result<String>;
    async fn market_hub_stations(&self) -> anyhow::Result<Vec<StationId>>;
    async fn market_hub_regions(&self) -> anyhow::Result<Vec<RegionId>>;
}

/// Paginated access to live orders of one trade region. An empty page marks
/// the end of the book.
#[automock]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_orders_page(&self, region_id: RegionId, page: u32) -> anyhow::Result<Vec<MarketOrder>>;
}

/// Current on-hand quantity per material type. Read-only from this engine's
/// perspective.
#[automock]
#[async_trait]
pub trait InventoryService: Send + Sync {
    async fn on_hand(&self, type_id: TypeId) -> anyhow::Result<u64>;
}
