use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::BatchError;
use async_trait::async_trait;
use chrono::Utc;
use itertools::Itertools;
use manuf_domain::services::{BlueprintInfo, InventoryService, LocationService, MarketDataSource, MaterialRequirement, StaticDataService};
use manuf_domain::{Activity, BlueprintId, MarketOrder, RegionId, StationId, TypeId};

#[derive(Debug, Clone)]
pub struct BlueprintFixture {
    pub blueprint_id: BlueprintId,
    pub blueprint_name: String,
    pub product_type_id: TypeId,
    pub product_name: String,
    pub produced_per_run: u64,
    pub base_seconds: u64,
    pub buildable: bool,
    pub materials: Vec<MaterialRequirement>,
}

pub fn blueprint(blueprint_id: u32, product_type_id: u32, product_name: &str, produced_per_run: u64, base_seconds: u64) -> BlueprintFixture {
    BlueprintFixture {
        blueprint_id: BlueprintId(blueprint_id),
        blueprint_name: format!("{} Blueprint", product_name),
        product_type_id: TypeId(product_type_id),
        product_name: product_name.to_string(),
        produced_per_run,
        base_seconds,
        buildable: true,
        materials: vec![],
    }
}

impl BlueprintFixture {
    pub fn with_material(mut self, type_id: u32, type_name: &str, quantity: u64) -> Self {
        self.materials.push(MaterialRequirement {
            type_id: TypeId(type_id),
            type_name: type_name.to_string(),
            quantity,
        });
        self
    }

    pub fn not_buildable(mut self) -> Self {
        self.buildable = false;
        self
    }
}

/// Static game data held in plain maps, for multi-level routing scenarios
/// that would be painful to express with per-call mock expectations.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStaticData {
    pub blueprints: HashMap<BlueprintId, BlueprintFixture>,
    pub blueprint_by_product: HashMap<TypeId, BlueprintId>,
    pub type_names: HashMap<TypeId, String>,
}

impl InMemoryStaticData {
    pub fn add(&mut self, fixture: BlueprintFixture) {
        self.blueprint_by_product.insert(fixture.product_type_id, fixture.blueprint_id);
        self.type_names.insert(fixture.product_type_id, fixture.product_name.clone());
        self.blueprints.insert(fixture.blueprint_id, fixture);
    }

    pub fn add_type_name(&mut self, type_id: u32, name: &str) {
        self.type_names.insert(TypeId(type_id), name.to_string());
    }

    /// Registers a product -> blueprint mapping without blueprint data behind
    /// it, to simulate inconsistent reference data.
    pub fn add_product_mapping(&mut self, product_type_id: u32, blueprint_id: u32) {
        self.blueprint_by_product.insert(TypeId(product_type_id), BlueprintId(blueprint_id));
    }

    fn fixture(&self, blueprint_id: BlueprintId) -> anyhow::Result<&BlueprintFixture> {
        self.blueprints
            .get(&blueprint_id)
            .ok_or_else(|| anyhow::Error::new(BatchError::DataNotFound(format!("blueprint {:?}", blueprint_id))))
    }

    fn is_buildable_material(&self, material: &MaterialRequirement) -> bool {
        self.blueprint_by_product.contains_key(&material.type_id)
    }
}

#[async_trait]
impl StaticDataService for InMemoryStaticData {
    async fn buildable_materials(&self, blueprint_id: BlueprintId, _activity: Activity) -> anyhow::Result<Vec<MaterialRequirement>> {
        Ok(self
            .fixture(blueprint_id)?
            .materials
            .iter()
            .filter(|material| self.is_buildable_material(material))
            .cloned()
            .collect_vec())
    }

    async fn unbuildable_materials(&self, blueprint_id: BlueprintId, _activity: Activity) -> anyhow::Result<Vec<MaterialRequirement>> {
        Ok(self
            .fixture(blueprint_id)?
            .materials
            .iter()
            .filter(|material| !self.is_buildable_material(material))
            .cloned()
            .collect_vec())
    }

    async fn produced_per_run(&self, blueprint_id: BlueprintId, _activity: Activity) -> anyhow::Result<u64> {
        Ok(self.fixture(blueprint_id)?.produced_per_run)
    }

    async fn base_production_seconds(&self, blueprint_id: BlueprintId, _activity: Activity) -> anyhow::Result<u64> {
        Ok(self.fixture(blueprint_id)?.base_seconds)
    }

    async fn blueprint_for_product(&self, type_id: TypeId) -> anyhow::Result<Option<BlueprintInfo>> {
        match self.blueprint_by_product.get(&type_id) {
            None => Ok(None),
            Some(blueprint_id) => {
                let fixture = self.fixture(*blueprint_id)?;
                Ok(Some(BlueprintInfo {
                    blueprint_id: fixture.blueprint_id,
                    blueprint_name: fixture.blueprint_name.clone(),
                    buildable: fixture.buildable,
                }))
            }
        }
    }

    async fn type_name(&self, type_id: TypeId) -> anyhow::Result<Option<String>> {
        Ok(self.type_names.get(&type_id).cloned())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryLocations {
    pub stations: HashMap<StationId, (RegionId, String)>,
    pub hub_stations: Vec<StationId>,
    pub hub_regions: Vec<RegionId>,
}

impl InMemoryLocations {
    pub fn add_station(&mut self, station_id: u64, region_id: u32, name: &str) {
        self.stations.insert(StationId(station_id), (RegionId(region_id), name.to_string()));
    }
}

#[async_trait]
impl LocationService for InMemoryLocations {
    async fn region_of_station(&self, station_id: StationId) -> anyhow::Result<Option<RegionId>> {
        Ok(self.stations.get(&station_id).map(|(region, _)| *region))
    }

    async fn station_name(&self, station_id: StationId) -> anyhow::Result<String> {
        self.stations
            .get(&station_id)
            .map(|(_, name)| name.clone())
            .ok_or_else(|| anyhow::Error::new(BatchError::DataNotFound(format!("station {}", station_id))))
    }

    async fn market_hub_stations(&self) -> anyhow::Result<Vec<StationId>> {
        Ok(self.hub_stations.clone())
    }

    async fn market_hub_regions(&self) -> anyhow::Result<Vec<RegionId>> {
        Ok(self.hub_regions.clone())
    }
}

/// Serves pre-baked order pages per region and counts fetches, so cache TTL
/// and pagination behavior can be asserted.
#[derive(Debug, Default)]
pub struct PagedMarketSource {
    pub pages: HashMap<RegionId, Vec<Vec<MarketOrder>>>,
    pub fetch_count: AtomicUsize,
}

impl PagedMarketSource {
    pub fn single_page(region_id: u32, orders: Vec<MarketOrder>) -> Self {
        PagedMarketSource {
            pages: HashMap::from([(RegionId(region_id), vec![orders])]),
            fetch_count: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataSource for PagedMarketSource {
    async fn fetch_orders_page(&self, region_id: RegionId, page: u32) -> anyhow::Result<Vec<MarketOrder>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        let region_pages = self.pages.get(&region_id).cloned().unwrap_or_default();
        Ok(region_pages.get(page as usize - 1).cloned().unwrap_or_default())
    }
}

/// Tracks how many fetches run at the same time, for asserting the refresh
/// permit limit.
#[derive(Debug, Default)]
pub struct ConcurrencyProbeSource {
    pub in_flight: Arc<AtomicUsize>,
    pub max_in_flight: Arc<AtomicUsize>,
}

#[async_trait]
impl MarketDataSource for ConcurrencyProbeSource {
    async fn fetch_orders_page(&self, _region_id: RegionId, page: u32) -> anyhow::Result<Vec<MarketOrder>> {
        if page > 1 {
            return Ok(vec![]);
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(vec![sell_order(1, 34, 60003760, 5.0, 100)])
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryInventory {
    pub on_hand: HashMap<TypeId, u64>,
}

impl InMemoryInventory {
    pub fn with(mut self, type_id: u32, quantity: u64) -> Self {
        self.on_hand.insert(TypeId(type_id), quantity);
        self
    }
}

#[async_trait]
impl InventoryService for InMemoryInventory {
    async fn on_hand(&self, type_id: TypeId) -> anyhow::Result<u64> {
        Ok(self.on_hand.get(&type_id).copied().unwrap_or(0))
    }
}

pub fn sell_order(order_id: u64, type_id: u32, station_id: u64, price: f64, volume_remain: u64) -> MarketOrder {
    MarketOrder {
        order_id,
        type_id: TypeId(type_id),
        station_id: StationId(station_id),
        is_buy_order: false,
        price,
        volume_remain,
        volume_total: volume_remain,
        issued: Utc::now(),
    }
}

pub fn buy_order(order_id: u64, type_id: u32, station_id: u64, price: f64, volume_remain: u64) -> MarketOrder {
    MarketOrder {
        is_buy_order: true,
        ..sell_order(order_id, type_id, station_id, price, volume_remain)
    }
}
