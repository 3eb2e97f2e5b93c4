use std::sync::Arc;

use anyhow::Result;
use itertools::Itertools;
use manuf_domain::services::{InventoryService, LocationService, MarketDataSource, StaticDataService};
use manuf_domain::{BomLineItem, ManufBatch, Order, ProductionRoute, RegionId, StationId};
use tracing::{debug, error, warn};

use crate::bom_aggregator::BomAggregator;
use crate::error::BatchError;
use crate::format_duration_hh_mm_ss;
use crate::market_estimator::MarketPriceEstimator;
use crate::market_profile::calculate_market_profile;
use crate::route_builder::RouteBuilder;
use crate::supply_planner::SupplyPlanner;

/// The one entry point of the engine: turns a set of production orders and a
/// station selection into a full manufacturing batch.
///
/// The whole pipeline runs under one failure boundary; anything unexpected is
/// logged in full and surfaced as a single `BatchComputationFailure`, so a
/// partially computed batch never escapes to the caller.
pub struct ManufBatchManager {
    static_data: Arc<dyn StaticDataService>,
    locations: Arc<dyn LocationService>,
    inventory: Arc<dyn InventoryService>,
    estimator: MarketPriceEstimator,
}

impl ManufBatchManager {
    pub fn new(
        static_data: Arc<dyn StaticDataService>,
        locations: Arc<dyn LocationService>,
        inventory: Arc<dyn InventoryService>,
        market_source: Arc<dyn MarketDataSource>,
    ) -> Self {
        ManufBatchManager {
            static_data,
            locations,
            inventory,
            estimator: MarketPriceEstimator::new(market_source),
        }
    }

    pub async fn get_manufacturing_batch(&self, orders: Vec<Order>, stations: Vec<StationId>) -> Result<ManufBatch, BatchError> {
        if orders.is_empty() {
            return Err(BatchError::InvalidInput("order list is empty".to_string()));
        }

        match self.compute_batch(orders, stations).await {
            Ok(batch) => Ok(batch),
            Err(e) => match e.downcast::<BatchError>() {
                Ok(batch_error) => Err(batch_error),
                Err(other) => {
                    error!("Batch computation failed: {:#}", other);
                    Err(BatchError::BatchComputationFailure(other))
                }
            },
        }
    }

    async fn compute_batch(&self, orders: Vec<Order>, stations: Vec<StationId>) -> Result<ManufBatch> {
        // no explicit station selection means "shop at the market hubs"
        let stations = if stations.is_empty() {
            let hubs = self.locations.market_hub_stations().await?;
            debug!("No stations selected; defaulting to {} market hub stations", hubs.len());
            hubs
        } else {
            stations
        };

        let routes = RouteBuilder::new(self.static_data.clone()).build_routes(orders).await?;

        let mut bill_of_materials = BomAggregator::new(self.static_data.clone(), self.inventory.clone()).aggregate(&routes).await?;

        let selected_regions = self.regions_to_refresh(&stations).await?;
        self.estimator.ensure_regions_fresh(&selected_regions).await?;

        self.attach_market_stats(&mut bill_of_materials, &stations).await?;

        let supply_plan = SupplyPlanner::new(self.locations.clone())
            .plan(&bill_of_materials, &stations, &self.estimator)
            .await?;

        let market_profile = calculate_market_profile(&routes, &supply_plan, &self.estimator)?;

        let production_summary = routes.iter().map(production_summary_line).collect_vec();
        let bom_summary = bill_of_materials
            .iter()
            .map(|line| format!("{} x {}", line.net_requisitioned(), line.type_name))
            .collect_vec();
        let stock = bill_of_materials.iter().map(|line| (line.type_id, line.inventory)).collect();

        Ok(ManufBatch {
            production_routes: routes,
            bill_of_materials,
            supply_plan,
            market_profile,
            production_summary,
            bom_summary,
            stock,
        })
    }

    /// The regions of every selected station plus the configured market hubs,
    /// deduplicated. Hub regions feed the profitability estimate even when no
    /// selected station sits in them.
    async fn regions_to_refresh(&self, stations: &[StationId]) -> Result<Vec<RegionId>> {
        let mut regions = Vec::new();
        for station_id in stations {
            match self.locations.region_of_station(*station_id).await? {
                Some(region_id) => regions.push(region_id),
                None => warn!("Station {} resolves to no region; no order book will back it", station_id),
            }
        }

        match self.locations.market_hub_regions().await {
            Ok(hub_regions) => regions.extend(hub_regions),
            Err(e) => warn!("Market hub region list unavailable; profiling only selected regions: {:#}", e),
        }

        Ok(regions.into_iter().unique().collect_vec())
    }

    async fn attach_market_stats(&self, bill_of_materials: &mut [BomLineItem], stations: &[StationId]) -> Result<()> {
        let mut station_regions = Vec::new();
        for station_id in stations.iter().unique() {
            if let Some(region_id) = self.locations.region_of_station(*station_id).await? {
                station_regions.push((*station_id, region_id));
            }
        }

        for line in bill_of_materials.iter_mut() {
            for (station_id, region_id) in &station_regions {
                line.market_stats.push(self.estimator.stat_for(line.type_id, *station_id, *region_id)?);
            }
        }

        Ok(())
    }
}

fn production_summary_line(route: &ProductionRoute) -> String {
    format!(
        "{} x {} ({} runs of {}, {})",
        route.produced(),
        route.material_name,
        route.order.runs,
        route.blueprint_name,
        format_duration_hh_mm_ss(route.duration_seconds)
    )
}
