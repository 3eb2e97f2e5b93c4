use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use itertools::Itertools;
use manuf_domain::procurement::fill_requisitions;
use manuf_domain::services::LocationService;
use manuf_domain::{BomLineItem, MarketOrder, ProcurementPlan, RegionId, StationId, SupplyPlan};
use ordered_float::OrderedFloat;
use tracing::warn;

use crate::market_estimator::MarketPriceEstimator;

/// Assembles per-station purchase plans covering every BOM line at the lowest
/// price available across the caller-selected stations. Shortfalls are
/// reported as-is; the planner never fails on thin markets.
pub struct SupplyPlanner {
    locations: Arc<dyn LocationService>,
}

struct SelectedStation {
    station_id: StationId,
    station_name: String,
    region_id: RegionId,
}

impl SupplyPlanner {
    pub fn new(locations: Arc<dyn LocationService>) -> Self {
        SupplyPlanner { locations }
    }

    pub async fn plan(&self, bill_of_materials: &[BomLineItem], stations: &[StationId], estimator: &MarketPriceEstimator) -> Result<SupplyPlan> {
        let selected_stations = self.resolve_stations(stations).await?;

        // every cached sell order sitting at one of the selected stations
        let mut candidate_orders: Vec<MarketOrder> = Vec::new();
        for station in &selected_stations {
            let region_orders = estimator.region_orders(station.region_id)?;
            candidate_orders.extend(
                region_orders
                    .into_iter()
                    .filter(|order| order.station_id == station.station_id && !order.is_buy_order),
            );
        }

        let requisitions = bill_of_materials
            .iter()
            .filter(|line| line.net_requisitioned() > 0)
            .flat_map(|line| fill_requisitions(line.type_id, &line.type_name, line.net_requisitioned(), &candidate_orders))
            .collect_vec();

        let station_names: HashMap<StationId, String> = selected_stations
            .into_iter()
            .map(|station| (station.station_id, station.station_name))
            .collect();

        let procurement_plans = requisitions
            .into_iter()
            .into_group_map_by(|requisition| requisition.station_id)
            .into_iter()
            .map(|(station_id, requisitions)| ProcurementPlan {
                station_id,
                station_name: station_names.get(&station_id).cloned().unwrap_or_else(|| station_id.to_string()),
                requisitions: requisitions
                    .into_iter()
                    .sorted_by_key(|requisition| (requisition.type_id, OrderedFloat(requisition.unit_price)))
                    .collect_vec(),
            })
            .sorted_by_key(|plan| plan.station_id)
            .collect_vec();

        Ok(SupplyPlan { procurement_plans })
    }

    async fn resolve_stations(&self, stations: &[StationId]) -> Result<Vec<SelectedStation>> {
        let mut selected_stations = Vec::new();
        for station_id in stations.iter().unique() {
            match self.locations.region_of_station(*station_id).await? {
                Some(region_id) => {
                    let station_name = self
                        .locations
                        .station_name(*station_id)
                        .await
                        .unwrap_or_else(|_| station_id.to_string());
                    selected_stations.push(SelectedStation {
                        station_id: *station_id,
                        station_name,
                        region_id,
                    });
                }
                None => {
                    warn!("Station {} resolves to no region; ignoring it for procurement", station_id);
                }
            }
        }
        Ok(selected_stations)
    }
}
