use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use itertools::Itertools;
use manuf_domain::efficiency::calc_material;
use manuf_domain::services::{InventoryService, StaticDataService};
use manuf_domain::{BomLineItem, ProductionRoute, TypeId};
use tracing::warn;

/// Consolidates the terminal raw materials of all production routes into the
/// bill of materials, keyed by material type and netted against on-hand
/// inventory by the caller via `net_requisitioned`.
pub struct BomAggregator {
    static_data: Arc<dyn StaticDataService>,
    inventory: Arc<dyn InventoryService>,
}

impl BomAggregator {
    pub fn new(static_data: Arc<dyn StaticDataService>, inventory: Arc<dyn InventoryService>) -> Self {
        BomAggregator { static_data, inventory }
    }

    pub async fn aggregate(&self, routes: &[ProductionRoute]) -> Result<Vec<BomLineItem>> {
        let mut lines: HashMap<TypeId, BomLineItem> = HashMap::new();

        for route in routes {
            let materials = match self.static_data.unbuildable_materials(route.blueprint_id, route.order.activity).await {
                Ok(materials) => materials,
                Err(e) => {
                    warn!("No terminal material list for blueprint {:?}; skipping route: {:#}", route.blueprint_id, e);
                    continue;
                }
            };

            for material in materials {
                let required = calc_material(material.quantity, route.order.copies, route.order.runs, route.order.material_efficiency);
                lines
                    .entry(material.type_id)
                    .and_modify(|line| line.requisitioned += required)
                    .or_insert_with(|| BomLineItem {
                        type_id: material.type_id,
                        type_name: material.type_name.clone(),
                        requisitioned: required,
                        inventory: 0,
                        market_stats: vec![],
                    });
            }
        }

        for line in lines.values_mut() {
            line.inventory = match self.inventory.on_hand(line.type_id).await {
                Ok(on_hand) => on_hand,
                Err(e) => {
                    warn!("Inventory lookup for {:?} failed; assuming none on hand: {:#}", line.type_id, e);
                    0
                }
            };
        }

        Ok(lines.into_values().sorted_by_key(|line| line.type_id).collect_vec())
    }
}
