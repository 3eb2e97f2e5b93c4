use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use manuf_domain::efficiency::{calc_material, calc_time};
use manuf_domain::routing::{runs_for_demand, RouteSet};
use manuf_domain::services::StaticDataService;
use manuf_domain::{Activity, Order, ProductionRoute, RouteKey, VisitKey};
use tracing::{debug, warn};

/// Defensive cap on the expansion depth. The visited sets already bound the
/// expansion by the finite set of (parent, child) blueprint pairs; the cap
/// only guards against pathological reference data.
pub const MAX_EXPANSION_DEPTH: usize = 64;

/// Expands a set of root orders level by level into a deduplicated set of
/// production routes.
///
/// Two visited sets are threaded through all levels: `started` holds the
/// (parent-or-0, blueprint) pairs already scheduled at a shallower or equal
/// level, `finished` records at which depth a route key was first finalized so
/// that duplicate demand arriving later from an alternate path is discarded.
pub struct RouteBuilder {
    static_data: Arc<dyn StaticDataService>,
}

struct ExpansionState {
    started: HashSet<VisitKey>,
    finished: HashMap<RouteKey, usize>,
    routes: RouteSet,
}

impl RouteBuilder {
    pub fn new(static_data: Arc<dyn StaticDataService>) -> Self {
        RouteBuilder { static_data }
    }

    pub async fn build_routes(&self, root_orders: Vec<Order>) -> Result<Vec<ProductionRoute>> {
        let mut state = ExpansionState {
            started: HashSet::new(),
            finished: HashMap::new(),
            routes: RouteSet::new(),
        };

        let mut level = root_orders;
        let mut depth = 0usize;

        while !level.is_empty() {
            if depth >= MAX_EXPANSION_DEPTH {
                warn!(
                    "Aborting route expansion at depth {} with {} orders still queued; dependency chain exceeds the expected maximum",
                    depth,
                    level.len()
                );
                break;
            }

            let mut next_level = Vec::new();
            for order in level {
                self.expand_order(order, depth, &mut state, &mut next_level).await?;
            }

            level = next_level;
            depth += 1;
        }

        Ok(state.routes.into_routes())
    }

    async fn expand_order(&self, order: Order, depth: usize, state: &mut ExpansionState, next_level: &mut Vec<Order>) -> Result<()> {
        if !state.started.insert(VisitKey::of(&order)) {
            debug!("Skipping order for {}: already scheduled at a shallower level", order.product_name);
            return Ok(());
        }

        let produced_per_run = self.produced_per_run_or_one(&order).await;

        // A child order arrives carrying its demanded amount as the run count;
        // the real run count falls out of produced-per-run here, before any
        // sub-materials are sized. Root run counts are user intent and stay
        // untouched.
        let requisitioned = order.quantity();
        let mut order = order;
        if !order.is_root() && produced_per_run != 1 {
            order.runs = runs_for_demand(requisitioned.div_ceil(produced_per_run));
        }

        let duration_seconds = self.production_duration(&order).await;
        let blueprint_name = self.blueprint_name_for(&order).await;

        let route = ProductionRoute {
            material_type_id: order.product_type_id,
            material_name: order.product_name.clone(),
            blueprint_id: order.blueprint_id,
            blueprint_name,
            requisitioned,
            contributing_orders: vec![order.clone()],
            order: order.clone(),
            produced_per_run,
            inventory: 0,
            duration_seconds,
        };
        merge_unless_finished(route, order.is_root(), depth, state);

        if order.activity != Activity::Manufacturing {
            // invention inputs are not manufacturable; nothing to expand
            return Ok(());
        }

        let materials = match self.static_data.buildable_materials(order.blueprint_id, order.activity).await {
            Ok(materials) => materials,
            Err(e) => {
                warn!(
                    "No buildable material list for blueprint {:?}; treating branch as terminal: {:#}",
                    order.blueprint_id, e
                );
                return Ok(());
            }
        };

        for material in materials {
            let child_requisitioned = calc_material(material.quantity, order.copies, order.runs, order.material_efficiency);

            let blueprint = match self.static_data.blueprint_for_product(material.type_id).await {
                Ok(Some(blueprint)) => blueprint,
                Ok(None) => {
                    warn!("No blueprint resolves product {:?}; skipping inconsistent material line", material.type_id);
                    continue;
                }
                Err(e) => {
                    warn!("Blueprint resolution for product {:?} failed; treating material as terminal: {:#}", material.type_id, e);
                    continue;
                }
            };

            // Child blueprints run at base efficiency; per-character blueprint
            // research levels live outside this engine. The run count carries
            // the raw demand until the child's own route is materialized.
            let child_order = Order::new(
                blueprint.blueprint_id,
                Activity::Manufacturing,
                material.type_id,
                material.type_name.clone(),
                1,
                runs_for_demand(child_requisitioned),
                0,
                0,
                Some(order.blueprint_id),
            )?;

            if blueprint.blueprint_id != order.blueprint_id && blueprint.buildable {
                next_level.push(child_order);
            } else {
                // self-referential or non-buildable blueprint: finalize here
                state.started.insert(VisitKey::of(&child_order));

                let child_produced_per_run = self
                    .static_data
                    .produced_per_run(blueprint.blueprint_id, Activity::Manufacturing)
                    .await
                    .unwrap_or(1)
                    .max(1);
                let mut terminal_order = child_order;
                if child_produced_per_run != 1 {
                    terminal_order.runs = runs_for_demand(child_requisitioned.div_ceil(child_produced_per_run));
                }

                let duration_seconds = self.production_duration(&terminal_order).await;
                let route = ProductionRoute {
                    material_type_id: material.type_id,
                    material_name: material.type_name.clone(),
                    blueprint_id: blueprint.blueprint_id,
                    blueprint_name: blueprint.blueprint_name.clone(),
                    requisitioned: child_requisitioned,
                    contributing_orders: vec![terminal_order.clone()],
                    order: terminal_order,
                    produced_per_run: child_produced_per_run,
                    inventory: 0,
                    duration_seconds,
                };
                merge_unless_finished(route, false, depth, state);
            }
        }

        Ok(())
    }

    async fn produced_per_run_or_one(&self, order: &Order) -> u64 {
        match self.static_data.produced_per_run(order.blueprint_id, order.activity).await {
            Ok(produced_per_run) => produced_per_run.max(1),
            Err(e) => {
                warn!("No produced-per-run for blueprint {:?}; assuming 1: {:#}", order.blueprint_id, e);
                1
            }
        }
    }

    async fn production_duration(&self, order: &Order) -> u64 {
        match self.static_data.base_production_seconds(order.blueprint_id, order.activity).await {
            Ok(base_seconds) => calc_time(base_seconds, order.runs, order.time_efficiency),
            Err(e) => {
                debug!("No base production time for blueprint {:?}: {:#}", order.blueprint_id, e);
                0
            }
        }
    }

    async fn blueprint_name_for(&self, order: &Order) -> String {
        match self.static_data.blueprint_for_product(order.product_type_id).await {
            Ok(Some(blueprint)) => blueprint.blueprint_name,
            _ => format!("{} Blueprint", order.product_name),
        }
    }
}

fn merge_unless_finished(route: ProductionRoute, is_root: bool, depth: usize, state: &mut ExpansionState) {
    let key = route.key();
    match state.finished.get(&key) {
        Some(&finalized_depth) if finalized_depth < depth => {
            debug!(
                "Discarding duplicate route for {} from depth {}: already finalized at depth {}",
                route.material_name, depth, finalized_depth
            );
        }
        _ => {
            state.finished.entry(key).or_insert(depth);
            state.routes.upsert(route, is_root);
        }
    }
}
