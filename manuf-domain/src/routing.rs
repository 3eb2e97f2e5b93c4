use crate::industry_model::{ProductionRoute, RouteKey};
use itertools::Itertools;
use std::collections::HashMap;
use tracing::warn;

/// Converts a demanded amount into a run count without wrapping. Run counts
/// are `u32`; anything beyond that saturates and is logged, since a batch of
/// that size is bogus input rather than a plannable job.
pub fn runs_for_demand(demand: u64) -> u32 {
    u32::try_from(demand).unwrap_or_else(|_| {
        warn!("Demand of {} exceeds the maximum run count; clamping to {}", demand, u32::MAX);
        u32::MAX
    })
}

/// Consolidates an incoming route with the already-scheduled route of the same
/// (material, ME, TE) key, if any.
///
/// Root and child routes are sized differently on purpose: a root order's run
/// count is user intent and is never overwritten (for blueprints producing
/// more than one unit per run the requisitioned amount is scaled up instead),
/// while a child order's run count is always derived from the demand placed
/// on it.
pub fn merge_route(existing: Option<ProductionRoute>, mut incoming: ProductionRoute, is_root: bool) -> ProductionRoute {
    match existing {
        None => {
            if incoming.produced_per_run != 1 {
                if is_root {
                    incoming.requisitioned *= incoming.produced_per_run;
                } else {
                    incoming.order.runs = runs_for_demand(incoming.requisitioned.div_ceil(incoming.produced_per_run));
                }
            }
            incoming
        }
        Some(mut merged) => {
            merged.requisitioned += incoming.requisitioned;
            if merged.produced_per_run != 1 {
                merged.order.runs = runs_for_demand(merged.requisitioned.div_ceil(merged.produced_per_run));
            } else {
                merged.order.runs = merged.order.runs.saturating_add(incoming.order.runs);
            }
            merged.contributing_orders.extend(incoming.contributing_orders);
            merged
        }
    }
}

/// The set of production routes of one routing pass, keyed by (material, ME, TE).
#[derive(Debug, Clone, Default)]
pub struct RouteSet {
    routes: HashMap<RouteKey, ProductionRoute>,
}

impl RouteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, route: ProductionRoute, is_root: bool) {
        let key = route.key();
        let existing = self.routes.remove(&key);
        self.routes.insert(key, merge_route(existing, route, is_root));
    }

    pub fn contains(&self, key: &RouteKey) -> bool {
        self.routes.contains_key(key)
    }

    pub fn get(&self, key: &RouteKey) -> Option<&ProductionRoute> {
        self.routes.get(key)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Routes in a deterministic order (by key), for stable summaries and tests.
    pub fn into_routes(self) -> Vec<ProductionRoute> {
        self.routes
            .into_iter()
            .sorted_by_key(|(key, _)| *key)
            .map(|(_, route)| route)
            .collect_vec()
    }
}
