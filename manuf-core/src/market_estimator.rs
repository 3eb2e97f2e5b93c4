use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeDelta, Utc};
use futures::future;
use itertools::Itertools;
use manuf_domain::market::compute_market_stat;
use manuf_domain::services::MarketDataSource;
use manuf_domain::{MarketOrder, MarketStat, RegionId, StationId, TypeId};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::pagination::fetch_all_pages;

/// Cache entries older than this are recomputed on the next access.
pub const MARKET_CACHE_TTL_MINUTES: i64 = 60;

/// Mirrors the external data source's concurrent request allowance.
pub const DEFAULT_REFRESH_PERMITS: usize = 5;

#[derive(Debug, Clone)]
struct RegionOrderBook {
    orders: Vec<MarketOrder>,
    fetched_at: DateTime<Utc>,
}

/// Process-wide market caches: one order book per trade region, one derived
/// statistic per (type, station). Region refreshes fan out concurrently but
/// each region's order list is replaced atomically as one unit, so readers
/// never observe a half-refreshed book.
#[derive(Clone)]
pub struct MarketPriceEstimator {
    market_source: Arc<dyn MarketDataSource>,
    region_books: Arc<Mutex<HashMap<RegionId, RegionOrderBook>>>,
    stats: Arc<Mutex<HashMap<(TypeId, StationId), MarketStat>>>,
    refresh_permits: Arc<Semaphore>,
}

fn is_stale(timestamp: DateTime<Utc>) -> bool {
    Utc::now() - timestamp >= TimeDelta::minutes(MARKET_CACHE_TTL_MINUTES)
}

impl MarketPriceEstimator {
    pub fn new(market_source: Arc<dyn MarketDataSource>) -> Self {
        Self::with_permits(market_source, DEFAULT_REFRESH_PERMITS)
    }

    pub fn with_permits(market_source: Arc<dyn MarketDataSource>, permits: usize) -> Self {
        MarketPriceEstimator {
            market_source,
            region_books: Arc::new(Mutex::new(HashMap::new())),
            stats: Arc::new(Mutex::new(HashMap::new())),
            refresh_permits: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Refreshes every absent or stale region order book, at most
    /// `refresh_permits` fetches in flight at once. A failed region refresh is
    /// logged and degrades that region's prices to zero; it never fails the
    /// batch.
    pub async fn ensure_regions_fresh(&self, regions: &[RegionId]) -> Result<()> {
        let stale_regions = {
            let books = self.region_books.lock().map_err(|_| anyhow!("Lock poisoned"))?;
            regions
                .iter()
                .unique()
                .filter(|region| match books.get(region) {
                    None => true,
                    Some(book) => is_stale(book.fetched_at),
                })
                .copied()
                .collect_vec()
        };

        let refreshes = stale_regions.into_iter().map(|region| {
            let estimator = self.clone();
            async move {
                let _permit = estimator.refresh_permits.acquire().await?;
                match estimator.refresh_region(region).await {
                    Ok(order_count) => debug!("Refreshed order book for region {} with {} orders", region, order_count),
                    Err(e) => warn!("Order book refresh for region {} failed; its prices degrade to zero: {:#}", region, e),
                }
                anyhow::Ok(())
            }
        });

        future::try_join_all(refreshes).await?;
        Ok(())
    }

    async fn refresh_region(&self, region: RegionId) -> Result<usize> {
        let orders = fetch_all_pages(|page| self.market_source.fetch_orders_page(region, page)).await?;
        let order_count = orders.len();

        let book = RegionOrderBook {
            orders,
            fetched_at: Utc::now(),
        };
        self.region_books
            .lock()
            .map_err(|_| anyhow!("Lock poisoned"))?
            .insert(region, book);

        Ok(order_count)
    }

    /// The cached statistic for (type, station), recomputed from the region's
    /// order book when absent or stale. A missing order book yields a
    /// zero-priced stat.
    pub fn stat_for(&self, type_id: TypeId, station_id: StationId, region_id: RegionId) -> Result<MarketStat> {
        {
            let stats = self.stats.lock().map_err(|_| anyhow!("Lock poisoned"))?;
            if let Some(stat) = stats.get(&(type_id, station_id)) {
                if !is_stale(stat.computed_at) {
                    return Ok(stat.clone());
                }
            }
        }

        let region_orders = self.region_orders(region_id)?;
        let stat = compute_market_stat(type_id, station_id, &region_orders, Utc::now());

        self.stats
            .lock()
            .map_err(|_| anyhow!("Lock poisoned"))?
            .insert((type_id, station_id), stat.clone());

        Ok(stat)
    }

    /// All cached orders of one region; empty when the region was never
    /// fetched or its refresh failed.
    pub fn region_orders(&self, region_id: RegionId) -> Result<Vec<MarketOrder>> {
        let books = self.region_books.lock().map_err(|_| anyhow!("Lock poisoned"))?;
        Ok(books.get(&region_id).map(|book| book.orders.clone()).unwrap_or_default())
    }

    /// All cached orders of one type across every fetched region.
    pub fn orders_for_type(&self, type_id: TypeId) -> Result<Vec<MarketOrder>> {
        let books = self.region_books.lock().map_err(|_| anyhow!("Lock poisoned"))?;
        Ok(books
            .values()
            .flat_map(|book| book.orders.iter().filter(|order| order.type_id == type_id).cloned())
            .collect_vec())
    }

    /// Backdates a cached book, so staleness behavior is testable without a clock.
    pub fn seed_region(&self, region_id: RegionId, orders: Vec<MarketOrder>, fetched_at: DateTime<Utc>) -> Result<()> {
        self.region_books
            .lock()
            .map_err(|_| anyhow!("Lock poisoned"))?
            .insert(region_id, RegionOrderBook { orders, fetched_at });
        Ok(())
    }
}
