//! Per-origin catalog cache with single-flight builds and a TTL.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, OnceCell};

use crate::catalog::{Catalog, CatalogIndexer};
use crate::client::extract_store_origin;

/// Summary of one cached catalog, for display by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    pub origin: String,
    pub variants: usize,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Built {
    catalog: Arc<Catalog>,
    built_at: Instant,
    expires_at: DateTime<Utc>,
}

type Slot = Arc<OnceCell<Built>>;

/// Catalogs keyed by store origin.
///
/// Concurrent callers for the same origin share one in-flight build. A
/// build that produces an empty catalog is handed to everyone waiting on
/// it but is not kept, so the next batch tries the feed again.
#[derive(Debug)]
pub struct CatalogCache {
    indexer: CatalogIndexer,
    ttl: Duration,
    slots: Mutex<HashMap<String, Slot>>,
}

impl CatalogCache {
    #[must_use]
    pub fn new(indexer: CatalogIndexer, ttl: Duration) -> Self {
        Self {
            indexer,
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached catalog for `origin`, building it if absent or
    /// expired. Expiry is measured from build completion.
    pub async fn get_or_build(&self, origin: &str) -> Arc<Catalog> {
        let key = extract_store_origin(origin);

        let slot = {
            let mut slots = self.slots.lock().await;
            let expired = slots
                .get(&key)
                .and_then(|slot| slot.get())
                .is_some_and(|built| built.built_at.elapsed() >= self.ttl);
            if expired {
                tracing::debug!(origin = %key, "cached catalog expired");
                slots.remove(&key);
            }
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        let built = slot.get_or_init(|| self.build(&key)).await;
        let catalog = Arc::clone(&built.catalog);

        if catalog.is_empty() {
            let mut slots = self.slots.lock().await;
            // Another caller may already have replaced this slot.
            if slots.get(&key).is_some_and(|current| Arc::ptr_eq(current, &slot)) {
                slots.remove(&key);
            }
        }

        catalog
    }

    async fn build(&self, origin: &str) -> Built {
        tracing::info!(origin = %origin, "building catalog");
        let (catalog, count) = self.indexer.fetch_catalog(origin).await;
        let expires_at = chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        if count == 0 {
            tracing::warn!(origin = %origin, "catalog came back empty; not caching");
        }
        Built {
            catalog: Arc::new(catalog),
            built_at: Instant::now(),
            expires_at,
        }
    }

    /// Drops every cached catalog. Builds already in flight still finish
    /// for their current waiters but are not kept.
    pub async fn invalidate_all(&self) {
        let mut slots = self.slots.lock().await;
        let dropped = slots.len();
        slots.clear();
        tracing::info!(dropped, "catalog cache cleared");
    }

    /// Completed, unexpired catalogs, sorted by origin.
    pub async fn entries(&self) -> Vec<CacheEntry> {
        let slots = self.slots.lock().await;
        let mut entries: Vec<CacheEntry> = slots
            .iter()
            .filter_map(|(origin, slot)| {
                let built = slot.get()?;
                (built.built_at.elapsed() < self.ttl).then(|| CacheEntry {
                    origin: origin.clone(),
                    variants: built.catalog.len(),
                    expires_at: built.expires_at,
                })
            })
            .collect();
        entries.sort_by(|a, b| a.origin.cmp(&b.origin));
        entries
    }
}
