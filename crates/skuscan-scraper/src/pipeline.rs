//! Batch entry points: SKU/URL resolution, crawl discovery, and full
//! catalog indexing.

use std::sync::Arc;
use std::time::Duration;

use skuscan_core::{AppConfig, Item, ScrapeResult};

use crate::cache::CatalogCache;
use crate::catalog::{Catalog, CatalogIndexer};
use crate::client::{extract_store_origin, StoreClient};
use crate::discover::{discover_product_links, links_to_items};
use crate::error::ScraperError;
use crate::resolver::{AnyResolver, ResolveContext, Resolver};
use crate::scheduler::Scheduler;
use crate::sku::SkuKeyPolicy;

/// Owns the HTTP client and the catalog cache for one configuration.
///
/// The cache outlives individual batches: repeated [`Self::scrape_items`]
/// calls against the same origin reuse one catalog until its TTL lapses or
/// [`CatalogCache::invalidate_all`] is called.
#[derive(Debug)]
pub struct Pipeline {
    config: AppConfig,
    client: StoreClient,
    indexer: CatalogIndexer,
    cache: Arc<CatalogCache>,
}

impl Pipeline {
    /// Item resolutions wait `config.delay_ms` before each request; the
    /// catalog feed is paced by its own page delay instead.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn new(config: AppConfig) -> Result<Self, ScraperError> {
        let base = StoreClient::new(config.request_timeout_secs, &config.user_agent)?;
        let client = base
            .clone()
            .with_request_delay(Duration::from_millis(config.delay_ms));
        let indexer = CatalogIndexer::new(base)
            .with_page_size(config.catalog_page_size)
            .with_page_delay_ms(config.catalog_page_delay_ms)
            .with_policy(SkuKeyPolicy {
                strip_leading_zeros: config.strip_leading_zeros,
            });
        let cache = Arc::new(CatalogCache::new(
            indexer.clone(),
            Duration::from_secs(config.cache_ttl_secs),
        ));
        Ok(Self {
            config,
            client,
            indexer,
            cache,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<CatalogCache> {
        &self.cache
    }

    fn scheduler(&self) -> Scheduler {
        Scheduler::new(self.config.concurrency)
    }

    fn context(&self, origin: Option<String>) -> ResolveContext {
        ResolveContext {
            origin,
            url_template: self.config.url_template.clone(),
            fast_mode: self.config.fast_mode,
        }
    }

    /// Resolves `items` and returns one result per item in input order.
    ///
    /// On catalog platforms with an origin set, the cached catalog is used;
    /// an empty one means the feed was unavailable and every item is
    /// resolved directly instead.
    pub async fn scrape_items(&self, items: &[Item]) -> Vec<ScrapeResult> {
        let catalog = self.catalog_for_batch().await;
        let resolver = AnyResolver::for_platform(
            self.config.platform,
            self.client.clone(),
            self.context(self.config.origin.clone()),
            catalog,
        );
        tracing::info!(
            platform = %resolver.platform(),
            items = items.len(),
            fast_mode = self.config.fast_mode,
            "resolving batch"
        );
        self.scheduler().run_resolver(items, &resolver).await
    }

    async fn catalog_for_batch(&self) -> Option<Arc<Catalog>> {
        if !self.config.platform.supports_catalog() {
            return None;
        }
        let origin = self.config.origin.as_deref()?;
        let catalog = self.cache.get_or_build(origin).await;
        if catalog.is_empty() {
            tracing::warn!(
                origin,
                "catalog unavailable (empty or blocked feed); resolving items directly"
            );
            None
        } else {
            tracing::info!(origin, variants = catalog.len(), "using cached catalog");
            Some(catalog)
        }
    }

    /// Crawl mode: resolves up to `max_items` product links found on
    /// `page_url`. No catalog is consulted.
    ///
    /// # Errors
    ///
    /// Returns the fetch error if the category page itself cannot be loaded.
    pub async fn scrape_by_page(&self, page_url: &str) -> Result<Vec<ScrapeResult>, ScraperError> {
        let origin = self
            .config
            .origin
            .clone()
            .unwrap_or_else(|| extract_store_origin(page_url));
        let resolver = AnyResolver::for_platform(
            self.config.platform,
            self.client.clone(),
            self.context(Some(origin)),
            None,
        );
        let links =
            discover_product_links(&self.client, &resolver, page_url, self.config.max_items)
                .await?;
        let items = links_to_items(&links);
        Ok(self.scheduler().run_resolver(&items, &resolver).await)
    }

    /// Downloads the full catalog for `origin`, bypassing the cache.
    pub async fn index_catalog(&self, origin: &str) -> (Catalog, usize) {
        self.indexer.fetch_catalog(origin).await
    }
}
