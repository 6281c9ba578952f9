//! Paginated walk of a site's `products.json` feed.

use std::time::Duration;

use crate::client::StoreClient;
use crate::sku::SkuKeyPolicy;

use super::Catalog;

/// Shopify's maximum `limit` for the bulk feed.
pub const DEFAULT_PAGE_SIZE: u32 = 250;
pub const DEFAULT_PAGE_DELAY_MS: u64 = 100;

/// Safety valve for feeds that never return an empty page.
const MAX_PAGES: u32 = 1000;

#[derive(Debug, Clone)]
pub struct CatalogIndexer {
    client: StoreClient,
    page_size: u32,
    page_delay: Duration,
    policy: SkuKeyPolicy,
}

impl CatalogIndexer {
    #[must_use]
    pub fn new(client: StoreClient) -> Self {
        Self {
            client,
            page_size: DEFAULT_PAGE_SIZE,
            page_delay: Duration::from_millis(DEFAULT_PAGE_DELAY_MS),
            policy: SkuKeyPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn with_page_delay_ms(mut self, delay_ms: u64) -> Self {
        self.page_delay = Duration::from_millis(delay_ms);
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: SkuKeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn policy(&self) -> SkuKeyPolicy {
        self.policy
    }

    /// Walks pages `1, 2, ...` until a page comes back empty or a request
    /// fails, and returns the catalog with its entry count.
    ///
    /// **Partial-success semantics**: a failing page (transport error,
    /// non-2xx, bad JSON) ends the walk but keeps everything indexed from
    /// earlier pages. Failure on page 1 therefore yields an empty catalog,
    /// which callers treat as "catalog unavailable".
    ///
    /// Re-running on an unchanged site yields the same entries; the indexer
    /// holds no state between runs.
    pub async fn fetch_catalog(&self, origin: &str) -> (Catalog, usize) {
        let mut catalog = Catalog::new(origin, self.policy);
        let origin = catalog.origin().to_owned();
        let mut page = 0u32;

        loop {
            page += 1;
            if page > MAX_PAGES {
                tracing::warn!(
                    origin = %origin,
                    max_pages = MAX_PAGES,
                    "catalog page limit reached; stopping"
                );
                break;
            }

            if page > 1 && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }

            match self
                .client
                .fetch_products_page(&origin, self.page_size, page)
                .await
            {
                Ok(response) if response.products.is_empty() => {
                    tracing::debug!(origin = %origin, page, "empty catalog page; done");
                    break;
                }
                Ok(response) => {
                    let written: usize = response
                        .products
                        .iter()
                        .map(|product| catalog.index_product(product))
                        .sum();
                    tracing::info!(
                        origin = %origin,
                        page,
                        products = response.products.len(),
                        variants = written,
                        total = catalog.len(),
                        "indexed catalog page"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        origin = %origin,
                        page,
                        error = %e,
                        indexed = catalog.len(),
                        "catalog page failed; keeping what was indexed"
                    );
                    break;
                }
            }
        }

        let count = catalog.len();
        if !catalog.collisions().is_empty() {
            tracing::warn!(
                origin = %origin,
                collisions = catalog.collisions().len(),
                "SKU keys collided during indexing"
            );
        }
        tracing::info!(origin = %origin, variants = count, "catalog indexed");
        (catalog, count)
    }
}
