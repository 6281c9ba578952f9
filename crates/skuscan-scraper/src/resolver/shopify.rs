use std::sync::Arc;

use reqwest::Url;
use rust_decimal::Decimal;
use skuscan_core::{Item, Platform, ScrapeResult};

use super::{direct_target, sku_matches, ResolveContext, Resolver, Target, MAX_SEARCH_CANDIDATES};
use crate::catalog::{handle_from_path, variant_display_name, Catalog, VariantRecord};
use crate::client::{absolutize_url, StoreClient};
use crate::error::ScraperError;
use crate::page::parse_product_page;
use crate::types::{StorefrontProduct, StorefrontVariant, SuggestResponse};

/// Shopify storefronts.
///
/// With a non-empty catalog, SKU and URL hits are answered from the index
/// with no product request; outside fast mode the product page is visited
/// for breadcrumbs only. Misses, and every item when no catalog is
/// available, go through `/products/{handle}.js` or the search-suggest
/// endpoint. A bare SKU the catalog missed is searched too, but only a
/// candidate carrying that exact SKU is accepted.
#[derive(Debug, Clone)]
pub struct ShopifyResolver {
    client: StoreClient,
    ctx: ResolveContext,
    catalog: Option<Arc<Catalog>>,
}

impl ShopifyResolver {
    #[must_use]
    pub fn new(client: StoreClient, ctx: ResolveContext, catalog: Option<Arc<Catalog>>) -> Self {
        Self {
            client,
            ctx,
            catalog,
        }
    }

    fn catalog_hit(&self, item: &Item) -> Option<(&Catalog, &VariantRecord)> {
        let catalog = self.catalog.as_deref().filter(|c| !c.is_empty())?;
        let record = item
            .sku
            .as_deref()
            .and_then(|sku| catalog.lookup_sku(sku))
            .or_else(|| item.url.as_deref().and_then(|url| catalog.lookup_url(url)))?;
        Some((catalog, record))
    }

    async fn from_catalog(
        &self,
        item: &Item,
        catalog: &Catalog,
        record: &VariantRecord,
    ) -> ScrapeResult {
        let mut result = ScrapeResult::for_item(item);
        result.product_url = Some(record.product_url.clone());
        result.name = Some(record.name.clone());
        result.set_prices(record.price, record.rrp);
        result.group_id = Some(record.product_id.to_string());
        result.variant_id = Some(record.variant_id.to_string());
        result.all_variant_ids = catalog
            .variant_ids_for_product(record.product_id)
            .iter()
            .map(ToString::to_string)
            .collect();
        result.category.clone_from(&record.product_type);
        result.image_url.clone_from(&record.image_url);
        if result.sku.is_none() {
            result.sku = Some(record.sku.clone());
        }

        if !self.ctx.fast_mode {
            result.breadcrumbs = self.breadcrumbs(&record.product_url).await;
        }
        result
    }

    /// Breadcrumbs from the product page. A failed visit is not an item
    /// error; the result keeps everything the catalog provided.
    async fn breadcrumbs(&self, product_url: &str) -> Vec<String> {
        match self.client.fetch_html(product_url).await {
            Ok(html) => parse_product_page(&html, product_url).breadcrumbs,
            Err(e) => {
                tracing::warn!(url = %product_url, error = %e, "breadcrumb enrichment failed");
                Vec::new()
            }
        }
    }

    async fn resolve_direct(
        &self,
        item: &Item,
        exact_only: bool,
    ) -> Result<ScrapeResult, ScraperError> {
        let (origin, product, wanted_variant) = match direct_target(&self.ctx, item)? {
            Target::Url(url) => {
                let parsed = Url::parse(&url).map_err(|e| ScraperError::InvalidUrl {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;
                let origin = parsed.origin().ascii_serialization();
                let wanted_variant = parsed
                    .query_pairs()
                    .find(|(k, _)| k == "variant")
                    .and_then(|(_, v)| v.parse::<i64>().ok());
                let handle = match handle_from_path(parsed.path()) {
                    Some(handle) => handle.to_owned(),
                    None => self.first_listed_handle(&url).await?,
                };
                let product = self.fetch_product(&origin, &handle).await?;
                (origin, product, wanted_variant)
            }
            Target::Search(sku) => {
                let origin = self.ctx.require_origin(&sku)?;
                let product = self.search(&origin, &sku, exact_only).await?;
                (origin, product, None)
            }
        };

        let variant = pick_variant(&product, wanted_variant, item.sku.as_deref()).ok_or_else(
            || ScraperError::Parse {
                url: format!("{origin}/products/{}.js", product.handle),
                reason: "product has no variants".to_owned(),
            },
        )?;

        let mut result = build_result(item, &origin, &product, variant);
        if !self.ctx.fast_mode {
            if let Some(product_url) = result.product_url.clone() {
                result.breadcrumbs = self.breadcrumbs(&product_url).await;
            }
        }
        Ok(result)
    }

    async fn fetch_product(
        &self,
        origin: &str,
        handle: &str,
    ) -> Result<StorefrontProduct, ScraperError> {
        self.client
            .fetch_json(&format!("{origin}/products/{handle}.js"))
            .await
    }

    /// For templates that land on a listing or search page: the handle of
    /// the first product linked from it.
    async fn first_listed_handle(&self, page_url: &str) -> Result<String, ScraperError> {
        let html = self.client.fetch_html(page_url).await?;
        self.product_links(&html, page_url)
            .iter()
            .filter_map(|link| Url::parse(link).ok())
            .find_map(|url| handle_from_path(url.path()).map(str::to_owned))
            .ok_or_else(|| ScraperError::NoMatch {
                query: page_url.to_owned(),
            })
    }

    /// Search-suggest lookup: the first candidate carrying the exact SKU,
    /// else the first candidate unless `exact_only` is set.
    async fn search(
        &self,
        origin: &str,
        sku: &str,
        exact_only: bool,
    ) -> Result<StorefrontProduct, ScraperError> {
        let mut url = Url::parse(&format!("{origin}/search/suggest.json")).map_err(|e| {
            ScraperError::InvalidUrl {
                url: origin.to_owned(),
                reason: e.to_string(),
            }
        })?;
        url.query_pairs_mut()
            .append_pair("q", sku.trim())
            .append_pair("resources[type]", "product")
            .append_pair("resources[limit]", &MAX_SEARCH_CANDIDATES.to_string());

        let response: SuggestResponse = self.client.fetch_json(url.as_str()).await?;
        let handles: Vec<String> = response
            .resources
            .results
            .products
            .into_iter()
            .map(|p| p.handle)
            .take(MAX_SEARCH_CANDIDATES)
            .collect();

        let mut first: Option<StorefrontProduct> = None;
        let mut last_error: Option<ScraperError> = None;
        for handle in handles {
            match self.fetch_product(origin, &handle).await {
                Ok(product) => {
                    if product.variants.iter().any(|v| sku_matches(v.sku.as_deref(), sku)) {
                        return Ok(product);
                    }
                    if first.is_none() {
                        first = Some(product);
                    }
                }
                Err(e) => {
                    tracing::debug!(handle = %handle, error = %e, "search candidate failed");
                    last_error = Some(e);
                }
            }
        }

        match (first, last_error) {
            (Some(_), _) if exact_only => Err(ScraperError::NoMatch {
                query: sku.to_owned(),
            }),
            (Some(product), _) => Ok(product),
            (None, Some(e)) => Err(e),
            (None, None) => Err(ScraperError::NoMatch {
                query: sku.to_owned(),
            }),
        }
    }
}

impl Resolver for ShopifyResolver {
    fn platform(&self) -> Platform {
        Platform::Shopify
    }

    async fn resolve(&self, item: &Item) -> Result<ScrapeResult, ScraperError> {
        if let Some((catalog, record)) = self.catalog_hit(item) {
            tracing::debug!(sku = %record.sku, "catalog hit");
            return Ok(self.from_catalog(item, catalog, record).await);
        }
        // The SKU may postdate the index, but a loose first search result
        // is not trusted over a catalog miss.
        let has_catalog = self.catalog.as_deref().is_some_and(|c| !c.is_empty());
        self.resolve_direct(item, has_catalog).await
    }

    fn is_product_link(&self, url: &Url) -> bool {
        handle_from_path(url.path()).is_some()
    }
}

/// Requested variant ID, else the SKU's variant, else the first variant.
fn pick_variant<'a>(
    product: &'a StorefrontProduct,
    variant_id: Option<i64>,
    sku: Option<&str>,
) -> Option<&'a StorefrontVariant> {
    variant_id
        .and_then(|id| product.variants.iter().find(|v| v.id == id))
        .or_else(|| {
            sku.and_then(|sku| {
                product
                    .variants
                    .iter()
                    .find(|v| sku_matches(v.sku.as_deref(), sku))
            })
        })
        .or_else(|| product.variants.first())
}

fn build_result(
    item: &Item,
    origin: &str,
    product: &StorefrontProduct,
    variant: &StorefrontVariant,
) -> ScrapeResult {
    let mut result = ScrapeResult::for_item(item);
    result.product_url = Some(format!(
        "{origin}/products/{}?variant={}",
        product.handle, variant.id
    ));
    result.name = Some(variant_display_name(&product.title, variant.title.as_deref()));
    result.set_prices(
        variant.price.map(cents),
        variant.compare_at_price.filter(|c| *c > 0).map(cents),
    );
    result.group_id = Some(product.id.to_string());
    result.variant_id = Some(variant.id.to_string());
    result.all_variant_ids = product.variants.iter().map(|v| v.id.to_string()).collect();
    result.category = product
        .product_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned);
    result.image_url = product
        .featured_image
        .as_deref()
        .or_else(|| product.images.first().map(String::as_str))
        .and_then(|src| absolutize_url(origin, src));
    if result.sku.is_none() {
        result.sku.clone_from(&variant.sku);
    }
    result
}

/// `.js` endpoints report prices in cents.
fn cents(value: i64) -> Decimal {
    Decimal::new(value, 2)
}
