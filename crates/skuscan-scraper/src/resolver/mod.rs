//! Per-platform item resolution.
//!
//! A [`Resolver`] turns one [`Item`] into one [`ScrapeResult`]. The concrete
//! resolver is picked once per batch from the configured [`Platform`] and
//! handed to the scheduler.

mod neto;
mod shopify;
mod woocommerce;

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Url;
use skuscan_core::{Item, Platform, ScrapeResult};

use crate::catalog::Catalog;
use crate::client::{absolutize_url, extract_store_origin, StoreClient};
use crate::error::ScraperError;
use crate::page::{anchor_hrefs, PageData};

pub use neto::NetoResolver;
pub use shopify::ShopifyResolver;
pub use woocommerce::WooCommerceResolver;

/// SKU bytes escaped in templates: all but RFC 3986 unreserved characters.
const SKU_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// How many search candidates are fetched while looking for an exact SKU.
pub(crate) const MAX_SEARCH_CANDIDATES: usize = 5;

/// Batch-wide settings shared by every resolver.
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    /// Site root used for search and for relative URL templates.
    pub origin: Option<String>,
    /// Product URL pattern containing `{sku}`.
    pub url_template: Option<String>,
    /// Answer from the catalog only and skip page visits.
    pub fast_mode: bool,
}

impl ResolveContext {
    pub(crate) fn require_origin(&self, query: &str) -> Result<String, ScraperError> {
        self.origin
            .as_deref()
            .map(extract_store_origin)
            .ok_or_else(|| ScraperError::InvalidUrl {
                url: query.to_owned(),
                reason: "no site origin configured for search".to_owned(),
            })
    }
}

pub trait Resolver: Send + Sync {
    fn platform(&self) -> Platform;

    /// Resolves one item. Errors are per-item; see [`resolve_item`].
    fn resolve(
        &self,
        item: &Item,
    ) -> impl Future<Output = Result<ScrapeResult, ScraperError>> + Send;

    /// Whether `url` has this platform's product-page shape.
    fn is_product_link(&self, url: &Url) -> bool;

    /// Product links on a listing page: absolute, same host as `base_url`,
    /// fragment-free, de-duplicated in document order.
    fn product_links(&self, html: &str, base_url: &str) -> Vec<String> {
        filter_links(anchor_hrefs(html), base_url, |url| self.is_product_link(url))
    }
}

/// Runs `resolver` and folds any error into a failed result, so every item
/// yields exactly one record.
pub async fn resolve_item<R: Resolver>(resolver: &R, item: &Item) -> ScrapeResult {
    match resolver.resolve(item).await {
        Ok(result) => result,
        Err(e) => {
            tracing::debug!(
                platform = %resolver.platform(),
                sku = item.sku.as_deref().unwrap_or_default(),
                url = item.url.as_deref().unwrap_or_default(),
                error = %e,
                "item resolution failed"
            );
            ScrapeResult::failed(item, e.to_string())
        }
    }
}

/// Substitutes the percent-encoded SKU for every `{sku}` in `template`.
/// Root-relative templates are joined to `origin` when one is known.
#[must_use]
pub fn template_url(template: &str, sku: &str, origin: Option<&str>) -> String {
    let encoded = utf8_percent_encode(sku.trim(), SKU_ENCODE).to_string();
    let filled = template.replace("{sku}", &encoded);
    match origin {
        Some(origin) if filled.starts_with('/') && !filled.starts_with("//") => {
            format!("{}{filled}", extract_store_origin(origin))
        }
        _ => filled,
    }
}

/// Where a direct (non-catalog) resolution starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A page or endpoint URL to fetch.
    Url(String),
    /// A SKU to look up through the platform's site search.
    Search(String),
}

/// Template with the SKU if both exist, else the item URL, else a search.
///
/// # Errors
///
/// Returns [`ScraperError::NoMatch`] for an item with neither field.
pub fn direct_target(ctx: &ResolveContext, item: &Item) -> Result<Target, ScraperError> {
    match (item.sku.as_deref(), item.url.as_deref(), ctx.url_template.as_deref()) {
        (Some(sku), _, Some(template)) => Ok(Target::Url(template_url(
            template,
            sku,
            ctx.origin.as_deref(),
        ))),
        (_, Some(url), _) => Ok(Target::Url(url.to_owned())),
        (Some(sku), None, None) => Ok(Target::Search(sku.to_owned())),
        (None, None, _) => Err(ScraperError::NoMatch {
            query: String::new(),
        }),
    }
}

/// Exact case-insensitive SKU match first, else the first candidate.
pub fn best_match<'a, T>(
    candidates: &'a [T],
    sku: &str,
    sku_of: impl Fn(&T) -> Option<&str>,
) -> Option<&'a T> {
    let wanted = sku.trim();
    candidates
        .iter()
        .find(|c| sku_of(*c).is_some_and(|s| s.trim().eq_ignore_ascii_case(wanted)))
        .or_else(|| candidates.first())
}

pub(crate) fn sku_matches(candidate: Option<&str>, sku: &str) -> bool {
    candidate.is_some_and(|c| c.trim().eq_ignore_ascii_case(sku.trim()))
}

/// Copies page-derived fields into a result for `item`.
pub(crate) fn result_from_page(item: &Item, page_url: &str, data: PageData) -> ScrapeResult {
    let mut result = ScrapeResult::for_item(item);
    result.product_url = Some(data.canonical_url.unwrap_or_else(|| page_url.to_owned()));
    result.name = data.name;
    result.set_prices(data.price, data.rrp);
    result.group_id = data.group_id;
    result.variant_id = data.variant_id;
    result.all_variant_ids = data.variant_ids;
    result.category = data.category;
    result.breadcrumbs = data.breadcrumbs;
    result.image_url = data.image_url;
    if result.sku.is_none() {
        result.sku = data.sku;
    }
    result
}

pub(crate) fn filter_links(
    hrefs: impl IntoIterator<Item = String>,
    base_url: &str,
    keep: impl Fn(&Url) -> bool,
) -> Vec<String> {
    let base_host = Url::parse(base_url)
        .ok()
        .and_then(|u| u.host_str().map(bare_host));
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for href in hrefs {
        let Some(absolute) = absolutize_url(base_url, &href) else {
            continue;
        };
        let Ok(mut url) = Url::parse(&absolute) else {
            continue;
        };
        url.set_fragment(None);
        let same_host = url.host_str().map(bare_host) == base_host;
        if !same_host || !keep(&url) {
            continue;
        }
        let link = url.to_string();
        if seen.insert(link.clone()) {
            links.push(link);
        }
    }
    links
}

fn bare_host(host: &str) -> String {
    host.trim_start_matches("www.").to_ascii_lowercase()
}

/// The resolver for one batch, chosen from the configured platform.
#[derive(Debug, Clone)]
pub enum AnyResolver {
    Shopify(ShopifyResolver),
    Neto(NetoResolver),
    WooCommerce(WooCommerceResolver),
}

impl AnyResolver {
    /// `catalog` is only consulted by the Shopify resolver.
    #[must_use]
    pub fn for_platform(
        platform: Platform,
        client: StoreClient,
        ctx: ResolveContext,
        catalog: Option<Arc<Catalog>>,
    ) -> Self {
        match platform {
            Platform::Shopify => Self::Shopify(ShopifyResolver::new(client, ctx, catalog)),
            Platform::Neto => Self::Neto(NetoResolver::new(client, ctx)),
            Platform::WooCommerce => Self::WooCommerce(WooCommerceResolver::new(client, ctx)),
        }
    }
}

impl Resolver for AnyResolver {
    fn platform(&self) -> Platform {
        match self {
            Self::Shopify(r) => r.platform(),
            Self::Neto(r) => r.platform(),
            Self::WooCommerce(r) => r.platform(),
        }
    }

    fn resolve(
        &self,
        item: &Item,
    ) -> impl Future<Output = Result<ScrapeResult, ScraperError>> + Send {
        async move {
            match self {
                Self::Shopify(r) => r.resolve(item).await,
                Self::Neto(r) => r.resolve(item).await,
                Self::WooCommerce(r) => r.resolve(item).await,
            }
        }
    }

    fn is_product_link(&self, url: &Url) -> bool {
        match self {
            Self::Shopify(r) => r.is_product_link(url),
            Self::Neto(r) => r.is_product_link(url),
            Self::WooCommerce(r) => r.is_product_link(url),
        }
    }

    fn product_links(&self, html: &str, base_url: &str) -> Vec<String> {
        match self {
            Self::Shopify(r) => r.product_links(html, base_url),
            Self::Neto(r) => r.product_links(html, base_url),
            Self::WooCommerce(r) => r.product_links(html, base_url),
        }
    }
}

#[cfg(test)]
#[path = "../resolver_test.rs"]
mod tests;
