use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use skuscan_core::{Item, Platform, ScrapeResult};

use super::{
    direct_target, filter_links, result_from_page, sku_matches, ResolveContext, Resolver, Target,
    MAX_SEARCH_CANDIDATES,
};
use crate::client::StoreClient;
use crate::error::ScraperError;
use crate::page::{
    clean_text, decode_entities, extract_attr, parse_price_text, parse_product_page, PageData,
};

static RRP_ELEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<(\w+)\b[^>]*class\s*=\s*["'][^"']*productrrp[^"']*["'][^>]*>(.*?)</\w+>"#)
        .expect("valid regex")
});
static RRP_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bRRP\b[^0-9]{0,24}([0-9][0-9,]*(?:\.[0-9]{1,2})?)").expect("valid regex")
});
static ANCHOR_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b[^>]*>").expect("valid regex"));

/// First path segments that are never product pages on a Neto store.
const RESERVED_SEGMENTS: &[&str] = &[
    "_mycart", "_myacct", "_cpn", "assets", "account", "blog", "brand", "brands", "cart",
    "checkout", "contact-us", "form", "login", "page", "search",
];

/// Neto (Maropost Commerce Cloud) storefronts, resolved from product-page
/// HTML. SKU-only items go through the keyword search page, which Neto
/// redirects straight to the product on an exact hit.
#[derive(Debug, Clone)]
pub struct NetoResolver {
    client: StoreClient,
    ctx: ResolveContext,
}

impl NetoResolver {
    #[must_use]
    pub fn new(client: StoreClient, ctx: ResolveContext) -> Self {
        Self { client, ctx }
    }

    async fn fetch_page(&self, url: &str) -> Result<(PageData, String), ScraperError> {
        let html = self.client.fetch_html(url).await?;
        Ok((parse_product_page(&html, url), html))
    }

    /// Keyword search: the results page itself when Neto redirected to a
    /// product, else the first listed product carrying the exact SKU, else
    /// the first listed product.
    async fn search(&self, sku: &str) -> Result<(String, PageData, String), ScraperError> {
        let origin = self.ctx.require_origin(sku)?;
        let mut url = Url::parse(&format!("{origin}/")).map_err(|e| ScraperError::InvalidUrl {
            url: origin.clone(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut()
            .append_pair("rf", "kw")
            .append_pair("kw", sku.trim());
        let search_url = url.to_string();

        let (data, html) = self.fetch_page(&search_url).await?;
        if data.is_product() && data.sku.as_deref().is_none_or(|s| sku_matches(Some(s), sku)) {
            return Ok((search_url, data, html));
        }

        let mut first = None;
        for link in self
            .product_links(&html, &search_url)
            .into_iter()
            .take(MAX_SEARCH_CANDIDATES)
        {
            match self.fetch_page(&link).await {
                Ok((data, html)) => {
                    if sku_matches(data.sku.as_deref(), sku) {
                        return Ok((link, data, html));
                    }
                    if first.is_none() {
                        first = Some((link, data, html));
                    }
                }
                Err(e) => tracing::debug!(url = %link, error = %e, "search candidate failed"),
            }
        }
        first.ok_or_else(|| ScraperError::NoMatch {
            query: sku.to_owned(),
        })
    }
}

impl Resolver for NetoResolver {
    fn platform(&self) -> Platform {
        Platform::Neto
    }

    async fn resolve(&self, item: &Item) -> Result<ScrapeResult, ScraperError> {
        let (page_url, data, html) = match direct_target(&self.ctx, item)? {
            Target::Url(url) => {
                let (data, html) = self.fetch_page(&url).await?;
                (url, data, html)
            }
            Target::Search(sku) => self.search(&sku).await?,
        };

        if !data.is_product() {
            return Err(ScraperError::Parse {
                url: page_url,
                reason: "no product SKU or price on page".to_owned(),
            });
        }

        let mut result = result_from_page(item, &page_url, data);
        if result.rrp.is_none() {
            let rrp = neto_rrp(&html);
            result.set_prices(result.price, rrp);
        }
        Ok(result)
    }

    fn is_product_link(&self, url: &Url) -> bool {
        let mut segments = url.path().split('/').filter(|s| !s.is_empty());
        let Some(first) = segments.next() else {
            return false;
        };
        let first = first.to_ascii_lowercase();
        !first.starts_with('_')
            && !RESERVED_SEGMENTS.contains(&first.as_str())
            && !first.contains('.')
            && url.query_pairs().all(|(k, _)| k != "rf")
    }

    /// Anchors from product thumbnails: `itemprop="url"` or a class naming
    /// a thumbnail or product card.
    fn product_links(&self, html: &str, base_url: &str) -> Vec<String> {
        let hrefs = ANCHOR_TAG_RE.find_iter(html).filter_map(|m| {
            let tag = m.as_str();
            let is_product_anchor = extract_attr(tag, "itemprop")
                .is_some_and(|p| p.eq_ignore_ascii_case("url"))
                || extract_attr(tag, "class").is_some_and(|class| {
                    let class = class.to_ascii_lowercase();
                    class.contains("thumbnail") || class.contains("product")
                });
            if is_product_anchor {
                extract_attr(tag, "href").map(|href| decode_entities(&href))
            } else {
                None
            }
        });
        filter_links(hrefs, base_url, |url| self.is_product_link(url))
    }
}

/// Recommended retail price from `productrrp` markup or an "RRP $x" label.
fn neto_rrp(html: &str) -> Option<rust_decimal::Decimal> {
    RRP_ELEMENT_RE
        .captures_iter(html)
        .filter_map(|c| c.get(2))
        .find_map(|m| parse_price_text(&clean_text(m.as_str())))
        .or_else(|| {
            let text = clean_text(html);
            RRP_TEXT_RE
                .captures(&text)
                .and_then(|c| c.get(1))
                .and_then(|m| parse_price_text(m.as_str()))
        })
}
