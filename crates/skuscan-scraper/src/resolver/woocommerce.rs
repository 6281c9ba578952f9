use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use rust_decimal::Decimal;
use serde_json::Value;
use skuscan_core::{Item, Platform, ScrapeResult};

use super::{
    best_match, direct_target, result_from_page, sku_matches, ResolveContext, Resolver, Target,
    MAX_SEARCH_CANDIDATES,
};
use crate::client::StoreClient;
use crate::error::ScraperError;
use crate::page::{
    clean_text, decode_entities, extract_attr, parse_price_text, parse_product_page, PageData,
};
use crate::types::WooProduct;

static VARIATIONS_FORM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<form\b[^>]*data-product_variations[^>]*>").expect("valid regex")
});
static ADD_TO_CART_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<(?:button|input)\b[^>]*name\s*=\s*["']add-to-cart["'][^>]*>"#)
        .expect("valid regex")
});
static PRODUCT_ID_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)data-product_id\s*=\s*["'](\d+)["']"#).expect("valid regex")
});
static DEL_PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<del\b[^>]*>(.*?)</del>").expect("valid regex"));

/// WooCommerce stores. SKU searches use the public Store API and fall back
/// to the storefront search page on stores that disable it; product URLs
/// are parsed from their HTML.
#[derive(Debug, Clone)]
pub struct WooCommerceResolver {
    client: StoreClient,
    ctx: ResolveContext,
}

/// One entry of a variable product's `data-product_variations` payload.
#[derive(Debug, Clone, PartialEq)]
struct PageVariation {
    id: String,
    sku: Option<String>,
    price: Option<Decimal>,
    regular_price: Option<Decimal>,
}

impl WooCommerceResolver {
    #[must_use]
    pub fn new(client: StoreClient, ctx: ResolveContext) -> Self {
        Self { client, ctx }
    }

    async fn search_api(&self, origin: &str, sku: &str) -> Result<Vec<WooProduct>, ScraperError> {
        let mut url = Url::parse(&format!("{origin}/wp-json/wc/store/v1/products")).map_err(
            |e| ScraperError::InvalidUrl {
                url: origin.to_owned(),
                reason: e.to_string(),
            },
        )?;
        url.query_pairs_mut()
            .append_pair("search", sku.trim())
            .append_pair("per_page", &MAX_SEARCH_CANDIDATES.to_string());
        self.client.fetch_json(url.as_str()).await
    }

    async fn from_api(&self, item: &Item, product: &WooProduct) -> ScrapeResult {
        let mut result = api_result(item, product);
        if !self.ctx.fast_mode {
            if let Some(permalink) = product.permalink.as_deref() {
                match self.client.fetch_html(permalink).await {
                    Ok(html) => {
                        let page = parse_product_page(&html, permalink);
                        result.breadcrumbs = page.breadcrumbs;
                        if result.category.is_none() {
                            result.category = page.category;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(url = %permalink, error = %e, "breadcrumb enrichment failed");
                    }
                }
            }
        }
        result
    }

    async fn resolve_page(&self, item: &Item, url: &str) -> Result<ScrapeResult, ScraperError> {
        let html = self.client.fetch_html(url).await?;
        let data = parse_product_page(&html, url);
        page_result(item, url, data, &html)
    }

    /// Storefront search for stores without the Store API. Woo redirects a
    /// single hit straight to its product page.
    async fn search_page(
        &self,
        item: &Item,
        origin: &str,
        sku: &str,
    ) -> Result<ScrapeResult, ScraperError> {
        let mut url = Url::parse(&format!("{origin}/")).map_err(|e| ScraperError::InvalidUrl {
            url: origin.to_owned(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut()
            .append_pair("s", sku.trim())
            .append_pair("post_type", "product");
        let search_url = url.to_string();

        let html = self.client.fetch_html(&search_url).await?;
        let data = parse_product_page(&html, &search_url);
        if data.is_product() {
            return page_result(item, &search_url, data, &html);
        }

        let mut first = None;
        for link in self
            .product_links(&html, &search_url)
            .into_iter()
            .take(MAX_SEARCH_CANDIDATES)
        {
            let html = match self.client.fetch_html(&link).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::debug!(url = %link, error = %e, "search candidate failed");
                    continue;
                }
            };
            let data = parse_product_page(&html, &link);
            let exact = sku_matches(data.sku.as_deref(), sku)
                || page_variations(&html)
                    .iter()
                    .any(|v| sku_matches(v.sku.as_deref(), sku));
            if exact {
                return page_result(item, &link, data, &html);
            }
            if first.is_none() && data.is_product() {
                first = Some((link, data, html));
            }
        }
        match first {
            Some((link, data, html)) => page_result(item, &link, data, &html),
            None => Err(ScraperError::NoMatch {
                query: sku.to_owned(),
            }),
        }
    }
}

impl Resolver for WooCommerceResolver {
    fn platform(&self) -> Platform {
        Platform::WooCommerce
    }

    async fn resolve(&self, item: &Item) -> Result<ScrapeResult, ScraperError> {
        match direct_target(&self.ctx, item)? {
            Target::Url(url) => self.resolve_page(item, &url).await,
            Target::Search(sku) => {
                let origin = self.ctx.require_origin(&sku)?;
                match self.search_api(&origin, &sku).await {
                    Ok(products) => {
                        let product = best_match(&products, &sku, |p| p.sku.as_deref())
                            .ok_or_else(|| ScraperError::NoMatch { query: sku.clone() })?;
                        Ok(self.from_api(item, product).await)
                    }
                    Err(
                        e @ (ScraperError::NotFound { .. }
                        | ScraperError::UnexpectedStatus { .. }
                        | ScraperError::Deserialize { .. }),
                    ) => {
                        tracing::debug!(origin = %origin, error = %e, "Store API unavailable; using search page");
                        self.search_page(item, &origin, &sku).await
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    fn is_product_link(&self, url: &Url) -> bool {
        let mut segments = url.path().split('/').filter(|s| !s.is_empty());
        let pretty = segments.any(|s| s == "product") && segments.next().is_some();
        pretty || url.query_pairs().any(|(k, v)| k == "product" && !v.is_empty())
    }
}

fn api_result(item: &Item, product: &WooProduct) -> ScrapeResult {
    let minor_unit = product.prices.currency_minor_unit;
    let price = minor_units(product.prices.price.as_deref(), minor_unit);
    let regular = minor_units(product.prices.regular_price.as_deref(), minor_unit);
    let rrp = match (price, regular) {
        (Some(p), Some(r)) if r > p => Some(r),
        _ => None,
    };

    let mut result = ScrapeResult::for_item(item);
    result.product_url.clone_from(&product.permalink);
    result.name = Some(clean_text(&product.name)).filter(|n| !n.is_empty());
    result.set_prices(price, rrp);
    let group = if product.parent > 0 { product.parent } else { product.id };
    result.group_id = Some(group.to_string());
    if product.parent > 0 {
        result.variant_id = Some(product.id.to_string());
    }
    result.all_variant_ids = product.variations.iter().map(|v| v.id.to_string()).collect();
    result.category = product.categories.first().map(|c| clean_text(&c.name));
    result.image_url = product.images.first().map(|img| img.src.clone());
    if result.sku.is_none() {
        result.sku.clone_from(&product.sku);
    }
    result
}

/// `"1999"` with unit `2` is `19.99`.
fn minor_units(raw: Option<&str>, unit: u32) -> Option<Decimal> {
    let raw = raw?.trim();
    match raw.parse::<i64>() {
        Ok(n) => Decimal::try_new(n, unit).ok(),
        Err(_) => Decimal::from_str(raw).ok(),
    }
}

fn page_result(
    item: &Item,
    url: &str,
    data: PageData,
    html: &str,
) -> Result<ScrapeResult, ScraperError> {
    if !data.is_product() {
        return Err(ScraperError::Parse {
            url: url.to_owned(),
            reason: "no product SKU or price on page".to_owned(),
        });
    }
    let variations = page_variations(html);
    let group_id = data.group_id.clone().or_else(|| cart_product_id(html));
    let mut result = result_from_page(item, url, data);
    result.group_id = group_id;

    if !variations.is_empty() {
        result.all_variant_ids = variations.iter().map(|v| v.id.clone()).collect();
        if let Some(sku) = item.sku.as_deref() {
            if let Some(variation) = variations.iter().find(|v| sku_matches(v.sku.as_deref(), sku)) {
                result.variant_id = Some(variation.id.clone());
                let rrp = match (variation.price, variation.regular_price) {
                    (Some(p), Some(r)) if r > p => Some(r),
                    _ => None,
                };
                result.set_prices(variation.price.or(result.price), rrp);
            }
        }
    }

    if result.rrp.is_none() {
        let struck = DEL_PRICE_RE
            .captures(html)
            .and_then(|c| c.get(1))
            .and_then(|m| parse_price_text(&clean_text(m.as_str())));
        if let (Some(price), Some(regular)) = (result.price, struck) {
            if regular > price {
                result.set_prices(Some(price), Some(regular));
            }
        }
    }
    Ok(result)
}

/// Parses the entity-encoded JSON in `data-product_variations`. Stores with
/// many variations emit `false` and load them over AJAX; that yields none.
fn page_variations(html: &str) -> Vec<PageVariation> {
    let Some(raw) = VARIATIONS_FORM_RE
        .find(html)
        .and_then(|m| extract_attr(m.as_str(), "data-product_variations"))
    else {
        return Vec::new();
    };
    let Ok(Value::Array(entries)) = serde_json::from_str::<Value>(&decode_entities(&raw)) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let id = entry.get("variation_id").and_then(json_scalar)?;
            Some(PageVariation {
                id,
                sku: entry.get("sku").and_then(json_scalar).filter(|s| !s.is_empty()),
                price: entry.get("display_price").and_then(json_decimal),
                regular_price: entry.get("display_regular_price").and_then(json_decimal),
            })
        })
        .collect()
}

fn cart_product_id(html: &str) -> Option<String> {
    ADD_TO_CART_RE
        .find_iter(html)
        .find_map(|m| {
            extract_attr(m.as_str(), "value")
                .filter(|v| !v.is_empty() && v.chars().all(|c| c.is_ascii_digit()))
        })
        .or_else(|| {
            PRODUCT_ID_ATTR_RE
                .captures(html)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_owned())
        })
}

fn json_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => parse_price_text(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_units_scale() {
        assert_eq!(minor_units(Some("1999"), 2), Some(Decimal::new(1999, 2)));
        assert_eq!(minor_units(Some("500"), 0), Some(Decimal::new(500, 0)));
        assert_eq!(minor_units(Some("19.99"), 2), Some(Decimal::new(1999, 2)));
        assert_eq!(minor_units(None, 2), None);
    }

    #[test]
    fn minor_units_rejects_unrepresentable_scale() {
        assert_eq!(minor_units(Some("1999"), 30), None);
        assert_eq!(minor_units(Some("1999"), 28), Some(Decimal::new(1999, 28)));
    }

    #[test]
    fn api_result_survives_bogus_minor_unit() {
        let product: WooProduct = serde_json::from_str(
            r#"{"id": 8, "name": "Lamp", "sku": "LMP",
                "prices": {"price": "1999", "regular_price": "2499", "currency_minor_unit": 30}}"#,
        )
        .unwrap();
        let item = Item::new(Some("LMP"), None).unwrap();
        let result = api_result(&item, &product);
        assert!(result.price.is_none());
        assert!(result.rrp.is_none());
        assert_eq!(result.name.as_deref(), Some("Lamp"));
    }

    #[test]
    fn api_result_uses_parent_as_group() {
        let product: WooProduct = serde_json::from_str(
            r#"{"id": 57, "parent": 50, "name": "Chair &amp; Cushion", "sku": "CH-R",
                "permalink": "https://shop.example.com/product/chair/?attribute_colour=red",
                "prices": {"price": "4950", "regular_price": "5950", "currency_minor_unit": 2},
                "categories": [{"name": "Furniture"}],
                "images": [{"src": "https://shop.example.com/wp-content/chair.jpg"}]}"#,
        )
        .unwrap();
        let item = Item::new(Some("ch-r"), None).unwrap();
        let result = api_result(&item, &product);
        assert_eq!(result.group_id.as_deref(), Some("50"));
        assert_eq!(result.variant_id.as_deref(), Some("57"));
        assert_eq!(result.name.as_deref(), Some("Chair & Cushion"));
        assert_eq!(result.price, Some(Decimal::new(4950, 2)));
        assert_eq!(result.rrp, Some(Decimal::new(5950, 2)));
        assert_eq!(result.discount_percent, Some(17));
        assert_eq!(result.category.as_deref(), Some("Furniture"));
        assert_eq!(result.sku.as_deref(), Some("ch-r"));
    }

    #[test]
    fn equal_regular_price_is_no_rrp() {
        let product: WooProduct = serde_json::from_str(
            r#"{"id": 5, "name": "Lamp", "prices": {"price": "1000", "regular_price": "1000"},
                "variations": [{"id": 6}, {"id": 7}]}"#,
        )
        .unwrap();
        let item = Item::new(Some("LMP"), None).unwrap();
        let result = api_result(&item, &product);
        assert!(result.rrp.is_none());
        assert_eq!(result.group_id.as_deref(), Some("5"));
        assert!(result.variant_id.is_none());
        assert_eq!(result.all_variant_ids, vec!["6", "7"]);
    }

    #[test]
    fn variable_product_page_selects_variation_by_sku() {
        let html = r#"<script type="application/ld+json">
            {"@context": "https://schema.org", "@graph": [{"@type": "Product", "name": "Chair", "sku": "CH",
              "offers": [{"@type": "AggregateOffer", "lowPrice": "49.50", "highPrice": "59.50"}]}]}
            </script>
            <form class="variations_form cart" data-product_id="50"
              data-product_variations="[{&quot;variation_id&quot;:57,&quot;sku&quot;:&quot;CH-R&quot;,&quot;display_price&quot;:49.5,&quot;display_regular_price&quot;:59.5},{&quot;variation_id&quot;:58,&quot;sku&quot;:&quot;CH-B&quot;,&quot;display_price&quot;:59.5,&quot;display_regular_price&quot;:59.5}]">
            </form>"#;
        let item = Item::new(Some("CH-R"), Some("https://shop.example.com/product/chair/")).unwrap();
        let data = parse_product_page(html, "https://shop.example.com/product/chair/");
        let result = page_result(&item, "https://shop.example.com/product/chair/", data, html).unwrap();
        assert_eq!(result.group_id.as_deref(), Some("50"));
        assert_eq!(result.variant_id.as_deref(), Some("57"));
        assert_eq!(result.all_variant_ids, vec!["57", "58"]);
        assert_eq!(result.price, Some(Decimal::new(495, 1)));
        assert_eq!(result.rrp, Some(Decimal::new(595, 1)));
    }

    #[test]
    fn simple_product_page_uses_struck_price() {
        let html = r#"<h1 class="product_title">Lamp</h1>
            <meta property="product:price:amount" content="15.00">
            <p class="price"><del><span class="amount"><bdi><span>&#36;</span>20.00</bdi></span></del>
            <ins><span class="amount">$15.00</span></ins></p>
            <button type="submit" name="add-to-cart" value="88" class="single_add_to_cart_button">Add</button>"#;
        let item = Item::new(None, Some("https://shop.example.com/product/lamp/")).unwrap();
        let data = parse_product_page(html, "https://shop.example.com/product/lamp/");
        let result = page_result(&item, "https://shop.example.com/product/lamp/", data, html).unwrap();
        assert_eq!(result.group_id.as_deref(), Some("88"));
        assert_eq!(result.price, Some(Decimal::new(1500, 2)));
        assert_eq!(result.rrp, Some(Decimal::new(2000, 2)));
        assert_eq!(result.discount_percent, Some(25));
    }

    #[test]
    fn product_link_shapes() {
        let r = WooCommerceResolver::new(
            StoreClient::new(5, "skuscan-test").unwrap(),
            ResolveContext::default(),
        );
        let check = |u: &str| r.is_product_link(&Url::parse(u).unwrap());
        assert!(check("https://shop.example.com/product/chair/"));
        assert!(check("https://shop.example.com/shop/product/chair"));
        assert!(check("https://shop.example.com/?product=chair"));
        assert!(!check("https://shop.example.com/product-category/furniture/"));
        assert!(!check("https://shop.example.com/product/"));
        assert!(!check("https://shop.example.com/cart/"));
    }
}
