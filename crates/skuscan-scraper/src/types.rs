//! Wire types for the storefront JSON endpoints the resolvers read.
//!
//! ## `products.json` (bulk catalog feed)
//! `GET {origin}/products.json?limit=N&page=P` returns
//! `{"products": [...]}`. An empty array, or a body without the
//! `products` key, marks the end of pagination.
//!
//! ### `sku`
//! Usually a string, occasionally `null`, `""`, or a bare JSON number on
//! stores whose admin exported numeric SKUs. All three shapes are accepted
//! and numbers are stringified.
//!
//! ### `price` / `compare_at_price`
//! Decimal strings (`"162.00"`). `compare_at_price` is `null` when the
//! variant is not on sale.
//!
//! A product or variant that does not match this shape (no `handle`, no
//! `id`) is dropped on its own; the rest of the page still indexes.
//!
//! ## `/products/{handle}.js` (single product)
//! Same product shape but prices are integer **cents** and `images` is a
//! list of (often protocol-relative) URL strings.
//!
//! ## WooCommerce Store API
//! `GET {origin}/wp-json/wc/store/v1/products?search=Q` returns an array.
//! Prices are strings in minor currency units with `currency_minor_unit`
//! giving the scale (`"1999"` + `2` = `19.99`).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

/// One page of the bulk catalog feed.
#[derive(Debug, Deserialize)]
pub struct ProductsPage {
    #[serde(default, deserialize_with = "skip_malformed")]
    pub products: Vec<FeedProduct>,
}

#[derive(Debug, Deserialize)]
pub struct FeedProduct {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    pub handle: String,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default, deserialize_with = "skip_malformed")]
    pub images: Vec<FeedImage>,
    #[serde(default, deserialize_with = "skip_malformed")]
    pub variants: Vec<FeedVariant>,
}

#[derive(Debug, Deserialize)]
pub struct FeedVariant {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub compare_at_price: Option<String>,
    /// Defaults to `true` when absent.
    #[serde(default = "default_available")]
    pub available: bool,
}

#[derive(Debug, Deserialize)]
pub struct FeedImage {
    pub src: String,
}

/// Response of `GET /products/{handle}.js`.
#[derive(Debug, Deserialize)]
pub struct StorefrontProduct {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    pub handle: String,
    #[serde(rename = "type", default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub variants: Vec<StorefrontVariant>,
}

#[derive(Debug, Deserialize)]
pub struct StorefrontVariant {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub sku: Option<String>,
    /// Price in cents.
    #[serde(default)]
    pub price: Option<i64>,
    /// Compare-at price in cents.
    #[serde(default)]
    pub compare_at_price: Option<i64>,
    #[serde(default = "default_available")]
    pub available: bool,
}

/// Response of `GET /search/suggest.json?q=...&resources[type]=product`.
#[derive(Debug, Default, Deserialize)]
pub struct SuggestResponse {
    #[serde(default)]
    pub resources: SuggestResources,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestResources {
    #[serde(default)]
    pub results: SuggestResults,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestResults {
    #[serde(default)]
    pub products: Vec<SuggestProduct>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestProduct {
    pub handle: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// One product from the WooCommerce Store API.
#[derive(Debug, Deserialize)]
pub struct WooProduct {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    /// Parent product ID for variations, `0` for top-level products.
    #[serde(default)]
    pub parent: i64,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub sku: Option<String>,
    #[serde(default)]
    pub prices: WooPrices,
    #[serde(default)]
    pub images: Vec<WooImage>,
    #[serde(default)]
    pub categories: Vec<WooCategory>,
    #[serde(default)]
    pub variations: Vec<WooVariation>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WooPrices {
    #[serde(default, deserialize_with = "string_or_number")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub regular_price: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub sale_price: Option<String>,
    #[serde(default = "default_minor_unit")]
    pub currency_minor_unit: u32,
}

#[derive(Debug, Deserialize)]
pub struct WooImage {
    pub src: String,
}

#[derive(Debug, Deserialize)]
pub struct WooCategory {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct WooVariation {
    pub id: i64,
}

fn default_available() -> bool {
    true
}

fn default_minor_unit() -> u32 {
    2
}

/// Keeps the array elements that deserialize as `T`; `null` is empty.
fn skip_malformed<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let values = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?;
    Ok(values
        .unwrap_or_default()
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed feed entry");
                None
            }
        })
        .collect())
}

/// Accepts a JSON string, number, or `null`; empty strings become `None`.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
