//! In-memory catalog of a site's variants keyed by normalized SKU.

mod indexer;

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::client::extract_store_origin;
use crate::sku::SkuKeyPolicy;
use crate::types::FeedProduct;

pub use indexer::{CatalogIndexer, DEFAULT_PAGE_DELAY_MS, DEFAULT_PAGE_SIZE};

/// Variant title Shopify uses for products without options.
pub const DEFAULT_VARIANT_TITLE: &str = "Default Title";

/// One indexed variant. Never mutated after insertion, only replaced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantRecord {
    /// SKU as the store spells it.
    pub sku: String,
    pub product_id: i64,
    pub variant_id: i64,
    pub handle: String,
    pub title: String,
    pub variant_title: Option<String>,
    /// `title`, or `"{title} - {variant_title}"` for non-default variants.
    pub name: String,
    pub price: Option<Decimal>,
    /// Compare-at price.
    pub rrp: Option<Decimal>,
    pub available: bool,
    pub product_type: Option<String>,
    pub published_at: Option<String>,
    pub image_url: Option<String>,
    pub product_url: String,
}

/// Two different variants whose SKUs folded into the same key while
/// indexing. The later one replaced the earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkuCollision {
    pub key: String,
    pub replaced_sku: String,
    pub replaced_variant_id: i64,
    pub kept_sku: String,
    pub kept_variant_id: i64,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    origin: String,
    policy: SkuKeyPolicy,
    entries: HashMap<String, VariantRecord>,
    by_variant_id: HashMap<i64, String>,
    by_handle: HashMap<String, Vec<String>>,
    product_variants: HashMap<i64, Vec<i64>>,
    collisions: Vec<SkuCollision>,
}

impl Catalog {
    #[must_use]
    pub fn new(origin: &str, policy: SkuKeyPolicy) -> Self {
        Self {
            origin: extract_store_origin(origin),
            policy,
            entries: HashMap::new(),
            by_variant_id: HashMap::new(),
            by_handle: HashMap::new(),
            product_variants: HashMap::new(),
            collisions: Vec::new(),
        }
    }

    /// Indexes every variant of `product` that carries a non-empty SKU.
    ///
    /// Returns the number of variants written. Variants without a SKU are
    /// skipped but still counted among the product's variant IDs. A product
    /// with a blank handle has no product URL and is skipped whole.
    pub fn index_product(&mut self, product: &FeedProduct) -> usize {
        if product.handle.trim().is_empty() {
            tracing::debug!(product_id = product.id, "skipping product without handle");
            return 0;
        }
        let image_url = product.images.first().map(|img| img.src.clone());
        let product_type = product
            .product_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);

        let variant_ids = self.product_variants.entry(product.id).or_default();
        for variant in &product.variants {
            if !variant_ids.contains(&variant.id) {
                variant_ids.push(variant.id);
            }
        }

        let mut written = 0usize;
        for variant in &product.variants {
            let Some(sku) = variant.sku.as_deref().map(str::trim).filter(|s| !s.is_empty())
            else {
                continue;
            };

            let variant_title = variant.title.clone();
            let name = variant_display_name(&product.title, variant_title.as_deref());

            let record = VariantRecord {
                sku: sku.to_owned(),
                product_id: product.id,
                variant_id: variant.id,
                handle: product.handle.clone(),
                title: product.title.clone(),
                variant_title,
                name,
                price: parse_decimal(variant.price.as_deref()),
                rrp: parse_decimal(variant.compare_at_price.as_deref()),
                available: variant.available,
                product_type: product_type.clone(),
                published_at: product.published_at.clone(),
                image_url: image_url.clone(),
                product_url: format!(
                    "{}/products/{}?variant={}",
                    self.origin, product.handle, variant.id
                ),
            };
            self.insert(record);
            written += 1;
        }
        written
    }

    fn insert(&mut self, record: VariantRecord) {
        let key = self.policy.key(&record.sku);

        if let Some(previous) = self.entries.get(&key) {
            if previous.variant_id != record.variant_id {
                tracing::warn!(
                    origin = %self.origin,
                    key = %key,
                    replaced_sku = %previous.sku,
                    kept_sku = %record.sku,
                    "SKU key collision; keeping the later variant"
                );
                self.collisions.push(SkuCollision {
                    key: key.clone(),
                    replaced_sku: previous.sku.clone(),
                    replaced_variant_id: previous.variant_id,
                    kept_sku: record.sku.clone(),
                    kept_variant_id: record.variant_id,
                });
                self.by_variant_id.remove(&previous.variant_id);
            }
        }

        self.by_variant_id.insert(record.variant_id, key.clone());
        let handle_keys = self.by_handle.entry(record.handle.clone()).or_default();
        if !handle_keys.contains(&key) {
            handle_keys.push(key.clone());
        }
        self.entries.insert(key, record);
    }

    /// Looks up a variant by SKU, normalized with this catalog's policy.
    #[must_use]
    pub fn lookup_sku(&self, sku: &str) -> Option<&VariantRecord> {
        self.entries.get(&self.policy.key(sku))
    }

    #[must_use]
    pub fn lookup_variant_id(&self, variant_id: i64) -> Option<&VariantRecord> {
        self.by_variant_id
            .get(&variant_id)
            .and_then(|key| self.entries.get(key))
    }

    /// Derives a lookup from a product URL: the `variant` query parameter
    /// first, then the handle after a `/products/` path segment.
    #[must_use]
    pub fn lookup_url(&self, url: &str) -> Option<&VariantRecord> {
        let parsed = reqwest::Url::parse(url.trim()).ok()?;

        let by_variant = parsed
            .query_pairs()
            .find(|(k, _)| k == "variant")
            .and_then(|(_, v)| v.parse::<i64>().ok())
            .and_then(|id| self.lookup_variant_id(id));
        if by_variant.is_some() {
            return by_variant;
        }

        let handle = handle_from_path(parsed.path())?;
        // Keys may since have been taken over by another product's variant.
        self.by_handle
            .get(handle)?
            .iter()
            .filter_map(|key| self.entries.get(key))
            .find(|r| r.handle == handle)
    }

    /// Every variant ID of the given product, SKU or not, in feed order.
    #[must_use]
    pub fn variant_ids_for_product(&self, product_id: i64) -> &[i64] {
        self.product_variants
            .get(&product_id)
            .map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    #[must_use]
    pub fn policy(&self) -> SkuKeyPolicy {
        self.policy
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// An empty catalog means "catalog unavailable" (e.g. the feed was
    /// blocked); callers fall back to direct resolution.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn collisions(&self) -> &[SkuCollision] {
        &self.collisions
    }

    pub fn records(&self) -> impl Iterator<Item = &VariantRecord> {
        self.entries.values()
    }

    /// Records ordered by key, for stable exports.
    #[must_use]
    pub fn sorted_records(&self) -> Vec<&VariantRecord> {
        let mut keys: Vec<&String> = self.entries.keys().collect();
        keys.sort();
        keys.into_iter().filter_map(|k| self.entries.get(k)).collect()
    }

    #[must_use]
    pub fn sorted_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// The all-SKUs export: sorted normalized keys, one per line.
    #[must_use]
    pub fn sku_list_text(&self) -> String {
        self.sorted_keys().join("\n")
    }
}

/// `title`, or `"{title} - {variant_title}"` unless the variant title is
/// blank or the `"Default Title"` sentinel.
pub(crate) fn variant_display_name(title: &str, variant_title: Option<&str>) -> String {
    match variant_title.map(str::trim) {
        Some(vt) if vt != DEFAULT_VARIANT_TITLE && !vt.is_empty() => format!("{title} - {vt}"),
        _ => title.to_owned(),
    }
}

/// [`Catalog::lookup_sku`] that tolerates a catalog that was never built.
#[must_use]
pub fn lookup_sku<'a>(catalog: Option<&'a Catalog>, sku: &str) -> Option<&'a VariantRecord> {
    catalog?.lookup_sku(sku)
}

/// Returns the segment after `products` in a storefront path, minus any
/// `.js`/`.json` suffix: `/collections/x/products/swag` → `swag`.
pub(crate) fn handle_from_path(path: &str) -> Option<&str> {
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    segments.find(|s| *s == "products")?;
    let handle = segments.next()?;
    let handle = handle
        .strip_suffix(".json")
        .or_else(|| handle.strip_suffix(".js"))
        .unwrap_or(handle);
    (!handle.is_empty()).then_some(handle)
}

fn parse_decimal(raw: Option<&str>) -> Option<Decimal> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| Decimal::from_str(s).ok())
}

#[cfg(test)]
#[path = "../catalog_test.rs"]
mod tests;
