//! The normalized per-item output record.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::items::Item;

/// One output row per input [`Item`].
///
/// When resolution fails `error` is set and the data fields stay empty.
/// `sku` and `url` echo the input; a missing `sku` may be filled from the
/// store's data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub sku: Option<String>,
    pub url: Option<String>,
    pub product_url: Option<String>,
    pub name: Option<String>,
    pub price: Option<Decimal>,
    /// Recommended retail / compare-at price.
    pub rrp: Option<Decimal>,
    pub discount_percent: Option<i64>,
    /// Parent product identifier shared by all variants.
    pub group_id: Option<String>,
    pub variant_id: Option<String>,
    #[serde(default)]
    pub all_variant_ids: Vec<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub breadcrumbs: Vec<String>,
    pub image_url: Option<String>,
    pub error: Option<String>,
}

impl ScrapeResult {
    /// An empty result echoing the item's identifiers.
    #[must_use]
    pub fn for_item(item: &Item) -> Self {
        Self {
            sku: item.sku.clone(),
            url: item.url.clone(),
            ..Self::default()
        }
    }

    /// A failed result carrying only the item's identifiers and `error`.
    #[must_use]
    pub fn failed(item: &Item, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::for_item(item)
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Sets `price` and `rrp` and recomputes `discount_percent` from them.
    pub fn set_prices(&mut self, price: Option<Decimal>, rrp: Option<Decimal>) {
        self.price = price;
        self.rrp = rrp;
        self.discount_percent = discount_percent(price, rrp);
    }

    /// Breadcrumb trail joined for tabular export, e.g. `"Home > Tents"`.
    #[must_use]
    pub fn breadcrumb_path(&self) -> String {
        self.breadcrumbs.join(" > ")
    }
}

/// `round((rrp - price) / rrp * 100)` when both prices are known and
/// `rrp > 0`. Rounds half to even.
#[must_use]
pub fn discount_percent(price: Option<Decimal>, rrp: Option<Decimal>) -> Option<i64> {
    let (price, rrp) = (price?, rrp?);
    if rrp <= Decimal::ZERO {
        return None;
    }
    ((rrp - price) / rrp * Decimal::ONE_HUNDRED).round().to_i64()
}
