//! Input normalization: heterogeneous raw rows into a deduplicated,
//! order-preserving list of [`Item`]s.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One raw input record, e.g. a CSV row or a manually entered line.
/// Keys are matched case-insensitively.
pub type RawRow = BTreeMap<String, String>;

/// A single identifier pair to resolve. At least one field is set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    pub sku: Option<String>,
    pub url: Option<String>,
}

impl Item {
    /// Builds an item from optional raw values, trimming both and treating
    /// empty strings as absent. Returns `None` when neither is usable.
    #[must_use]
    pub fn new(sku: Option<&str>, url: Option<&str>) -> Option<Self> {
        let clean = |v: Option<&str>| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };
        let sku = clean(sku);
        let url = clean(url);
        if sku.is_none() && url.is_none() {
            return None;
        }
        Some(Self { sku, url })
    }

    /// Identity used for deduplication: lowercased `(sku, url)` with absent
    /// fields as empty strings.
    #[must_use]
    pub fn identity_key(&self) -> (String, String) {
        (
            self.sku.as_deref().unwrap_or_default().to_lowercase(),
            self.url.as_deref().unwrap_or_default().to_lowercase(),
        )
    }
}

/// Returns the first non-empty value whose key equals `field` ignoring case.
fn field_ci<'a>(row: &'a RawRow, field: &str) -> Option<&'a str> {
    row.iter()
        .filter(|(k, _)| k.trim().eq_ignore_ascii_case(field))
        .map(|(_, v)| v.trim())
        .find(|v| !v.is_empty())
}

/// Normalizes raw rows into items.
///
/// Rows with neither a `sku` nor a `url` are dropped silently. Duplicates
/// (by [`Item::identity_key`]) keep their first occurrence, and the output
/// preserves the order of first occurrences.
#[must_use]
pub fn normalize_rows(rows: &[RawRow]) -> Vec<Item> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for row in rows {
        let Some(item) = Item::new(field_ci(row, "sku"), field_ci(row, "url")) else {
            continue;
        };
        if seen.insert(item.identity_key()) {
            items.push(item);
        }
    }

    items
}

/// Builds raw rows from manual entry: one SKU per line followed by one URL
/// per line. Blank lines are skipped.
#[must_use]
pub fn rows_from_lines(skus: &str, urls: &str) -> Vec<RawRow> {
    let lines = |text: &str, key: &str| -> Vec<RawRow> {
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| RawRow::from([(key.to_owned(), l.to_owned())]))
            .collect()
    };
    let mut rows = lines(skus, "sku");
    rows.extend(lines(urls, "url"));
    rows
}

/// Parses a JSON array of objects into raw rows.
///
/// String values are kept as-is and numbers are stringified (spreadsheet
/// exports often turn numeric SKUs into numbers). Other value kinds are
/// ignored.
///
/// # Errors
///
/// Returns [`ConfigError::InputParse`] if the text is not a JSON array of objects.
pub fn rows_from_json(text: &str) -> Result<Vec<RawRow>, ConfigError> {
    let records: Vec<BTreeMap<String, serde_json::Value>> = serde_json::from_str(text)?;
    Ok(records
        .into_iter()
        .map(|record| {
            record
                .into_iter()
                .filter_map(|(k, v)| match v {
                    serde_json::Value::String(s) => Some((k, s)),
                    serde_json::Value::Number(n) => Some((k, n.to_string())),
                    _ => None,
                })
                .collect()
        })
        .collect())
}
