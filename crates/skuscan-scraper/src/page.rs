//! Product-page HTML parsing shared by the page-based resolvers.
//!
//! Structured data wins: schema.org JSON-LD (`Product`, `ProductGroup`,
//! `BreadcrumbList`, top-level arrays and `@graph` containers). Microdata
//! (`itemprop`), OpenGraph meta tags, and breadcrumb-classed lists fill in
//! whatever JSON-LD leaves out.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;

static JSONLD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]+type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("valid regex")
});
static META_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("valid regex"));
static LINK_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<link\b[^>]*>").expect("valid regex"));
static ANCHOR_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b[^>]*>").expect("valid regex"));
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)(?:^|[\s<])([\w:.-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});
static ITEMPROP_ELEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<(\w+)\b([^>]*\bitemprop\s*=\s*["']([\w:]+)["'][^>]*)>"#).expect("valid regex")
});
static BREADCRUMB_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<(?:ol|ul|nav|div)\b[^>]*class\s*=\s*["'][^"']*breadcrumb[^"']*["'][^>]*>(.*?)</(?:ol|ul|nav)>"#,
    )
    .expect("valid regex")
});
static LI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<li\b[^>]*>(.*?)</li>").expect("valid regex"));
static ANCHOR_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b[^>]*>(.*?)</a>").expect("valid regex"));
static H1_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1\b[^>]*>(.*?)</h1>").expect("valid regex"));
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").expect("valid regex"));
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("valid regex"));
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Fields recovered from one product page. Every field is best-effort.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageData {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub price: Option<Decimal>,
    pub rrp: Option<Decimal>,
    pub group_id: Option<String>,
    pub variant_id: Option<String>,
    pub variant_ids: Vec<String>,
    pub category: Option<String>,
    pub breadcrumbs: Vec<String>,
    pub image_url: Option<String>,
    pub canonical_url: Option<String>,
}

impl PageData {
    /// `true` when the page looks like a single product rather than a
    /// listing or search page.
    #[must_use]
    pub fn is_product(&self) -> bool {
        self.sku.is_some() || self.price.is_some()
    }
}

/// Parses a product page. `page_url` resolves relative image and
/// canonical links.
#[must_use]
pub fn parse_product_page(html: &str, page_url: &str) -> PageData {
    let nodes = jsonld_nodes(html);
    let mut data = PageData::default();

    if let Some(product) = nodes
        .iter()
        .find(|n| has_type(n, "Product") || has_type(n, "ProductGroup"))
    {
        apply_jsonld_product(&mut data, product);
    }
    if let Some(list) = nodes.iter().find(|n| has_type(n, "BreadcrumbList")) {
        data.breadcrumbs = jsonld_breadcrumbs(list);
    }

    apply_html_fallbacks(&mut data, html);

    data.image_url = data
        .image_url
        .take()
        .and_then(|img| crate::client::absolutize_url(page_url, &img));
    data.canonical_url = link_href(html, "canonical")
        .and_then(|href| crate::client::absolutize_url(page_url, &href));

    if data.category.is_none() {
        data.category = category_from_breadcrumbs(&data.breadcrumbs, data.name.as_deref());
    }
    data
}

/// Every JSON-LD object on the page, with top-level arrays and `@graph`
/// containers flattened. Blocks that fail to parse are skipped.
#[must_use]
pub fn jsonld_nodes(html: &str) -> Vec<Value> {
    let mut nodes = Vec::new();
    for cap in JSONLD_RE.captures_iter(html) {
        let Some(text) = cap.get(1) else { continue };
        let Ok(value) = serde_json::from_str::<Value>(text.as_str().trim()) else {
            continue;
        };
        let top: Vec<Value> = match value {
            Value::Array(items) => items,
            other => vec![other],
        };
        for node in top {
            if let Some(graph) = node.get("@graph").and_then(Value::as_array) {
                nodes.extend(graph.iter().cloned());
            }
            nodes.push(node);
        }
    }
    nodes
}

/// `@type` may be a string or an array of strings.
fn has_type(node: &Value, wanted: &str) -> bool {
    match node.get("@type") {
        Some(Value::String(s)) => type_matches(s, wanted),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|s| type_matches(s, wanted)),
        _ => false,
    }
}

fn type_matches(actual: &str, wanted: &str) -> bool {
    let local = actual.rsplit('/').next().unwrap_or(actual);
    local.eq_ignore_ascii_case(wanted)
}

fn apply_jsonld_product(data: &mut PageData, product: &Value) {
    data.name = product.get("name").and_then(scalar_string);
    data.sku = product.get("sku").and_then(scalar_string);
    data.image_url = product.get("image").and_then(image_value);
    data.category = product.get("category").and_then(|c| {
        scalar_string(c).or_else(|| c.get("name").and_then(scalar_string))
    });
    data.group_id = product
        .get("productGroupID")
        .or_else(|| product.get("inProductGroupWithID"))
        .and_then(scalar_string);
    data.variant_id = product.get("productID").and_then(scalar_string);

    if let Some(variants) = product.get("hasVariant").and_then(Value::as_array) {
        data.variant_ids = variants
            .iter()
            .filter_map(|v| {
                v.get("productID")
                    .or_else(|| v.get("sku"))
                    .and_then(scalar_string)
            })
            .collect();
    }

    let offers: Vec<&Value> = match product.get("offers") {
        Some(Value::Array(list)) => list.iter().collect(),
        Some(obj @ Value::Object(_)) => vec![obj],
        _ => Vec::new(),
    };
    // Flatten `AggregateOffer { offers: [...] }` one level.
    let offers: Vec<&Value> = offers
        .into_iter()
        .flat_map(|o| match o.get("offers") {
            Some(Value::Array(inner)) if !inner.is_empty() => inner.iter().collect(),
            _ => vec![o],
        })
        .collect();

    // A ProductGroup's own SKU may be absent; take the first offer's.
    if data.sku.is_none() {
        data.sku = offers.iter().find_map(|o| o.get("sku").and_then(scalar_string));
    }

    data.price = offers.iter().find_map(|o| {
        o.get("price")
            .or_else(|| o.get("lowPrice"))
            .and_then(decimal_value)
            .or_else(|| {
                o.get("priceSpecification")
                    .and_then(|spec| spec_prices(spec).find(|(kind, _)| !is_list_price(kind)))
                    .map(|(_, price)| price)
            })
    });
    data.rrp = offers.iter().find_map(|o| {
        o.get("priceSpecification")
            .and_then(|spec| spec_prices(spec).find(|(kind, _)| is_list_price(kind)))
            .map(|(_, price)| price)
    });
}

/// `(priceType, price)` pairs from an object-or-array `priceSpecification`.
fn spec_prices(spec: &Value) -> impl Iterator<Item = (String, Decimal)> + '_ {
    let specs: Vec<&Value> = match spec {
        Value::Array(list) => list.iter().collect(),
        other => vec![other],
    };
    specs.into_iter().filter_map(|s| {
        let price = s.get("price").and_then(decimal_value)?;
        let kind = s
            .get("priceType")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        Some((kind, price))
    })
}

fn is_list_price(price_type: &str) -> bool {
    let t = price_type.to_ascii_lowercase();
    t.ends_with("listprice") || t.ends_with("strikethroughprice") || t.ends_with("msrp")
}

fn jsonld_breadcrumbs(list: &Value) -> Vec<String> {
    let Some(elements) = list.get("itemListElement").and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut crumbs: Vec<(i64, String)> = elements
        .iter()
        .enumerate()
        .filter_map(|(idx, el)| {
            let name = el
                .get("name")
                .and_then(scalar_string)
                .or_else(|| el.get("item").and_then(|i| i.get("name")).and_then(scalar_string))?;
            let position = el
                .get("position")
                .and_then(|p| p.as_i64().or_else(|| p.as_str().and_then(|s| s.parse().ok())))
                .unwrap_or_else(|| i64::try_from(idx).unwrap_or(i64::MAX));
            Some((position, clean_text(&name)))
        })
        .filter(|(_, name)| !name.is_empty())
        .collect();
    crumbs.sort_by_key(|(position, _)| *position);
    crumbs.into_iter().map(|(_, name)| name).collect()
}

fn apply_html_fallbacks(data: &mut PageData, html: &str) {
    if data.name.is_none() {
        data.name = meta_content(html, "property", "og:title")
            .or_else(|| itemprop_value(html, "name"))
            .or_else(|| first_text(&H1_RE, html))
            .or_else(|| first_text(&TITLE_RE, html));
    }
    if data.sku.is_none() {
        data.sku = itemprop_value(html, "sku");
    }
    if data.price.is_none() {
        data.price = itemprop_value(html, "price")
            .or_else(|| meta_content(html, "property", "product:price:amount"))
            .or_else(|| meta_content(html, "property", "og:price:amount"))
            .and_then(|p| parse_price_text(&p));
    }
    if data.image_url.is_none() {
        data.image_url =
            meta_content(html, "property", "og:image").or_else(|| itemprop_value(html, "image"));
    }
    if data.breadcrumbs.is_empty() {
        data.breadcrumbs = html_breadcrumbs(html);
    }
}

/// Text of `<li>` items (or bare links) inside the first element whose
/// class mentions `breadcrumb`.
fn html_breadcrumbs(html: &str) -> Vec<String> {
    let Some(block) = BREADCRUMB_BLOCK_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
    else {
        return Vec::new();
    };
    let mut crumbs: Vec<String> = LI_RE
        .captures_iter(block)
        .filter_map(|c| c.get(1))
        .map(|m| clean_text(m.as_str()))
        .filter(|s| !s.is_empty())
        .collect();
    if crumbs.is_empty() {
        crumbs = ANCHOR_TEXT_RE
            .captures_iter(block)
            .filter_map(|c| c.get(1))
            .map(|m| clean_text(m.as_str()))
            .filter(|s| !s.is_empty())
            .collect();
    }
    crumbs
}

/// Deepest breadcrumb that is neither the home link nor the product.
fn category_from_breadcrumbs(crumbs: &[String], name: Option<&str>) -> Option<String> {
    crumbs
        .iter()
        .rev()
        .find(|c| {
            !c.eq_ignore_ascii_case("home") && name.is_none_or(|n| !c.eq_ignore_ascii_case(n.trim()))
        })
        .cloned()
}

/// `content` of the first `<meta>` whose `key_attr` equals `key_value`.
#[must_use]
pub fn meta_content(html: &str, key_attr: &str, key_value: &str) -> Option<String> {
    META_TAG_RE.find_iter(html).find_map(|m| {
        let tag = m.as_str();
        let key = extract_attr(tag, key_attr)?;
        if key.eq_ignore_ascii_case(key_value) {
            extract_attr(tag, "content")
                .map(|c| decode_entities(&c))
                .filter(|c| !c.trim().is_empty())
        } else {
            None
        }
    })
}

/// Value of an `itemprop` element: its `content` attribute, else its text.
#[must_use]
pub fn itemprop_value(html: &str, prop: &str) -> Option<String> {
    ITEMPROP_ELEMENT_RE.captures_iter(html).find_map(|cap| {
        if !cap.get(3)?.as_str().eq_ignore_ascii_case(prop) {
            return None;
        }
        let attrs = cap.get(2)?.as_str();
        if let Some(content) = extract_attr(attrs, "content") {
            return Some(decode_entities(&content)).filter(|c| !c.trim().is_empty());
        }
        let tag_name = cap.get(1)?.as_str();
        let rest = &html[cap.get(0)?.end()..];
        let close = format!("</{tag_name}");
        let end = rest.to_ascii_lowercase().find(&close.to_ascii_lowercase())?;
        Some(clean_text(&rest[..end])).filter(|t| !t.is_empty())
    })
}

fn link_href(html: &str, rel: &str) -> Option<String> {
    LINK_TAG_RE.find_iter(html).find_map(|m| {
        let tag = m.as_str();
        let tag_rel = extract_attr(tag, "rel")?;
        if tag_rel.eq_ignore_ascii_case(rel) {
            extract_attr(tag, "href")
        } else {
            None
        }
    })
}

/// Raw `href` values of every anchor, entity-decoded.
#[must_use]
pub fn anchor_hrefs(html: &str) -> Vec<String> {
    ANCHOR_TAG_RE
        .find_iter(html)
        .filter_map(|m| extract_attr(m.as_str(), "href"))
        .map(|href| decode_entities(&href))
        .collect()
}

/// Value of attribute `attr` inside a single tag's source.
#[must_use]
pub fn extract_attr(tag: &str, attr: &str) -> Option<String> {
    ATTR_RE
        .captures_iter(tag)
        .find(|c| c.get(1).is_some_and(|name| name.as_str().eq_ignore_ascii_case(attr)))
        .and_then(|c| c.get(2).or_else(|| c.get(3)))
        .map(|m| m.as_str().trim().to_owned())
}

fn first_text(re: &Regex, html: &str) -> Option<String> {
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| clean_text(m.as_str()))
        .filter(|s| !s.is_empty())
}

/// Strips tags, decodes entities, and collapses whitespace.
#[must_use]
pub fn clean_text(fragment: &str) -> String {
    let no_tags = TAG_RE.replace_all(fragment, " ");
    let decoded = decode_entities(&no_tags);
    WS_RE.replace_all(decoded.trim(), " ").into_owned()
}

/// Decodes the named entities storefronts actually emit plus numeric ones.
#[must_use]
pub fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    "ndash" => Some('–'),
                    "rsaquo" => Some('›'),
                    "raquo" => Some('»'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_owned(), |c| c.to_string())
        })
        .into_owned()
}

/// Parses display prices such as `"$1,299.95"`, `"AU$ 12"`, or `"12,50"`.
#[must_use]
pub fn parse_price_text(text: &str) -> Option<Decimal> {
    let decoded = decode_entities(text);
    let start = decoded.find(|c: char| c.is_ascii_digit())?;
    let numeric: String = decoded[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let numeric = numeric.trim_end_matches(['.', ',']);

    let normalized = match (numeric.rfind('.'), numeric.rfind(',')) {
        // "12,50": a lone comma with two trailing digits is a decimal mark.
        (None, Some(comma)) if numeric.len() - comma == 3 && numeric.matches(',').count() == 1 => {
            numeric.replace(',', ".")
        }
        // "1.299,95"
        (Some(dot), Some(comma)) if comma > dot => numeric.replace('.', "").replace(',', "."),
        _ => numeric.replace(',', ""),
    };
    Decimal::from_str(&normalized).ok()
}

/// A JSON string, or a number rendered as a string.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(clean_text(s)).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn decimal_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => parse_price_text(s),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

/// `image` may be a URL string, a list of them, or an `ImageObject`.
fn image_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Array(items) => items.iter().find_map(image_value),
        Value::Object(_) => value
            .get("url")
            .or_else(|| value.get("contentUrl"))
            .and_then(image_value),
        _ => None,
    }
}

#[cfg(test)]
#[path = "page_test.rs"]
mod tests;
