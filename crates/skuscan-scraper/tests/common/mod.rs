//! Shared fixtures for the wiremock-backed integration tests.

#![allow(dead_code)]

use serde_json::{json, Value};
use skuscan_scraper::StoreClient;

/// 5-second timeout, descriptive UA.
pub fn test_client() -> StoreClient {
    StoreClient::new(5, "skuscan-test/0.1").expect("failed to build test StoreClient")
}

/// One `products.json` product. Each variant is `(id, sku, price, compare_at)`.
pub fn feed_product(
    id: i64,
    handle: &str,
    title: &str,
    variants: &[(i64, Option<&str>, &str, Option<&str>)],
) -> Value {
    let variants: Vec<Value> = variants
        .iter()
        .map(|(vid, sku, price, compare_at)| {
            json!({
                "id": vid,
                "title": "Default Title",
                "sku": sku,
                "price": price,
                "compare_at_price": compare_at,
                "available": true
            })
        })
        .collect();
    json!({
        "id": id,
        "title": title,
        "handle": handle,
        "product_type": "Swags",
        "published_at": "2024-01-01T00:00:00+10:00",
        "images": [{"src": format!("https://cdn.example.com/{handle}.jpg")}],
        "variants": variants
    })
}

pub fn products_page(products: Vec<Value>) -> Value {
    json!({ "products": products })
}

/// A two-product catalog page: `ABC-1` on product 1 and `073302` on
/// product 2 (which also has a SKU-less variant).
pub fn two_product_page() -> Value {
    products_page(vec![
        feed_product(
            1,
            "swag-deluxe",
            "Swag Deluxe",
            &[(101, Some("ABC-1"), "199.00", Some("249.00"))],
        ),
        feed_product(
            2,
            "camp-chair",
            "Camp Chair",
            &[(201, Some("073302"), "49.95", None), (202, None, "49.95", None)],
        ),
    ])
}

/// Product page carrying only a breadcrumb trail.
pub fn breadcrumb_page(trail: &[&str]) -> String {
    let items: Vec<Value> = trail
        .iter()
        .enumerate()
        .map(|(i, name)| json!({"@type": "ListItem", "position": i + 1, "name": name}))
        .collect();
    let list = json!({
        "@context": "https://schema.org",
        "@type": "BreadcrumbList",
        "itemListElement": items
    });
    format!(
        "<html><head><script type=\"application/ld+json\">{list}</script></head><body></body></html>"
    )
}

/// Product page with JSON-LD `Product` markup.
pub fn product_page(name: &str, sku: &str, price: &str) -> String {
    let product = json!({
        "@context": "https://schema.org",
        "@type": "Product",
        "name": name,
        "sku": sku,
        "offers": {"@type": "Offer", "price": price, "priceCurrency": "AUD"}
    });
    format!(
        "<html><head><script type=\"application/ld+json\">{product}</script></head><body><h1>{name}</h1></body></html>"
    )
}
