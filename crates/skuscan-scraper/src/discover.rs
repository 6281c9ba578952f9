//! Crawl discovery: product links from a category or listing page.

use skuscan_core::{normalize_rows, rows_from_lines, Item};

use crate::client::StoreClient;
use crate::error::ScraperError;
use crate::resolver::Resolver;

/// Fetches `page_url` and returns up to `max_items` product links in page
/// order, filtered by the resolver's product-URL shape.
///
/// # Errors
///
/// Returns the fetch error for the category page itself.
pub async fn discover_product_links<R: Resolver>(
    client: &StoreClient,
    resolver: &R,
    page_url: &str,
    max_items: usize,
) -> Result<Vec<String>, ScraperError> {
    let html = client.fetch_html(page_url).await?;
    let mut links = resolver.product_links(&html, page_url);
    let found = links.len();
    links.truncate(max_items);
    tracing::info!(
        page_url,
        platform = %resolver.platform(),
        found,
        kept = links.len(),
        "discovered product links"
    );
    Ok(links)
}

/// URL-only items for discovered links.
#[must_use]
pub fn links_to_items(links: &[String]) -> Vec<Item> {
    normalize_rows(&rows_from_lines("", &links.join("\n")))
}
