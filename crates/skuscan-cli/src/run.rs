//! Command handlers for the CLI.
//!
//! Each handler builds a [`Pipeline`] from the final configuration, runs
//! it, and prints JSON to stdout. Per-item failures are reported inside the
//! output rather than as a non-zero exit.

use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use skuscan_core::config::MAX_CRAWL_ITEMS;
use skuscan_core::{
    load_sites, normalize_rows, rows_from_json, rows_from_lines, AppConfig, Item, ScrapeResult,
};
use skuscan_scraper::Pipeline;

/// Applies the named preset from `config.sites_path`.
pub(crate) fn apply_site_preset(config: &mut AppConfig, name: &str) -> anyhow::Result<()> {
    let path = config.sites_path.clone();
    let sites = load_sites(&path)?;
    let site = sites
        .find(name)
        .ok_or_else(|| anyhow::anyhow!("site '{name}' not found in {}", path.display()))?;
    tracing::debug!(
        site = %site.name,
        origin = %site.origin,
        platform = %site.platform,
        "applying site preset"
    );
    config.apply_site(site);
    Ok(())
}

/// Merges `--input` rows with `--sku`/`--url` flags into deduplicated items.
///
/// # Errors
///
/// Returns an error if the input file cannot be read or parsed, or if no
/// usable item remains.
pub(crate) fn collect_items(
    skus: &[String],
    urls: &[String],
    input: Option<&Path>,
) -> anyhow::Result<Vec<Item>> {
    let mut rows = match input {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            rows_from_json(&text).with_context(|| format!("invalid rows in {}", path.display()))?
        }
        None => Vec::new(),
    };
    rows.extend(rows_from_lines(&skus.join("\n"), &urls.join("\n")));

    let items = normalize_rows(&rows);
    if items.is_empty() {
        anyhow::bail!("nothing to resolve; pass --sku, --url, or --input");
    }
    Ok(items)
}

pub(crate) fn clamp_max_items(max_items: usize) -> usize {
    max_items.clamp(1, MAX_CRAWL_ITEMS)
}

pub(crate) async fn run_scrape(config: AppConfig, items: &[Item]) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(config).context("failed to build HTTP client")?;
    let results = pipeline.scrape_items(items).await;
    log_summary(&results);
    print_json(&results)
}

pub(crate) async fn run_crawl(config: AppConfig, page_url: &str) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(config).context("failed to build HTTP client")?;
    let results = pipeline
        .scrape_by_page(page_url)
        .await
        .with_context(|| format!("failed to load category page {page_url}"))?;
    log_summary(&results);
    print_json(&results)
}

/// Prints the catalog as JSON and optionally writes the SKU list file.
///
/// An empty catalog is not an error here; the feed may simply be closed.
pub(crate) async fn run_index(
    config: AppConfig,
    origin: &str,
    skus_out: Option<&Path>,
) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(config).context("failed to build HTTP client")?;
    let (catalog, count) = pipeline.index_catalog(origin).await;
    if count == 0 {
        tracing::warn!(origin, "catalog is empty; the products feed may be disabled");
    }

    if let Some(path) = skus_out {
        std::fs::write(path, catalog.sku_list_text())
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), skus = count, "wrote SKU list");
    }
    print_json(&catalog.sorted_records())
}

fn log_summary(results: &[ScrapeResult]) {
    let failed = results.iter().filter(|r| r.is_error()).count();
    tracing::info!(
        items = results.len(),
        resolved = results.len() - failed,
        failed,
        "done"
    );
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
