mod run;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use skuscan_core::config::{
    validate_url_template, MAX_CONCURRENCY, MAX_DELAY_MS, MIN_CONCURRENCY,
};
use skuscan_core::{AppConfig, Platform};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "skuscan")]
#[command(about = "Resolve store SKUs and product URLs into normalized product records")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve SKUs and product URLs; prints a JSON array of results.
    Scrape {
        /// SKU to resolve; repeatable.
        #[arg(long = "sku")]
        skus: Vec<String>,
        /// Product URL to resolve; repeatable.
        #[arg(long = "url")]
        urls: Vec<String>,
        /// JSON array of row objects with `sku` and/or `url` keys.
        #[arg(long)]
        input: Option<PathBuf>,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Resolve the product links found on a category or listing page.
    Crawl {
        page_url: String,
        #[arg(long)]
        max_items: Option<usize>,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Download a Shopify catalog; prints a JSON array of variant records.
    Index {
        /// Store origin; defaults to the configured or preset origin.
        origin: Option<String>,
        /// Also write the sorted SKU list to this file.
        #[arg(long)]
        skus_out: Option<PathBuf>,
        /// Named preset from the sites file.
        #[arg(long)]
        site: Option<String>,
        /// Index raw SKUs without stripping leading zeros.
        #[arg(long)]
        exact_skus: bool,
    },
}

/// Target store and batch tuning shared by `scrape` and `crawl`.
/// Flags override environment configuration and any `--site` preset.
#[derive(Debug, Default, Args)]
struct TargetArgs {
    /// Named preset from the sites file.
    #[arg(long)]
    site: Option<String>,
    #[arg(long)]
    platform: Option<Platform>,
    #[arg(long)]
    origin: Option<String>,
    /// Product URL pattern containing `{sku}`.
    #[arg(long)]
    url_template: Option<String>,
    #[arg(long)]
    concurrency: Option<usize>,
    #[arg(long)]
    delay_ms: Option<u64>,
    /// Answer from the catalog only; skip product page visits.
    #[arg(long)]
    fast: bool,
}

impl TargetArgs {
    /// Applies the preset first, then explicit flags on top of it.
    fn apply(&self, config: &mut AppConfig) -> anyhow::Result<()> {
        if let Some(name) = self.site.as_deref() {
            run::apply_site_preset(config, name)?;
        }
        if let Some(platform) = self.platform {
            config.platform = platform;
        }
        if let Some(origin) = &self.origin {
            config.origin = Some(origin.clone());
        }
        if let Some(template) = &self.url_template {
            validate_url_template(template).map_err(anyhow::Error::msg)?;
            config.url_template = Some(template.clone());
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY);
        }
        if let Some(delay_ms) = self.delay_ms {
            config.delay_ms = delay_ms.min(MAX_DELAY_MS);
        }
        if self.fast {
            config.fast_mode = true;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = skuscan_core::load_app_config()?;

    // Output goes to stdout; logs stay on stderr.
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Scrape {
            skus,
            urls,
            input,
            target,
        } => {
            target.apply(&mut config)?;
            let items = run::collect_items(&skus, &urls, input.as_deref())?;
            run::run_scrape(config, &items).await
        }
        Commands::Crawl {
            page_url,
            max_items,
            target,
        } => {
            target.apply(&mut config)?;
            if let Some(max_items) = max_items {
                config.max_items = run::clamp_max_items(max_items);
            }
            run::run_crawl(config, &page_url).await
        }
        Commands::Index {
            origin,
            skus_out,
            site,
            exact_skus,
        } => {
            if let Some(name) = site.as_deref() {
                run::apply_site_preset(&mut config, name)?;
            }
            if exact_skus {
                config.strip_leading_zeros = false;
            }
            let origin = origin
                .or_else(|| config.origin.clone())
                .ok_or_else(|| anyhow::anyhow!("no origin given; pass ORIGIN or --site"))?;
            run::run_index(config, &origin, skus_out.as_deref()).await
        }
    }
}
