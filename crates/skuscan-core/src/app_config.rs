use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Storefront platform a batch is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Shopify,
    Neto,
    #[serde(alias = "woo", alias = "wordpress")]
    WooCommerce,
}

impl Platform {
    /// Whether the platform exposes a bulk product feed that can be indexed.
    #[must_use]
    pub fn supports_catalog(self) -> bool {
        matches!(self, Platform::Shopify)
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Shopify => write!(f, "shopify"),
            Platform::Neto => write!(f, "neto"),
            Platform::WooCommerce => write!(f, "woocommerce"),
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shopify" => Ok(Platform::Shopify),
            "neto" | "maropost" => Ok(Platform::Neto),
            "woocommerce" | "woo" | "wordpress" => Ok(Platform::WooCommerce),
            other => Err(format!(
                "unknown platform '{other}'; expected shopify, neto, or woocommerce"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub platform: Platform,
    /// Base URL of the target site, e.g. `https://shop.example.com`.
    pub origin: Option<String>,
    /// Target URL pattern with a `{sku}` placeholder.
    pub url_template: Option<String>,
    pub concurrency: usize,
    /// Wait before each request an item resolution sends.
    pub delay_ms: u64,
    /// Answer from the catalog only; never visit product pages.
    pub fast_mode: bool,
    pub cache_ttl_secs: u64,
    /// Upper bound on product links taken from a crawled category page.
    pub max_items: usize,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub catalog_page_size: u32,
    pub catalog_page_delay_ms: u64,
    pub strip_leading_zeros: bool,
    pub log_level: String,
    pub sites_path: PathBuf,
}

impl AppConfig {
    /// Applies a site preset over the current values.
    ///
    /// The preset's URL template only wins when none was configured.
    pub fn apply_site(&mut self, site: &crate::SiteConfig) {
        self.platform = site.platform;
        self.origin = Some(site.origin.clone());
        if self.url_template.is_none() {
            self.url_template.clone_from(&site.url_template);
        }
    }
}

impl Default for AppConfig {
    /// Mirrors the values used when no environment variable is set.
    fn default() -> Self {
        Self {
            platform: Platform::Shopify,
            origin: None,
            url_template: None,
            concurrency: 3,
            delay_ms: 0,
            fast_mode: false,
            cache_ttl_secs: 3600,
            max_items: 50,
            request_timeout_secs: 30,
            user_agent: "skuscan/0.1 (catalog-resolver)".to_string(),
            catalog_page_size: 250,
            catalog_page_delay_ms: 100,
            strip_leading_zeros: true,
            log_level: "info".to_string(),
            sites_path: PathBuf::from("./config/sites.yaml"),
        }
    }
}
