use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn build_app_config_uses_defaults_when_env_is_empty() {
    let map: HashMap<&str, &str> = HashMap::new();
    let config = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(config.platform, Platform::Shopify);
    assert!(config.origin.is_none());
    assert!(config.url_template.is_none());
    assert_eq!(config.concurrency, 3);
    assert_eq!(config.delay_ms, 0);
    assert!(!config.fast_mode);
    assert_eq!(config.cache_ttl_secs, 3600);
    assert_eq!(config.max_items, 50);
    assert_eq!(config.request_timeout_secs, 30);
    assert_eq!(config.catalog_page_size, 250);
    assert_eq!(config.catalog_page_delay_ms, 100);
    assert!(config.strip_leading_zeros);
    assert_eq!(config.log_level, "info");
    assert_eq!(
        config.sites_path,
        std::path::PathBuf::from("./config/sites.yaml")
    );
}

#[test]
fn build_app_config_reads_overrides() {
    let mut map = HashMap::new();
    map.insert("SKUSCAN_PLATFORM", "woocommerce");
    map.insert("SKUSCAN_ORIGIN", "https://shop.example.com");
    map.insert("SKUSCAN_URL_TEMPLATE", "https://shop.example.com/p/{sku}");
    map.insert("SKUSCAN_CONCURRENCY", "10");
    map.insert("SKUSCAN_DELAY_MS", "250");
    map.insert("SKUSCAN_FAST_MODE", "true");
    map.insert("SKUSCAN_STRIP_LEADING_ZEROS", "no");
    let config = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(config.platform, Platform::WooCommerce);
    assert_eq!(config.origin.as_deref(), Some("https://shop.example.com"));
    assert_eq!(
        config.url_template.as_deref(),
        Some("https://shop.example.com/p/{sku}")
    );
    assert_eq!(config.concurrency, 10);
    assert_eq!(config.delay_ms, 250);
    assert!(config.fast_mode);
    assert!(!config.strip_leading_zeros);
}

#[test]
fn build_app_config_treats_blank_origin_as_absent() {
    let mut map = HashMap::new();
    map.insert("SKUSCAN_ORIGIN", "   ");
    let config = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(config.origin.is_none());
}

#[test]
fn build_app_config_rejects_concurrency_above_ten() {
    let mut map = HashMap::new();
    map.insert("SKUSCAN_CONCURRENCY", "11");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SKUSCAN_CONCURRENCY"),
        "expected InvalidEnvVar(SKUSCAN_CONCURRENCY), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_zero_concurrency() {
    let mut map = HashMap::new();
    map.insert("SKUSCAN_CONCURRENCY", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::InvalidEnvVar { .. })));
}

#[test]
fn build_app_config_rejects_non_numeric_delay() {
    let mut map = HashMap::new();
    map.insert("SKUSCAN_DELAY_MS", "fast");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SKUSCAN_DELAY_MS"),
        "expected InvalidEnvVar(SKUSCAN_DELAY_MS), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_unknown_platform() {
    let mut map = HashMap::new();
    map.insert("SKUSCAN_PLATFORM", "magento");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SKUSCAN_PLATFORM"));
}

#[test]
fn build_app_config_rejects_template_without_placeholder() {
    let mut map = HashMap::new();
    map.insert("SKUSCAN_URL_TEMPLATE", "https://shop.example.com/p/");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SKUSCAN_URL_TEMPLATE"));
}

#[test]
fn build_app_config_rejects_garbage_boolean() {
    let mut map = HashMap::new();
    map.insert("SKUSCAN_FAST_MODE", "maybe");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SKUSCAN_FAST_MODE"));
}

#[test]
fn build_app_config_rejects_oversized_catalog_page() {
    let mut map = HashMap::new();
    map.insert("SKUSCAN_CATALOG_PAGE_SIZE", "500");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::InvalidEnvVar { .. })));
}

#[test]
fn platform_parses_aliases() {
    assert_eq!("Shopify".parse::<Platform>(), Ok(Platform::Shopify));
    assert_eq!("maropost".parse::<Platform>(), Ok(Platform::Neto));
    assert_eq!("WordPress".parse::<Platform>(), Ok(Platform::WooCommerce));
    assert!("magento".parse::<Platform>().is_err());
}

#[test]
fn platform_display_round_trips_through_from_str() {
    for platform in [Platform::Shopify, Platform::Neto, Platform::WooCommerce] {
        assert_eq!(platform.to_string().parse::<Platform>(), Ok(platform));
    }
}

#[test]
fn only_shopify_supports_catalog() {
    assert!(Platform::Shopify.supports_catalog());
    assert!(!Platform::Neto.supports_catalog());
    assert!(!Platform::WooCommerce.supports_catalog());
}
