use std::path::PathBuf;

use crate::app_config::{AppConfig, Platform};
use crate::ConfigError;

pub const MIN_CONCURRENCY: usize = 1;
pub const MAX_CONCURRENCY: usize = 10;
pub const MAX_DELAY_MS: u64 = 5000;
pub const MAX_CRAWL_ITEMS: usize = 1000;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed or is out of range.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed or is out of range.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every variable is optional. Decoupled from the process environment so it
/// can be tested with a plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: bool| -> Result<bool, ConfigError> {
        match lookup(var) {
            Err(_) => Ok(default),
            Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                other => Err(invalid(var, format!("expected a boolean, got '{other}'"))),
            },
        }
    };

    let in_range = |var: &str, value: u64, min: u64, max: u64| -> Result<u64, ConfigError> {
        if (min..=max).contains(&value) {
            Ok(value)
        } else {
            Err(invalid(
                var,
                format!("{value} is outside the allowed range {min}..={max}"),
            ))
        }
    };

    let platform = or_default("SKUSCAN_PLATFORM", "shopify")
        .parse::<Platform>()
        .map_err(|reason| invalid("SKUSCAN_PLATFORM", reason))?;

    let origin = optional("SKUSCAN_ORIGIN");
    let url_template = optional("SKUSCAN_URL_TEMPLATE");
    if let Some(template) = &url_template {
        validate_url_template(template)
            .map_err(|reason| invalid("SKUSCAN_URL_TEMPLATE", reason))?;
    }

    let concurrency = in_range(
        "SKUSCAN_CONCURRENCY",
        parse_u64("SKUSCAN_CONCURRENCY", "3")?,
        MIN_CONCURRENCY as u64,
        MAX_CONCURRENCY as u64,
    )?;
    let delay_ms = in_range(
        "SKUSCAN_DELAY_MS",
        parse_u64("SKUSCAN_DELAY_MS", "0")?,
        0,
        MAX_DELAY_MS,
    )?;
    let fast_mode = parse_bool("SKUSCAN_FAST_MODE", false)?;
    let cache_ttl_secs = parse_u64("SKUSCAN_CACHE_TTL_SECS", "3600")?;
    let max_items = in_range(
        "SKUSCAN_MAX_ITEMS",
        parse_u64("SKUSCAN_MAX_ITEMS", "50")?,
        1,
        MAX_CRAWL_ITEMS as u64,
    )?;

    let request_timeout_secs = in_range(
        "SKUSCAN_REQUEST_TIMEOUT_SECS",
        parse_u64("SKUSCAN_REQUEST_TIMEOUT_SECS", "30")?,
        1,
        300,
    )?;
    let user_agent = or_default("SKUSCAN_USER_AGENT", "skuscan/0.1 (catalog-resolver)");
    let catalog_page_size = u32::try_from(in_range(
        "SKUSCAN_CATALOG_PAGE_SIZE",
        parse_u64("SKUSCAN_CATALOG_PAGE_SIZE", "250")?,
        1,
        250,
    )?)
    .map_err(|e| invalid("SKUSCAN_CATALOG_PAGE_SIZE", e.to_string()))?;
    let catalog_page_delay_ms = parse_u64("SKUSCAN_CATALOG_PAGE_DELAY_MS", "100")?;
    let strip_leading_zeros = parse_bool("SKUSCAN_STRIP_LEADING_ZEROS", true)?;

    let log_level = or_default("SKUSCAN_LOG_LEVEL", "info");
    let sites_path = PathBuf::from(or_default("SKUSCAN_SITES_PATH", "./config/sites.yaml"));

    Ok(AppConfig {
        platform,
        origin,
        url_template,
        // Bounded to 1..=10 above, so the casts cannot truncate.
        concurrency: usize::try_from(concurrency).unwrap_or(MIN_CONCURRENCY),
        delay_ms,
        fast_mode,
        cache_ttl_secs,
        max_items: usize::try_from(max_items).unwrap_or(MAX_CRAWL_ITEMS),
        request_timeout_secs,
        user_agent,
        catalog_page_size,
        catalog_page_delay_ms,
        strip_leading_zeros,
        log_level,
        sites_path,
    })
}

/// Checks that a URL template contains the `{sku}` placeholder.
///
/// # Errors
///
/// Returns a human-readable reason when the placeholder is missing.
pub fn validate_url_template(template: &str) -> Result<(), String> {
    if template.contains("{sku}") {
        Ok(())
    } else {
        Err(format!("template '{template}' has no {{sku}} placeholder"))
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
