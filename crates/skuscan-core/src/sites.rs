//! Named site presets loaded from `config/sites.yaml`.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::app_config::Platform;
use crate::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub origin: String,
    pub platform: Platform,
    #[serde(default)]
    pub url_template: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SitesFile {
    pub sites: Vec<SiteConfig>,
}

impl SitesFile {
    /// Finds a preset by name, ignoring case.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&SiteConfig> {
        self.sites
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
    }
}

/// Load and validate site presets from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sites(path: &Path) -> Result<SitesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SitesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_sites(&content)
}

/// Parse and validate site presets from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_sites(content: &str) -> Result<SitesFile, ConfigError> {
    let sites_file: SitesFile = serde_yaml::from_str(content)?;
    validate_sites(&sites_file)?;
    Ok(sites_file)
}

fn validate_sites(sites_file: &SitesFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();

    for site in &sites_file.sites {
        if site.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "site name must be non-empty".to_string(),
            ));
        }

        if !seen_names.insert(site.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate site name: '{}'",
                site.name
            )));
        }

        let origin = site.origin.trim();
        if !(origin.starts_with("https://") || origin.starts_with("http://"))
            || origin.len() <= "https://".len()
        {
            return Err(ConfigError::Validation(format!(
                "site '{}' has invalid origin '{}'; expected an http(s) URL",
                site.name, site.origin
            )));
        }

        if let Some(template) = &site.url_template {
            crate::config::validate_url_template(template).map_err(|reason| {
                ConfigError::Validation(format!("site '{}': {reason}", site.name))
            })?;
        }
    }

    Ok(())
}
