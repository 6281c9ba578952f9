pub mod aggregate;
pub mod app_config;
pub mod config;
pub mod items;
pub mod results;
pub mod sites;

use thiserror::Error;

pub use aggregate::assemble;
pub use app_config::{AppConfig, Platform};
pub use config::{load_app_config, load_app_config_from_env};
pub use items::{normalize_rows, rows_from_json, rows_from_lines, Item, RawRow};
pub use results::{discount_percent, ScrapeResult};
pub use sites::{load_sites, parse_sites, SiteConfig, SitesFile};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sites file {path}: {source}")]
    SitesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sites file: {0}")]
    SitesFileParse(#[from] serde_yaml::Error),

    #[error("invalid input rows: {0}")]
    InputParse(#[from] serde_json::Error),

    #[error("config validation failed: {0}")]
    Validation(String),
}
