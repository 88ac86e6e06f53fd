//! Application configuration loading from config.toml
//!
//! Every setting has a default so the service starts with no file at all. The
//! database URL can additionally be overridden with the `DATABASE_URL` variable,
//! which is how deployments point the service at their own database file.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default dynamic-field prefix scanned for the "total desks" metric
pub const DEFAULT_DESK_FIELD_PREFIX: &str = "carteiras";

/// Technology toggles offered on a blank census form
pub const DEFAULT_TECHNOLOGY_RESOURCES: [&str; 6] = [
    "Computadores",
    "Notebooks",
    "Tablets",
    "Projetores",
    "Lousas digitais",
    "Impressoras",
];

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Database location
    pub database: DatabaseConfig,
    /// Census form behaviour
    pub census: CensusConfig,
    /// Dashboard aggregation settings
    pub dashboard: DashboardConfig,
    /// Access-control guard settings
    pub access: AccessConfig,
    /// Local fallback cache for settings blobs
    pub storage: StorageConfig,
}

/// `[server]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `"0.0.0.0:8080"`
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

/// `[database]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SeaORM` connection URL
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/school_census.sqlite?mode=rwc".to_string(),
        }
    }
}

/// `[census]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CensusConfig {
    /// Recorded as `submitted_by` when the submitter is not signed in
    pub anonymous_submitter: String,
    /// Planning year the projection columns refer to
    pub projection_year: i32,
    /// Fixed list of technology toggles shown on the form
    pub technology_resources: Vec<String>,
}

impl Default for CensusConfig {
    fn default() -> Self {
        Self {
            anonymous_submitter: "anonymous".to_string(),
            projection_year: 2026,
            technology_resources: DEFAULT_TECHNOLOGY_RESOURCES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// `[dashboard]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Prefix of the general-section dynamic field that holds the desk count
    pub desk_field_prefix: String,
    /// Offset applied to `submitted_at` before grouping submissions by day
    pub utc_offset_minutes: i32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            desk_field_prefix: DEFAULT_DESK_FIELD_PREFIX.to_string(),
            utc_offset_minutes: -180,
        }
    }
}

/// `[access]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Where unauthorized users are redirected
    pub default_page: String,
    /// Request header carrying the identity provider's user id
    pub user_header: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            default_page: "/admin".to_string(),
            user_header: "x-user-id".to_string(),
        }
    }
}

/// `[storage]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the local copies of settings blobs
    pub local_cache_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            local_cache_dir: PathBuf::from("data/local-cache"),
        }
    }
}

/// Parses configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    Ok(toml::from_str(contents)?)
}

/// Loads configuration from a TOML file
///
/// A missing file is not an error: defaults are used and a warning is logged.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or is not valid TOML.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path);

    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("Failed to read config file {}: {e}", path.display()),
        })?;
        parse_config(&contents)?
    } else {
        warn!("No config file at {}, using defaults", path.display());
        AppConfig::default()
    };

    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.database.url = url;
    }

    Ok(config)
}

/// Loads configuration from the default location (./config.toml)
pub fn load_default_config() -> Result<AppConfig> {
    load_config("config.toml")
}
