//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: BGLIST_, nested keys separated by `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/bglist-service/config.toml
//! 4. System directory: /etc/bglist-service/config.toml
//! 5. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

const ENV_PREFIX: &str = "BGLIST_";
const APP_DIR: &str = "bglist-service";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// Result cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Listing endpoint rules (sortable columns, page sizes)
    #[serde(default)]
    pub listing: ListingConfig,

    /// Middleware configuration
    #[serde(default)]
    pub middleware: MiddlewareConfig,

    /// Database configuration (optional, used with the `database` feature)
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Environment (dev, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Public base URL used for navigation links (e.g. `https://api.example.com`).
    /// When unset, links are built from the request's `Host` header, which
    /// the client controls; set this for internet-facing deployments.
    #[serde(default)]
    pub public_base_url: Option<String>,
}

/// Result cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Time-to-live of a cached page, measured from insertion
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    /// Upper bound on cached pages; the oldest entries are evicted first
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,

    /// Interval of the background sweep that drops expired entries
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
            max_entries: default_cache_max_entries(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Listing endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Column names clients may sort by (case-sensitive)
    #[serde(default = "default_sortable_columns")]
    pub sortable_columns: Vec<String>,

    /// Column used when the request has no `sortColumn`
    #[serde(default = "default_sort_column")]
    pub default_sort_column: String,

    /// Page size used when the request has no `pageSize`
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Largest accepted `pageSize`
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// `max-age` advertised to HTTP caches for list responses
    #[serde(default = "default_response_cache_secs")]
    pub response_cache_secs: u64,

    /// JSON file used to seed the in-memory data source
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            sortable_columns: default_sortable_columns(),
            default_sort_column: default_sort_column(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            response_cache_secs: default_response_cache_secs(),
            seed_path: None,
        }
    }
}

/// Middleware configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Request body size limit in MB
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,

    /// CORS configuration
    #[serde(default = "default_cors_mode")]
    pub cors_mode: String,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            body_limit_mb: default_body_limit_mb(),
            cors_mode: default_cors_mode(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum idle connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Maximum retry attempts for establishing database connection
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between retry attempts in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

// Default value functions
fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_cache_ttl() -> u64 {
    60
}

fn default_cache_max_entries() -> usize {
    1024
}

fn default_sweep_interval() -> u64 {
    30
}

fn default_sortable_columns() -> Vec<String> {
    ["Id", "Name", "Year", "LastModifiedDate"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_sort_column() -> String {
    "Name".to_string()
}

fn default_page_size() -> u32 {
    10
}

fn default_max_page_size() -> u32 {
    100
}

fn default_response_cache_secs() -> u64 {
    60
}

fn default_body_limit_mb() -> usize {
    10 // 10 MB
}

fn default_cors_mode() -> String {
    "permissive".to_string()
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    2
}

fn default_connection_timeout() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_delay() -> u64 {
    2
}

impl Config {
    /// Load configuration from all sources
    ///
    /// Files are merged lowest priority first: system directory, XDG config
    /// directory, then `./config.toml`. Environment variables (BGLIST_ prefix)
    /// override all file-based configs.
    pub fn load() -> Result<Self> {
        let config_paths = Self::find_config_paths();

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// Bypasses the XDG and system directories. Environment variables still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Find all possible config file paths, highest priority first
    fn find_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_DIR);
        if let Some(path) = xdg_dirs.find_config_file("config.toml") {
            paths.push(path);
        }

        paths.push(PathBuf::from("/etc").join(APP_DIR).join("config.toml"));
        paths
    }

    /// Reject values that would make the listing endpoint unusable
    pub fn validate(&self) -> Result<()> {
        let listing = &self.listing;
        if self.cache.ttl_secs == 0 {
            return Err(Error::InvalidConfig("cache.ttl_secs must be positive".into()));
        }
        if self.cache.max_entries == 0 {
            return Err(Error::InvalidConfig("cache.max_entries must be positive".into()));
        }
        if self.cache.sweep_interval_secs == 0 {
            return Err(Error::InvalidConfig(
                "cache.sweep_interval_secs must be positive".into(),
            ));
        }
        if listing.max_page_size == 0 || listing.default_page_size == 0 {
            return Err(Error::InvalidConfig("page sizes must be positive".into()));
        }
        if listing.default_page_size > listing.max_page_size {
            return Err(Error::InvalidConfig(format!(
                "listing.default_page_size ({}) exceeds listing.max_page_size ({})",
                listing.default_page_size, listing.max_page_size
            )));
        }
        if !listing
            .sortable_columns
            .iter()
            .any(|c| c == &listing.default_sort_column)
        {
            return Err(Error::InvalidConfig(format!(
                "listing.default_sort_column '{}' is not in listing.sortable_columns",
                listing.default_sort_column
            )));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: APP_DIR.to_string(),
                port: default_port(),
                log_level: default_log_level(),
                timeout_secs: default_timeout(),
                environment: default_environment(),
                public_base_url: None,
            },
            cache: CacheConfig::default(),
            listing: ListingConfig::default(),
            middleware: MiddlewareConfig::default(),
            database: None,
        }
    }
}
