//! Application state management

use std::sync::Arc;

use url::Url;

use crate::cache::ResultCache;
use crate::config::Config;
use crate::datasource::{BoardGameSource, MemoryDataSource};
use crate::error::{Error, Result};
use crate::listing::ListingService;
use crate::record::BoardGame;

/// Listing service for board games, as served over HTTP
pub type BoardGameListing = ListingService<BoardGame, BoardGameSource>;

/// Application state shared across handlers
///
/// Cloning is cheap; everything lives behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    listing: Arc<BoardGameListing>,
    public_base_url: Option<Url>,
}

impl AppState {
    /// Build state around an already chosen data source
    pub fn new(config: Config, source: BoardGameSource) -> Result<Self> {
        let public_base_url = config
            .service
            .public_base_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw).map_err(|e| {
                    Error::InvalidConfig(format!("service.public_base_url '{}': {}", raw, e))
                })
            })
            .transpose()?;

        let cache = Arc::new(ResultCache::from_config(&config.cache));
        let listing = ListingService::from_config(&config, source, cache)?;

        Ok(Self {
            config: Arc::new(config),
            listing: Arc::new(listing),
            public_base_url,
        })
    }

    /// Build state, choosing the data source from configuration
    ///
    /// With the `database` feature and a `[database]` section, board games
    /// come from PostgreSQL. Otherwise they are held in memory, seeded from
    /// `listing.seed_path` when set.
    pub async fn from_config(config: Config) -> Result<Self> {
        let source = Self::connect_source(&config).await?;
        tracing::info!(source = source.kind(), "Data source ready");
        Self::new(config, source)
    }

    async fn connect_source(config: &Config) -> Result<BoardGameSource> {
        #[cfg(feature = "database")]
        {
            if let Some(db) = &config.database {
                let pool = crate::database::create_pool(db).await?;
                return Ok(BoardGameSource::Postgres(
                    crate::datasource::PgBoardGameSource::new(pool),
                ));
            }
        }

        #[cfg(not(feature = "database"))]
        {
            if config.database.is_some() {
                tracing::warn!(
                    "[database] is configured but the `database` feature is disabled; \
                     using in-memory records"
                );
            }
        }

        let memory = match &config.listing.seed_path {
            Some(path) => MemoryDataSource::load_json(path).await?,
            None => {
                tracing::warn!("No listing.seed_path configured; starting with no records");
                MemoryDataSource::default()
            }
        };
        Ok(BoardGameSource::Memory(Arc::new(memory)))
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn listing(&self) -> &BoardGameListing {
        &self.listing
    }

    pub fn cache(&self) -> &Arc<ResultCache<BoardGame>> {
        self.listing.cache()
    }

    /// Configured public base URL, if any
    pub fn public_base_url(&self) -> Option<&Url> {
        self.public_base_url.as_ref()
    }
}
