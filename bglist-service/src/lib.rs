//! # bglist-service
//!
//! Paginated, filterable, sortable board game listing over HTTP, backed by a
//! time-bounded server-side result cache.
//!
//! ## Features
//!
//! - **Validated listing**: page index and size bounds, an allow-listed sort
//!   column, `ASC`/`DESC` order and a case-insensitive name filter, with every
//!   field error reported at once
//! - **Result cache**: pages cached per canonical query for a fixed TTL, one
//!   computation per key under concurrent misses, background expiry sweep
//! - **Fresh totals**: the matching record count is never cached
//! - **Data sources**: in-memory records seeded from JSON, or PostgreSQL with
//!   the `database` feature
//! - **Health checks**: liveness and readiness endpoints
//! - **Graceful shutdown**: SIGTERM/SIGINT drain requests, then close the cache
//!
//! ## Example
//!
//! ```rust,no_run
//! use bglist_service::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let state = AppState::from_config(config).await?;
//!     Server::new(state).serve().await
//! }
//! ```

pub mod cache;
pub mod config;
pub mod datasource;
pub mod error;
pub mod health;
pub mod http;
pub mod listing;
pub mod observability;
pub mod record;
pub mod responses;
pub mod server;
pub mod state;

#[cfg(feature = "database")]
pub mod database;

pub use error::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cache::{CacheStats, ResultCache};
    pub use crate::config::Config;
    pub use crate::datasource::{
        BoardGameSource, DataSource, DataSourceError, MemoryDataSource, NameFilter, RecordQuery,
    };

    #[cfg(feature = "database")]
    pub use crate::datasource::PgBoardGameSource;

    pub use crate::error::{Error, Result};
    pub use crate::health::{health, readiness};
    pub use crate::http::{list_board_games, router, LIST_PATH};
    pub use crate::listing::{
        CacheKey, ColumnValidator, ListResponse, ListingRules, ListingService, PageResult,
        QueryEngine, QueryParameters, RawListQuery,
    };
    pub use crate::observability::init_tracing;
    pub use crate::record::{BoardGame, BoardGameColumn, Record, SortColumn, SortOrder};
    pub use crate::responses::{FieldError, ValidationError};
    pub use crate::server::Server;
    pub use crate::state::{AppState, BoardGameListing};

    pub use axum::{
        extract::{Query, State},
        routing::get,
        Json, Router,
    };
    pub use serde::{Deserialize, Serialize};
    pub use tracing::{debug, error, info, warn};
}
