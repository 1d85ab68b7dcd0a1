//! Queryable record sources
//!
//! A [`DataSource`] answers a [`RecordQuery`]: a name filter, one typed
//! ordering, and a skip/take window. Sources always break sort ties by
//! ascending record id so that paging is deterministic.
//!
//! - [`MemoryDataSource`]: records held in process, optionally seeded from JSON
//! - `PgBoardGameSource` (feature `database`): board games stored in PostgreSQL
//! - [`BoardGameSource`]: whichever of the two the service was started with
//!
//! # Example
//!
//! ```rust
//! use bglist_service::datasource::{NameFilter, RecordQuery};
//! use bglist_service::record::{BoardGameColumn, SortOrder};
//!
//! let query = RecordQuery::new()
//!     .filter(NameFilter::new(Some("mars")))
//!     .order_by(BoardGameColumn::Year, SortOrder::Desc)
//!     .skip(20)
//!     .take(10);
//!
//! assert_eq!(query.offset(), 20);
//! assert_eq!(query.limit(), Some(10));
//! assert!(query.name_filter().matches("Terraforming Mars"));
//! ```

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;

use crate::record::{BoardGame, BoardGameColumn, Record, SortOrder};

pub mod memory;
#[cfg(feature = "database")]
pub mod postgres;

pub use memory::MemoryDataSource;
#[cfg(feature = "database")]
pub use postgres::PgBoardGameSource;

/// Failure reported by a data source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataSourceError {
    /// The source cannot be reached (connection refused, pool closed, outage)
    #[error("data source unavailable: {0}")]
    Unavailable(String),

    /// The source was reached but the query failed
    #[error("query failed: {0}")]
    Query(String),

    /// A returned row could not be turned into a record
    #[error("failed to decode record: {0}")]
    Decode(String),
}

/// Case-insensitive substring filter on a record's name
///
/// Both sides are Unicode-lowercased before matching. An absent or empty
/// filter matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameFilter {
    text: Option<String>,
    folded: Option<String>,
}

impl NameFilter {
    pub fn new(text: Option<&str>) -> Self {
        match text.filter(|t| !t.is_empty()) {
            Some(t) => Self {
                text: Some(t.to_string()),
                folded: Some(t.to_lowercase()),
            },
            None => Self::default(),
        }
    }

    /// The filter as supplied by the caller
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none()
    }

    pub fn matches(&self, name: &str) -> bool {
        match &self.folded {
            Some(needle) => name.to_lowercase().contains(needle.as_str()),
            None => true,
        }
    }
}

/// A filtered, ordered, windowed query over records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery<C> {
    filter: NameFilter,
    order: Option<(C, SortOrder)>,
    offset: u64,
    limit: Option<u64>,
}

impl<C> Default for RecordQuery<C> {
    fn default() -> Self {
        Self {
            filter: NameFilter::default(),
            order: None,
            offset: 0,
            limit: None,
        }
    }
}

impl<C: Copy> RecordQuery<C> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, filter: NameFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: C, order: SortOrder) -> Self {
        self.order = Some((column, order));
        self
    }

    #[must_use]
    pub fn skip(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn take(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn name_filter(&self) -> &NameFilter {
        &self.filter
    }

    /// Requested ordering; `None` means id order only
    pub fn ordering(&self) -> Option<(C, SortOrder)> {
        self.order
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }
}

/// Backing store for listed records
///
/// Implementations are externally synchronised; every method may be called
/// concurrently from many requests.
pub trait DataSource<R: Record>: Send + Sync + 'static {
    /// Run a query and return the selected window of records
    fn materialize(
        &self,
        query: &RecordQuery<R::Column>,
    ) -> impl Future<Output = Result<Vec<R>, DataSourceError>> + Send;

    /// Number of records matching `filter`, ignoring order and window
    fn count(&self, filter: &NameFilter)
        -> impl Future<Output = Result<u64, DataSourceError>> + Send;

    /// Cheap reachability check used by the readiness check
    fn ping(&self) -> impl Future<Output = Result<(), DataSourceError>> + Send;
}

impl<R: Record, S: DataSource<R>> DataSource<R> for Arc<S> {
    fn materialize(
        &self,
        query: &RecordQuery<R::Column>,
    ) -> impl Future<Output = Result<Vec<R>, DataSourceError>> + Send {
        (**self).materialize(query)
    }

    fn count(
        &self,
        filter: &NameFilter,
    ) -> impl Future<Output = Result<u64, DataSourceError>> + Send {
        (**self).count(filter)
    }

    fn ping(&self) -> impl Future<Output = Result<(), DataSourceError>> + Send {
        (**self).ping()
    }
}

/// Board game source selected at startup
#[derive(Debug, Clone)]
pub enum BoardGameSource {
    Memory(Arc<MemoryDataSource<BoardGame>>),
    #[cfg(feature = "database")]
    Postgres(PgBoardGameSource),
}

impl BoardGameSource {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            #[cfg(feature = "database")]
            Self::Postgres(_) => "postgres",
        }
    }
}

impl DataSource<BoardGame> for BoardGameSource {
    async fn materialize(
        &self,
        query: &RecordQuery<BoardGameColumn>,
    ) -> Result<Vec<BoardGame>, DataSourceError> {
        match self {
            Self::Memory(source) => source.materialize(query).await,
            #[cfg(feature = "database")]
            Self::Postgres(source) => source.materialize(query).await,
        }
    }

    async fn count(&self, filter: &NameFilter) -> Result<u64, DataSourceError> {
        match self {
            Self::Memory(source) => source.count(filter).await,
            #[cfg(feature = "database")]
            Self::Postgres(source) => source.count(filter).await,
        }
    }

    async fn ping(&self) -> Result<(), DataSourceError> {
        match self {
            Self::Memory(source) => source.ping().await,
            #[cfg(feature = "database")]
            Self::Postgres(source) => source.ping().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::BoardGameColumn;

    #[test]
    fn test_name_filter_is_case_insensitive() {
        let filter = NameFilter::new(Some("a"));
        assert!(filter.matches("Axis & Allies"));
        assert!(filter.matches("Terraforming Mars"));
        assert!(!NameFilter::new(Some("z")).matches("Citadels"));

        let upper = NameFilter::new(Some("MARS"));
        assert!(upper.matches("Terraforming Mars"));
    }

    #[test]
    fn test_name_filter_unicode() {
        let filter = NameFilter::new(Some("ÉCLAT"));
        assert!(filter.matches("Les Éclats"));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        for filter in [NameFilter::new(None), NameFilter::new(Some(""))] {
            assert!(filter.is_empty());
            assert!(filter.matches(""));
            assert!(filter.matches("anything"));
        }
    }

    #[test]
    fn test_record_query_builder() {
        let query: RecordQuery<BoardGameColumn> = RecordQuery::new();
        assert_eq!(query.offset(), 0);
        assert_eq!(query.limit(), None);
        assert_eq!(query.ordering(), None);

        let query = query
            .order_by(BoardGameColumn::Name, SortOrder::Asc)
            .skip(5)
            .take(5);
        assert_eq!(query.ordering(), Some((BoardGameColumn::Name, SortOrder::Asc)));
        assert_eq!(query.offset(), 5);
        assert_eq!(query.limit(), Some(5));
    }
}
