//! Query engine
//!
//! Translates validated [`QueryParameters`] into a [`RecordQuery`] and runs it
//! against a [`DataSource`]. The total count is a separate call so it can be
//! computed fresh for every response, even when the page came from cache.

use std::marker::PhantomData;
use std::time::Instant;

use crate::datasource::{DataSource, NameFilter, RecordQuery};
use crate::error::Result;
use crate::listing::params::QueryParameters;
use crate::record::Record;

/// Executes list queries against a data source
#[derive(Debug)]
pub struct QueryEngine<R, S> {
    source: S,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record, S: DataSource<R>> QueryEngine<R, S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            _record: PhantomData,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Build the query for one page: filter, order, skip, take
    pub fn build_query(params: &QueryParameters<R::Column>) -> RecordQuery<R::Column> {
        RecordQuery::new()
            .filter(NameFilter::new(params.filter_text()))
            .order_by(params.sort_column(), params.sort_order())
            .skip(params.offset())
            .take(u64::from(params.page_size()))
    }

    /// Materialise one page of records
    pub async fn execute(&self, params: &QueryParameters<R::Column>) -> Result<Vec<R>> {
        let started = Instant::now();
        let query = Self::build_query(params);
        let records = self.source.materialize(&query).await?;

        tracing::debug!(
            filter = ?params.filter_text(),
            sort_column = ?params.sort_column(),
            sort_order = %params.sort_order(),
            page_index = params.page_index(),
            page_size = params.page_size(),
            returned = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Executed list query"
        );
        Ok(records)
    }

    /// Number of records matching `filter_text`, ignoring order and paging
    pub async fn count(&self, filter_text: Option<&str>) -> Result<u64> {
        Ok(self.source.count(&NameFilter::new(filter_text)).await?)
    }
}
