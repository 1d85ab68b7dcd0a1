//! In-process data source

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use super::{DataSource, DataSourceError, NameFilter, RecordQuery};
use crate::error::{Error, Result};
use crate::record::Record;

/// Records held in memory behind an async `RwLock`
///
/// Queries are evaluated with the same semantics as the SQL source:
/// case-insensitive name filter, typed column order, id tie-break, then the
/// skip/take window.
#[derive(Debug)]
pub struct MemoryDataSource<R> {
    records: RwLock<Vec<R>>,
    available: AtomicBool,
}

impl<R: Record> MemoryDataSource<R> {
    pub fn new(records: Vec<R>) -> Self {
        Self {
            records: RwLock::new(records),
            available: AtomicBool::new(true),
        }
    }

    /// Seed from a JSON array of records
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self>
    where
        R: serde::de::DeserializeOwned,
    {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let records: Vec<R> = serde_json::from_slice(&bytes).map_err(|e| {
            Error::InvalidConfig(format!("invalid seed file {}: {}", path.display(), e))
        })?;

        tracing::info!(path = %path.display(), records = records.len(), "Loaded seed records");
        Ok(Self::new(records))
    }

    /// Replace every record
    pub async fn replace(&self, records: Vec<R>) {
        *self.records.write().await = records;
    }

    pub async fn insert(&self, record: R) {
        self.records.write().await.push(record);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Simulate an outage; every call fails with `Unavailable` while `false`
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> std::result::Result<(), DataSourceError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DataSourceError::Unavailable(
                "in-memory source marked unavailable".to_string(),
            ))
        }
    }
}

impl<R: Record> Default for MemoryDataSource<R> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<R: Record> DataSource<R> for MemoryDataSource<R> {
    async fn materialize(
        &self,
        query: &RecordQuery<R::Column>,
    ) -> std::result::Result<Vec<R>, DataSourceError> {
        self.check_available()?;
        let records = self.records.read().await;

        let filter = query.name_filter();
        let mut matched: Vec<&R> = records.iter().filter(|r| filter.matches(r.name())).collect();

        match query.ordering() {
            Some((column, order)) => matched.sort_by(|a, b| {
                order
                    .apply(a.compare_by(b, column))
                    .then_with(|| a.id().cmp(&b.id()))
            }),
            None => matched.sort_by_key(|r| r.id()),
        }

        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let limit = query
            .limit()
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));

        Ok(matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &NameFilter) -> std::result::Result<u64, DataSourceError> {
        self.check_available()?;
        let records = self.records.read().await;
        Ok(records.iter().filter(|r| filter.matches(r.name())).count() as u64)
    }

    async fn ping(&self) -> std::result::Result<(), DataSourceError> {
        self.check_available()
    }
}
