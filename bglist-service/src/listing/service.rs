//! Listing service: validation, cache and query engine wired together

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::cache::ResultCache;
use crate::config::Config;
use crate::datasource::DataSource;
use crate::error::{Error, Result};
use crate::listing::assembler::{PageResult, ResponseAssembler};
use crate::listing::engine::QueryEngine;
use crate::listing::key::CacheKey;
use crate::listing::params::{ListingRules, RawListQuery};
use crate::listing::validators::ColumnValidator;
use crate::record::Record;

/// Serves list requests for one record type
pub struct ListingService<R: Record, S> {
    columns: ColumnValidator<R::Column>,
    rules: ListingRules,
    engine: QueryEngine<R, S>,
    cache: Arc<ResultCache<R>>,
    ttl: Duration,
}

impl<R: Record, S: DataSource<R>> ListingService<R, S> {
    pub fn new(
        columns: ColumnValidator<R::Column>,
        rules: ListingRules,
        engine: QueryEngine<R, S>,
        cache: Arc<ResultCache<R>>,
        ttl: Duration,
    ) -> Self {
        Self {
            columns,
            rules,
            engine,
            cache,
            ttl,
        }
    }

    /// Build from configuration: allow-listed columns, paging rules and TTL
    pub fn from_config(config: &Config, source: S, cache: Arc<ResultCache<R>>) -> Result<Self> {
        let columns = ColumnValidator::from_names(&config.listing.sortable_columns)?;
        let rules = ListingRules::from(&config.listing);
        if !columns.validate_sort_column(&rules.default_sort_column) {
            return Err(Error::InvalidConfig(format!(
                "default sort column '{}' is not sortable",
                rules.default_sort_column
            )));
        }

        Ok(Self::new(
            columns,
            rules,
            QueryEngine::new(source),
            cache,
            config.cache.ttl(),
        ))
    }

    /// Answer one list request
    ///
    /// Validation failures are returned before the cache or data source is
    /// touched. The page is served from cache when possible; the total count
    /// is always read fresh. A closed cache degrades to a direct query.
    pub async fn list(&self, raw: &RawListQuery, base_url: &Url) -> Result<PageResult<R>> {
        let params = raw.validate(&self.rules, &self.columns)?;
        let key = CacheKey::derive(&params);

        let data = match self
            .cache
            .get_or_compute(&key, self.ttl, || self.engine.execute(&params))
            .await
        {
            Ok(data) => data,
            Err(Error::CacheUnavailable) => {
                tracing::warn!(
                    cache_key = %key,
                    "Result cache unavailable, querying data source directly"
                );
                self.engine.execute(&params).await?.into()
            }
            Err(e) => return Err(e),
        };

        let total = self.engine.count(params.filter_text()).await?;
        ResponseAssembler::assemble(data, &params, total, base_url)
    }

    pub fn cache(&self) -> &Arc<ResultCache<R>> {
        &self.cache
    }

    pub fn engine(&self) -> &QueryEngine<R, S> {
        &self.engine
    }

    pub fn rules(&self) -> &ListingRules {
        &self.rules
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MemoryDataSource;
    use crate::record::BoardGame;

    type Source = Arc<MemoryDataSource<BoardGame>>;

    fn sample() -> Vec<BoardGame> {
        vec![
            BoardGame::new(1, "Axis & Allies", 1981),
            BoardGame::new(2, "Citadels", 2000),
            BoardGame::new(3, "Terraforming Mars", 2016),
        ]
    }

    fn service(ttl: Duration) -> (ListingService<BoardGame, Source>, Source) {
        let source = Arc::new(MemoryDataSource::new(sample()));
        let mut config = Config::default();
        config.cache.ttl_secs = ttl.as_secs();
        let cache = Arc::new(ResultCache::from_config(&config.cache));
        let service = ListingService::from_config(&config, Arc::clone(&source), cache).unwrap();
        (service, source)
    }

    fn base() -> Url {
        Url::parse("http://localhost:8080/BoardGames").unwrap()
    }

    fn ids(page: &PageResult<BoardGame>) -> Vec<i32> {
        page.data.iter().map(|r| r.id).collect()
    }

    fn year_desc() -> RawListQuery {
        RawListQuery::default()
            .with_filter("")
            .with_sort_column("Year")
            .with_sort_order("DESC")
            .with_page_index("0")
            .with_page_size("2")
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_example() {
        let (service, _) = service(Duration::from_secs(60));
        let page = service.list(&year_desc(), &base()).await.unwrap();

        assert_eq!(ids(&page), vec![3, 2]);
        assert_eq!(page.total_record_count, 3);
        assert_eq!(page.page_index, 0);
        assert_eq!(page.page_size, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_requests_hit_cache() {
        let (service, _) = service(Duration::from_secs(60));
        let first = service.list(&year_desc(), &base()).await.unwrap();
        let second = service.list(&year_desc(), &base()).await.unwrap();

        assert!(Arc::ptr_eq(&first.data, &second.data));
        let stats = service.cache().stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_is_fresh_while_page_is_cached() {
        let (service, source) = service(Duration::from_secs(60));
        let first = service.list(&year_desc(), &base()).await.unwrap();
        assert_eq!(first.total_record_count, 3);

        source.insert(BoardGame::new(4, "Wingspan", 2019)).await;

        let cached = service.list(&year_desc(), &base()).await.unwrap();
        assert_eq!(ids(&cached), vec![3, 2]);
        assert_eq!(cached.total_record_count, 4);

        tokio::time::advance(Duration::from_secs(60)).await;
        let refreshed = service.list(&year_desc(), &base()).await.unwrap();
        assert_eq!(ids(&refreshed), vec![4, 3]);
        assert!(!Arc::ptr_eq(&first.data, &refreshed.data));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_request_never_reaches_engine() {
        let (service, source) = service(Duration::from_secs(60));
        source.set_available(false);

        for raw in [
            RawListQuery::default().with_sort_column("DROP TABLE"),
            RawListQuery::default().with_sort_order("SIDEWAYS"),
            RawListQuery::default().with_page_size("0"),
            RawListQuery::default().with_page_index("-1"),
        ] {
            let err = service.list(&raw, &base()).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{:?}", raw);
        }
        assert_eq!(service.cache().stats().misses, 0);
        assert!(service.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_data_source_outage_propagates() {
        let (service, source) = service(Duration::from_secs(60));
        source.set_available(false);

        let err = service.list(&year_desc(), &base()).await.unwrap_err();
        assert!(matches!(err, Error::DataSourceUnavailable(_)));
        assert!(service.cache().is_empty());

        source.set_available(true);
        assert!(service.list(&year_desc(), &base()).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_cache_falls_back_to_engine() {
        let (service, _) = service(Duration::from_secs(60));
        service.cache().shutdown().await;

        let page = service.list(&year_desc(), &base()).await.unwrap();
        assert_eq!(ids(&page), vec![3, 2]);
        assert_eq!(page.total_record_count, 3);
        assert!(service.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_example() {
        let (service, _) = service(Duration::from_secs(60));
        let raw = RawListQuery::default()
            .with_filter("a")
            .with_sort_column("Name")
            .with_sort_order("ASC")
            .with_page_index("0")
            .with_page_size("10");

        let page = service.list(&raw, &base()).await.unwrap();
        assert_eq!(ids(&page), vec![1, 2, 3]);
        assert_eq!(page.total_record_count, 3);

        let page = service
            .list(&RawListQuery::default().with_filter("Mars"), &base())
            .await
            .unwrap();
        assert_eq!(ids(&page), vec![3]);
        assert_eq!(page.total_record_count, 1);
    }

    #[test]
    fn test_from_config_rejects_unknown_column() {
        let mut config = Config::default();
        config.listing.sortable_columns.push("Publisher".to_string());
        let cache = Arc::new(ResultCache::from_config(&config.cache));
        let result = ListingService::<BoardGame, Source>::from_config(
            &config,
            Arc::new(MemoryDataSource::default()),
            cache,
        );
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
