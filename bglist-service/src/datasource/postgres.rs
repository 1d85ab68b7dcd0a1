//! PostgreSQL-backed board game source
//!
//! Statements are assembled with [`sqlx::QueryBuilder`]. User input only ever
//! travels as bound parameters; the `ORDER BY` clause is built from the fixed
//! expressions of [`BoardGameColumn::order_expr`] and [`SortOrder::as_str`].
//!
//! Expected table:
//!
//! ```sql
//! CREATE TABLE board_games (
//!     id                 INTEGER PRIMARY KEY,
//!     name               TEXT NOT NULL,
//!     year               INTEGER NOT NULL,
//!     last_modified_date TIMESTAMPTZ NOT NULL
//! );
//! ```

use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{DataSource, DataSourceError, NameFilter, RecordQuery};
use crate::record::{BoardGame, BoardGameColumn};

const SELECT_COLUMNS: &str = "SELECT id, name, year, last_modified_date FROM board_games";
const SELECT_COUNT: &str = "SELECT COUNT(*) FROM board_games";

/// Board games stored in PostgreSQL
#[derive(Debug, Clone)]
pub struct PgBoardGameSource {
    pool: PgPool,
}

impl PgBoardGameSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn push_filter(builder: &mut QueryBuilder<'static, Postgres>, filter: &NameFilter) {
    if let Some(text) = filter.text() {
        builder
            .push(" WHERE strpos(lower(name), lower(")
            .push_bind(text.to_string())
            .push(")) > 0");
    }
}

fn select_query(query: &RecordQuery<BoardGameColumn>) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(SELECT_COLUMNS);
    push_filter(&mut builder, query.name_filter());

    match query.ordering() {
        Some((column, order)) => {
            builder
                .push(" ORDER BY ")
                .push(column.order_expr())
                .push(" ")
                .push(order.as_str())
                .push(", id ASC");
        }
        None => {
            builder.push(" ORDER BY id ASC");
        }
    }

    if let Some(limit) = query.limit() {
        builder
            .push(" LIMIT ")
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    }
    builder
        .push(" OFFSET ")
        .push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));

    builder
}

fn count_query(filter: &NameFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(SELECT_COUNT);
    push_filter(&mut builder, filter);
    builder
}

fn map_sqlx_error(err: sqlx::Error) -> DataSourceError {
    use sqlx::Error as E;
    match err {
        E::PoolTimedOut | E::PoolClosed | E::Io(_) | E::Tls(_) | E::WorkerCrashed => {
            DataSourceError::Unavailable(err.to_string())
        }
        E::ColumnDecode { .. } | E::Decode(_) | E::TypeNotFound { .. } | E::ColumnNotFound(_) => {
            DataSourceError::Decode(err.to_string())
        }
        other => DataSourceError::Query(other.to_string()),
    }
}

impl DataSource<BoardGame> for PgBoardGameSource {
    async fn materialize(
        &self,
        query: &RecordQuery<BoardGameColumn>,
    ) -> Result<Vec<BoardGame>, DataSourceError> {
        let mut builder = select_query(query);
        tracing::debug!(sql = builder.sql(), "Materializing board games");

        builder
            .build_query_as::<BoardGame>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn count(&self, filter: &NameFilter) -> Result<u64, DataSourceError> {
        let mut builder = count_query(filter);
        let total: i64 = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn ping(&self) -> Result<(), DataSourceError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(map_sqlx_error)
    }
}
