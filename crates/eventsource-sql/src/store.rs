//! SQL implementation of the `Store` trait.

use async_trait::async_trait;
use eventsource_core::context::Context;
use eventsource_core::error::{Error, Result};
use eventsource_core::query::{Capabilities, Filter, Order, QueryOptions};
use eventsource_core::record::Record;
use eventsource_core::store::{Store, StoreTransaction};
use sea_query::{Expr, InsertStatement, Query, SelectStatement, SimpleExpr};
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use tracing::{debug, info};

use crate::config::SqlStoreConfig;
use crate::schema::{
    COLUMNS, Dialect, EventColumn, create_statements, table_ref, validate_table_name,
};
use crate::transaction::SqlTransaction;

const BACKEND: &str = "sql";

/// Largest row count PostgreSQL accepts in `LIMIT`.
const MAX_ROWS: u64 = i64::MAX.unsigned_abs();

fn row_count(n: usize) -> u64 {
    u64::try_from(n).map_or(MAX_ROWS, |n| n.min(MAX_ROWS))
}

/// SQL-backed event store over a `sqlx` Any pool (PostgreSQL or SQLite).
#[derive(Debug, Clone)]
pub struct SqlStore {
    pool: AnyPool,
    dialect: Dialect,
    table: String,
}

impl SqlStore {
    /// Wraps an existing pool.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if `table` is not a plain identifier.
    pub fn new(pool: AnyPool, dialect: Dialect, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self {
            pool,
            dialect,
            table,
        })
    }

    /// Installs the Any drivers and opens a pool for `config`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for a bad URL or table name, or
    /// `Error::Store` if the database cannot be reached.
    pub async fn connect(config: &SqlStoreConfig) -> Result<Self> {
        let dialect = Dialect::from_url(&config.database_url)?;
        validate_table_name(&config.table_name)?;
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .map_err(|e| Error::store("connect", e))?;

        info!(?dialect, table = %config.table_name, "Connected event store");
        Self::new(pool, dialect, config.table_name.clone())
    }

    /// Creates the events table and index if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` if a statement fails.
    pub async fn init(&self) -> Result<()> {
        for statement in create_statements(self.dialect, &self.table) {
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .map_err(|e| Error::store("init", e))?;
        }
        info!(table = %self.table, "Initialized event table");
        Ok(())
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    fn insert(&self, records: &[Record]) -> Result<InsertStatement> {
        let mut insert = Query::insert();
        insert.into_table(table_ref(&self.table)).columns(COLUMNS);
        for record in records {
            let row: [SimpleExpr; 6] = [
                record.aggregate_id.as_str().into(),
                record.sequence_id.as_str().into(),
                record.timestamp.into(),
                record.user_id.as_str().into(),
                record.type_name.as_str().into(),
                record.data.clone().into(),
            ];
            insert
                .values(row)
                .map_err(|e| Error::store("insert", format!("{e:?}")))?;
        }
        Ok(insert)
    }

    fn select(&self, options: &QueryOptions) -> SelectStatement {
        let mut select = Query::select();
        select.columns(COLUMNS).from(table_ref(&self.table));

        for filter in options.filters() {
            select.and_where(match filter {
                Filter::Aggregate(id) => Expr::col(EventColumn::AggregateId).eq(id.as_str()),
                Filter::SequenceIdAfter(id) => Expr::col(EventColumn::SequenceId).gt(id.as_str()),
                Filter::TypeEquals(name) => Expr::col(EventColumn::Type).eq(name.as_str()),
                Filter::TimestampAfter(ts) => Expr::col(EventColumn::CreatedAt).gt(*ts),
            });
        }

        select.order_by(
            EventColumn::SequenceId,
            match options.order() {
                Order::Ascending => sea_query::Order::Asc,
                Order::Descending => sea_query::Order::Desc,
            },
        );

        match (options.limit(), options.offset()) {
            (Some(limit), offset) => {
                select.limit(row_count(limit));
                if let Some(offset) = offset {
                    select.offset(row_count(offset));
                }
            }
            (None, Some(offset)) => {
                select.limit(MAX_ROWS).offset(row_count(offset));
            }
            (None, None) => {}
        }

        select
    }

    async fn fetch(
        &self,
        operation: &'static str,
        ctx: &Context,
        options: &QueryOptions,
    ) -> Result<Vec<Record>> {
        ctx.check()?;
        options.check(Capabilities::ALL, BACKEND)?;

        let sql = self.dialect.build_select(&self.select(options));
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::store(operation, e))?;

        let records = rows
            .iter()
            .map(to_record)
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| Error::store(operation, e))?;

        debug!(operation, count = records.len(), "Loaded records");
        Ok(records)
    }
}

fn to_record(row: &AnyRow) -> std::result::Result<Record, sqlx::Error> {
    Ok(Record {
        aggregate_id: row.try_get("aggregate_id")?,
        sequence_id: row.try_get("sequence_id")?,
        timestamp: row.try_get("created_at")?,
        user_id: row.try_get("user_id")?,
        type_name: row.try_get("type")?,
        data: row.try_get("data")?,
    })
}

#[async_trait]
impl Store for SqlStore {
    async fn new_transaction(
        &self,
        ctx: &Context,
        records: Vec<Record>,
    ) -> Result<Box<dyn StoreTransaction>> {
        ctx.check()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::store("begin", e))?;

        if !records.is_empty() {
            let sql = self.dialect.build_insert(&self.insert(&records)?);
            sqlx::query(&sql)
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::store("insert", e))?;
        }

        debug!(count = records.len(), "Staged records");
        Ok(Box::new(SqlTransaction::new(tx, records)))
    }

    async fn load_by_aggregate(
        &self,
        ctx: &Context,
        aggregate_id: &str,
        options: &QueryOptions,
    ) -> Result<Vec<Record>> {
        let options = options.clone().by_aggregate(aggregate_id);
        self.fetch("load_by_aggregate", ctx, &options).await
    }

    async fn load(&self, ctx: &Context, options: &QueryOptions) -> Result<Vec<Record>> {
        self.fetch("load", ctx, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqlStore {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .connect_lazy("sqlite::memory:")
            .unwrap();
        SqlStore::new(pool, Dialect::Sqlite, "events").unwrap()
    }

    fn select_sql(options: &QueryOptions) -> String {
        let store = store();
        store.dialect.build_select(&store.select(options))
    }

    #[tokio::test]
    async fn test_select_without_options() {
        let sql = select_sql(&QueryOptions::new());

        assert_eq!(
            sql,
            r#"SELECT "aggregate_id", "sequence_id", "created_at", "user_id", "type", "data" FROM "events" ORDER BY "sequence_id" ASC"#
        );
    }

    #[tokio::test]
    async fn test_select_joins_filters_with_and() {
        // Arrange
        let options = QueryOptions::new()
            .by_aggregate("acct-1")
            .by_sequence_id("01H")
            .by_type("MoneyDeposited")
            .by_timestamp(5)
            .descending()
            .with_limit(10)
            .with_offset(20);

        // Act
        let sql = select_sql(&options);

        // Assert
        assert!(sql.contains(
            r#"WHERE "aggregate_id" = 'acct-1' AND "sequence_id" > '01H' AND "type" = 'MoneyDeposited' AND "created_at" > 5"#
        ));
        assert!(sql.ends_with(r#"ORDER BY "sequence_id" DESC LIMIT 10 OFFSET 20"#));
    }

    #[tokio::test]
    async fn test_offset_without_limit_uses_max_limit() {
        let sql = select_sql(&QueryOptions::new().with_offset(3));

        assert!(sql.ends_with(&format!("LIMIT {} OFFSET 3", i64::MAX)));
    }

    #[tokio::test]
    async fn test_schema_qualified_table_is_split() {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .connect_lazy("sqlite::memory:")
            .unwrap();
        let store = SqlStore::new(pool, Dialect::Postgres, "audit.events").unwrap();

        let sql = store.dialect.build_select(&store.select(&QueryOptions::new()));

        assert!(sql.contains(r#"FROM "audit"."events""#));
    }

    #[tokio::test]
    async fn test_insert_writes_one_row_per_record() {
        // Arrange
        let record = Record {
            aggregate_id: "acct-1".into(),
            sequence_id: "01H".into(),
            timestamp: 7,
            type_name: "MoneyDeposited".into(),
            data: b"{}".to_vec(),
            user_id: "alice".into(),
        };
        let store = store();

        // Act
        let insert = store.insert(&[record.clone(), record]).unwrap();
        let sql = store.dialect.build_insert(&insert);

        // Assert
        assert!(sql.starts_with(
            r#"INSERT INTO "events" ("aggregate_id", "sequence_id", "created_at", "user_id", "type", "data") VALUES"#
        ));
        assert_eq!(sql.matches("'MoneyDeposited'").count(), 2);
    }

    #[tokio::test]
    async fn test_rejects_invalid_table_name() {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .connect_lazy("sqlite::memory:")
            .unwrap();

        let result = SqlStore::new(pool, Dialect::Sqlite, "events;--");

        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
