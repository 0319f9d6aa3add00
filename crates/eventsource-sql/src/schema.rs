//! Event table schema.

use eventsource_core::error::{Error, Result};
use sea_query::{
    Alias, ColumnDef, Iden, Index, IndexCreateStatement, InsertStatement, IntoTableRef,
    PostgresQueryBuilder, SelectStatement, SqliteQueryBuilder, Table, TableCreateStatement,
    TableRef,
};

/// Columns of the events table.
#[derive(Iden, Clone, Copy)]
pub(crate) enum EventColumn {
    #[iden = "aggregate_id"]
    AggregateId,
    #[iden = "sequence_id"]
    SequenceId,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "user_id"]
    UserId,
    #[iden = "type"]
    Type,
    #[iden = "data"]
    Data,
}

/// Every column, in the order rows are read and written.
pub(crate) const COLUMNS: [EventColumn; 6] = [
    EventColumn::AggregateId,
    EventColumn::SequenceId,
    EventColumn::CreatedAt,
    EventColumn::UserId,
    EventColumn::Type,
    EventColumn::Data,
];

/// SQL flavour of the connected database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Infers the dialect from a connection URL.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for any other scheme.
    pub fn from_url(url: &str) -> Result<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Self::Postgres)
        } else if url.starts_with("sqlite:") {
            Ok(Self::Sqlite)
        } else {
            Err(Error::Configuration(format!(
                "unsupported database url scheme: {}",
                url.split(':').next().unwrap_or_default()
            )))
        }
    }

    pub(crate) fn build_select(self, stmt: &SelectStatement) -> String {
        match self {
            Self::Postgres => stmt.to_string(PostgresQueryBuilder),
            Self::Sqlite => stmt.to_string(SqliteQueryBuilder),
        }
    }

    pub(crate) fn build_insert(self, stmt: &InsertStatement) -> String {
        match self {
            Self::Postgres => stmt.to_string(PostgresQueryBuilder),
            Self::Sqlite => stmt.to_string(SqliteQueryBuilder),
        }
    }

    fn build_table(self, stmt: &TableCreateStatement) -> String {
        match self {
            Self::Postgres => stmt.to_string(PostgresQueryBuilder),
            Self::Sqlite => stmt.to_string(SqliteQueryBuilder),
        }
    }

    fn build_index(self, stmt: &IndexCreateStatement) -> String {
        match self {
            Self::Postgres => stmt.to_string(PostgresQueryBuilder),
            Self::Sqlite => stmt.to_string(SqliteQueryBuilder),
        }
    }
}

/// `table`, or `schema.table`, as a quoted table reference.
pub(crate) fn table_ref(table: &str) -> TableRef {
    match table.split_once('.') {
        Some((schema, table)) => (Alias::new(schema), Alias::new(table)).into_table_ref(),
        None => Alias::new(table).into_table_ref(),
    }
}

/// Checks that `table` is a plain (optionally schema-qualified) identifier,
/// since it names the table in every statement.
///
/// # Errors
///
/// Returns `Error::Configuration` otherwise.
pub fn validate_table_name(table: &str) -> Result<()> {
    let valid = !table.is_empty()
        && table.split('.').all(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });

    if valid {
        Ok(())
    } else {
        Err(Error::Configuration(format!("invalid table name: {table:?}")))
    }
}

/// Statements creating the events table and its aggregate index.
#[must_use]
pub fn create_statements(dialect: Dialect, table: &str) -> Vec<String> {
    let create_table = Table::create()
        .table(table_ref(table))
        .if_not_exists()
        .col(
            ColumnDef::new(EventColumn::SequenceId)
                .string_len(26)
                .not_null()
                .primary_key(),
        )
        .col(
            ColumnDef::new(EventColumn::AggregateId)
                .string_len(255)
                .not_null(),
        )
        .col(ColumnDef::new(EventColumn::CreatedAt).big_integer().not_null())
        .col(ColumnDef::new(EventColumn::UserId).string_len(255).not_null())
        .col(ColumnDef::new(EventColumn::Type).string_len(255).not_null())
        .col(ColumnDef::new(EventColumn::Data).blob().not_null())
        .to_owned();

    let create_index = Index::create()
        .if_not_exists()
        .name(format!("idx_{}_aggregate_id", table.replace('.', "_")))
        .table(table_ref(table))
        .col(EventColumn::AggregateId)
        .col(EventColumn::SequenceId)
        .to_owned();

    vec![
        dialect.build_table(&create_table),
        dialect.build_index(&create_index),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_from_url() {
        assert_eq!(
            Dialect::from_url("postgres://localhost/es").unwrap(),
            Dialect::Postgres
        );
        assert_eq!(
            Dialect::from_url("postgresql://localhost/es").unwrap(),
            Dialect::Postgres
        );
        assert_eq!(Dialect::from_url("sqlite::memory:").unwrap(), Dialect::Sqlite);
        assert!(matches!(
            Dialect::from_url("mysql://localhost/es"),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_table_name_validation() {
        assert!(validate_table_name("events").is_ok());
        assert!(validate_table_name("public.account_events").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("1events").is_err());
        assert!(validate_table_name("events; DROP TABLE users").is_err());
        assert!(validate_table_name("public.").is_err());
    }

    #[test]
    fn test_blob_column_follows_dialect() {
        let postgres = create_statements(Dialect::Postgres, "events");
        let sqlite = create_statements(Dialect::Sqlite, "events");

        assert!(postgres[0].to_lowercase().contains("bytea"));
        assert!(sqlite[0].to_lowercase().contains("blob"));
        assert!(sqlite[0].contains(r#"CREATE TABLE IF NOT EXISTS "events""#));
        assert!(sqlite[1].contains("idx_events_aggregate_id"));
        assert!(sqlite[1].contains(r#""aggregate_id", "sequence_id""#));
    }

    #[test]
    fn test_schema_qualified_table_is_quoted_per_part() {
        let statements = create_statements(Dialect::Postgres, "audit.events");

        assert!(statements[0].contains(r#""audit"."events""#));
        assert!(statements[1].contains("idx_audit_events_aggregate_id"));
    }
}
