//! Store configuration read from the environment.

use eventsource_core::error::{Error, Result};

const DEFAULT_TABLE: &str = "events";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Connection settings for [`SqlStore`](crate::SqlStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlStoreConfig {
    /// `postgres://…` or `sqlite:…` URL.
    pub database_url: String,
    /// Table holding the records.
    pub table_name: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
}

impl SqlStoreConfig {
    /// Settings for `database_url` with the default table and pool size.
    #[must_use]
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            table_name: DEFAULT_TABLE.to_owned(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Reads `DATABASE_URL`, `EVENTSOURCE_TABLE` and
    /// `EVENTSOURCE_MAX_CONNECTIONS` from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if `DATABASE_URL` is unset or a value
    /// does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SqlStoreConfig::from_env`], reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`SqlStoreConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or_else(|| {
            Error::Configuration("DATABASE_URL environment variable must be set".into())
        })?;
        let table_name = lookup("EVENTSOURCE_TABLE").unwrap_or_else(|| DEFAULT_TABLE.to_owned());
        let max_connections = match lookup("EVENTSOURCE_MAX_CONNECTIONS") {
            Some(raw) => raw.parse().map_err(|e| {
                Error::Configuration(format!("EVENTSOURCE_MAX_CONNECTIONS must be a valid u32: {e}"))
            })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url,
            table_name,
            max_connections,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_apply_when_only_url_is_set() {
        let config =
            SqlStoreConfig::from_lookup(lookup(&[("DATABASE_URL", "sqlite::memory:")])).unwrap();

        assert_eq!(config, SqlStoreConfig::new("sqlite::memory:"));
        assert_eq!(config.table_name, "events");
        assert_eq!(config.max_connections, 10);
    }

    #[test]
    fn test_overrides_are_read() {
        let config = SqlStoreConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/es"),
            ("EVENTSOURCE_TABLE", "account_events"),
            ("EVENTSOURCE_MAX_CONNECTIONS", "3"),
        ]))
        .unwrap();

        assert_eq!(config.table_name, "account_events");
        assert_eq!(config.max_connections, 3);
    }

    #[test]
    fn test_missing_url_is_a_configuration_error() {
        let result = SqlStoreConfig::from_lookup(lookup(&[]));

        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_invalid_pool_size_is_rejected() {
        let result = SqlStoreConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("EVENTSOURCE_MAX_CONNECTIONS", "many"),
        ]));

        match result {
            Err(Error::Configuration(message)) => {
                assert!(message.contains("EVENTSOURCE_MAX_CONNECTIONS"));
            }
            other => panic!("expected Configuration error, got {other:?}"),
        }
    }
}
