//! SQL event store backend.
//!
//! Records live in one table keyed by sequence id. Connections go through the
//! `sqlx` Any driver so the same store serves PostgreSQL and SQLite.

pub mod config;
pub mod schema;
pub mod store;
pub mod transaction;

pub use config::SqlStoreConfig;
pub use schema::Dialect;
pub use store::SqlStore;
pub use transaction::SqlTransaction;
