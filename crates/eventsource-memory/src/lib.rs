//! In-memory event store backend.
//!
//! Holds records per aggregate behind an async read/write lock. Supports
//! every query option, which makes it the reference backend for tests.

mod store;
mod transaction;

pub use store::MemoryStore;
pub use transaction::MemoryTransaction;
