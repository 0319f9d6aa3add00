//! Shared test mocks and fixtures for the event sourcing crates.

mod account;
mod clock;
mod notifier;
mod store;

pub use account::{
    ACCOUNT_CLOSED, ACCOUNT_OPENED, Account, AccountClosed, AccountEvent, AccountOpened,
    MONEY_DEPOSITED, MoneyDeposited, account_serializer,
};
pub use clock::FixedClock;
pub use notifier::{FailingNotifier, StalledNotifier};
pub use store::{Call, FailingStore, ScriptedStore};

/// Installs a test-writer `tracing` subscriber honouring `RUST_LOG`. Safe to
/// call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
