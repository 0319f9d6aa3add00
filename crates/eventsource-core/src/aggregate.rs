//! Aggregate abstraction.

use crate::context::Context;
use crate::error::BoxError;

/// Outcome of applying one event to an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Keep replaying.
    Continue,
    /// The aggregate was soft-deleted by this event. Replay stops here and
    /// the remaining history is ignored.
    Deleted,
}

/// Something whose state is rebuilt by replaying its events in sequence
/// order.
pub trait Aggregate<E>: Send {
    /// Called once, before replay, with the id being loaded.
    fn set_aggregate_id(&mut self, id: &str);

    /// Apply an event to mutate internal state.
    ///
    /// # Errors
    ///
    /// Any error aborts the replay and is surfaced from `Repository::load`.
    fn on(&mut self, ctx: &Context, event: &E) -> Result<Applied, BoxError>;
}
