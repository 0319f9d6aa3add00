//! Rebuilding aggregate state from records.

use crate::aggregate::{Aggregate, Applied};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::record::Record;
use crate::serializer::Serializer;

/// How a replay ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replay {
    /// Every record was applied.
    Done,
    /// The aggregate reported a soft delete; later records were skipped.
    SoftDeleted,
}

/// Feeds `records` (already in ascending sequence order) to `aggregate`.
///
/// Events decoded with a zero timestamp get the record's timestamp; older
/// payloads were written without one.
///
/// # Errors
///
/// Returns the serializer's decode error, `Error::Aggregate` for an error
/// from [`Aggregate::on`], or `Error::Cancelled` / `Error::DeadlineExceeded`
/// when the context ends first. Cancellation takes precedence over a decode
/// or aggregate error observed at the same step.
pub fn replay<E, A>(
    ctx: &Context,
    serializer: &dyn Serializer<E>,
    aggregate_id: &str,
    records: &[Record],
    aggregate: &mut A,
) -> Result<Replay>
where
    E: Event,
    A: Aggregate<E> + ?Sized,
{
    for record in records {
        ctx.check()?;

        let mut event = match serializer.unmarshal(&record.data, &record.type_name) {
            Ok(event) => event,
            Err(e) => {
                ctx.check()?;
                return Err(e);
            }
        };
        if event.timestamp() == 0 {
            event.set_timestamp(record.timestamp);
        }

        match aggregate.on(ctx, &event) {
            Ok(Applied::Continue) => {}
            Ok(Applied::Deleted) => return Ok(Replay::SoftDeleted),
            Err(source) => {
                ctx.check()?;
                return Err(Error::Aggregate {
                    aggregate_id: aggregate_id.to_owned(),
                    source,
                });
            }
        }
    }
    Ok(Replay::Done)
}
