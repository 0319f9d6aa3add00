//! Sortable, monotonic sequence ids (ULIDs).
//!
//! Every generated id is 26 characters of Crockford base32: a millisecond
//! timestamp followed by 80 bits of randomness. Ids minted within the same
//! millisecond increment the random part instead of re-rolling it, so
//! string order always equals generation order.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use ulid::Generator;

use crate::error::{Error, Result};

static SHARED: OnceLock<Arc<SequenceGenerator>> = OnceLock::new();

/// Mutex-guarded monotonic ULID generator.
pub struct SequenceGenerator {
    generator: Mutex<Generator>,
}

impl SequenceGenerator {
    /// Creates an independent generator. Ordering is only guaranteed between
    /// ids drawn from the same generator; use [`SequenceGenerator::shared`]
    /// unless isolation is the point.
    #[must_use]
    pub fn new() -> Self {
        Self {
            generator: Mutex::new(Generator::new()),
        }
    }

    /// The process-wide generator.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::clone(SHARED.get_or_init(|| Arc::new(Self::new())))
    }

    /// Returns the next id, strictly greater than every id this generator
    /// returned before.
    ///
    /// # Errors
    ///
    /// Returns `Error::SequenceExhausted` if 2^80 ids were requested within
    /// one millisecond.
    pub fn next_id(&self) -> Result<String> {
        // The generator state is still consistent after a panic elsewhere.
        let mut generator = self
            .generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        generator
            .generate()
            .map(|id| id.to_string())
            .map_err(|_| Error::SequenceExhausted)
    }
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SequenceGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceGenerator").finish_non_exhaustive()
    }
}

/// Returns a fresh id from the process-wide generator.
///
/// # Errors
///
/// See [`SequenceGenerator::next_id`].
pub fn new_id() -> Result<String> {
    SequenceGenerator::shared().next_id()
}
