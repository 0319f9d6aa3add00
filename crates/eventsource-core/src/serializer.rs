//! Event payload serialization.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::event::Event;

/// Turns events into record payloads and back.
pub trait Serializer<E>: Send + Sync {
    /// Encodes an event.
    ///
    /// # Errors
    ///
    /// Returns `Error::Encode` if the event cannot be serialized.
    fn marshal(&self, event: &E) -> Result<Vec<u8>>;

    /// Decodes a payload stored under `type_name`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownEventType` or `Error::Decode`.
    fn unmarshal(&self, data: &[u8], type_name: &str) -> Result<E>;
}

type Decoder<E> = Box<dyn Fn(&[u8]) -> serde_json::Result<E> + Send + Sync>;

/// JSON serializer with a registry of event shapes.
///
/// The event type is typically an `#[serde(untagged)]` enum so that only the
/// inner shape is written; each shape is registered under the type name its
/// variant reports from [`Event::type_name`].
pub struct JsonSerializer<E> {
    decoders: HashMap<&'static str, Decoder<E>>,
}

impl<E> JsonSerializer<E>
where
    E: Event + Serialize,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Binds `type_name` to the shape `T`.
    #[must_use]
    pub fn register<T>(mut self, type_name: &'static str) -> Self
    where
        T: DeserializeOwned + Into<E> + 'static,
    {
        self.decoders.insert(
            type_name,
            Box::new(|data: &[u8]| serde_json::from_slice::<T>(data).map(Into::into)),
        );
        self
    }
}

impl<E> Default for JsonSerializer<E>
where
    E: Event + Serialize,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for JsonSerializer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.decoders.keys().collect();
        types.sort();
        f.debug_struct("JsonSerializer")
            .field("types", &types)
            .finish()
    }
}

impl<E> Serializer<E> for JsonSerializer<E>
where
    E: Event + Serialize,
{
    fn marshal(&self, event: &E) -> Result<Vec<u8>> {
        serde_json::to_vec(event).map_err(|e| Error::Encode {
            type_name: event.type_name().to_owned(),
            source: Box::new(e),
        })
    }

    fn unmarshal(&self, data: &[u8], type_name: &str) -> Result<E> {
        let decode = self
            .decoders
            .get(type_name)
            .ok_or_else(|| Error::UnknownEventType(type_name.to_owned()))?;
        decode(data).map_err(|e| Error::Decode {
            type_name: type_name.to_owned(),
            source: Box::new(e),
        })
    }
}
