//! Event trait and wire format for the event channel.
//!
//! Events are immutable facts ("a reservation was created") serialized with
//! `bincode` for the channel's byte body. Alongside the body each event
//! carries optional JSON metadata; the one field every publisher sets is
//! `origin`, identifying the service that produced the message.

use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Error types for event serialization.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize event to bytes.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize event from bytes.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),

    /// Unknown event type encountered during deserialization.
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),
}

/// An immutable domain event that can cross the event channel.
///
/// # Event Naming
///
/// `event_type()` returns a stable identifier used for routing on the
/// consumer side (e.g. `"ReservationCreated"`). Consumers skip types they
/// do not recognize.
///
/// # Serialization
///
/// Default implementations serialize to/from `bincode`; any type deriving
/// `Serialize`/`Deserialize` gets them for free.
pub trait Event: Send + Sync + 'static {
    /// Returns the stable event type identifier for this event.
    fn event_type(&self) -> &'static str;

    /// Serialize this event to bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if the event cannot be
    /// serialized.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        bincode::serialize(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize an event from bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DeserializationError`] if the bytes do not
    /// decode into this event type.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// A serialized event ready for the wire.
///
/// This is the channel payload: the event type identifier, the bincode body,
/// and optional JSON metadata (notably `origin`). It serializes as a whole
/// for transport, so the channel implementation never needs to understand
/// the domain event inside.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SerializedEvent {
    /// The event type identifier (e.g. "ReservationCreated").
    pub event_type: String,

    /// The bincode-serialized event body.
    pub data: Vec<u8>,

    /// Optional metadata attached to the message.
    ///
    /// Known fields:
    /// - `origin`: the publishing service (e.g. "reservation-service")
    pub metadata: Option<serde_json::Value>,
}

impl SerializedEvent {
    /// Create a new serialized event.
    #[must_use]
    pub const fn new(
        event_type: String,
        data: Vec<u8>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            event_type,
            data,
            metadata,
        }
    }

    /// Serialize a domain event into a channel payload.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if the event body cannot
    /// be serialized.
    pub fn from_event<E: Event + Serialize>(
        event: &E,
        metadata: Option<serde_json::Value>,
    ) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: event.to_bytes()?,
            metadata,
        })
    }

    /// Attach an `origin` attribute identifying the publishing service.
    #[must_use]
    pub fn with_origin(mut self, origin: &str) -> Self {
        let metadata = self
            .metadata
            .get_or_insert_with(|| serde_json::json!({}));
        if let Some(map) = metadata.as_object_mut() {
            map.insert(
                "origin".to_string(),
                serde_json::Value::String(origin.to_string()),
            );
        }
        self
    }

    /// The `origin` attribute, if the publisher set one.
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("origin"))
            .and_then(serde_json::Value::as_str)
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SerializedEvent {{ type: {}, size: {} bytes }}",
            self.event_type,
            self.data.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    enum TestEvent {
        Created { id: String, value: i32 },
    }

    impl Event for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::Created { .. } => "TestEvent.Created",
            }
        }
    }

    #[test]
    #[allow(clippy::expect_used)] // Panics: Test will fail if serialization fails
    fn event_serialization_roundtrip() {
        let event = TestEvent::Created {
            id: "test-1".to_string(),
            value: 42,
        };

        let bytes = event.to_bytes().expect("serialization should succeed");
        let deserialized = TestEvent::from_bytes(&bytes).expect("deserialization should succeed");

        assert_eq!(event, deserialized);
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn origin_attribute_roundtrip() {
        let event = TestEvent::Created {
            id: "test-1".to_string(),
            value: 1,
        };

        let serialized = SerializedEvent::from_event(&event, None)
            .expect("serialization should succeed")
            .with_origin("reservation-service");

        assert_eq!(serialized.origin(), Some("reservation-service"));
    }

    #[test]
    fn origin_absent_when_not_set() {
        let serialized = SerializedEvent::new("TestEvent".to_string(), vec![1, 2, 3], None);
        assert_eq!(serialized.origin(), None);
    }

    #[test]
    fn serialized_event_display() {
        let serialized =
            SerializedEvent::new("TestEvent.Created".to_string(), vec![1, 2, 3, 4, 5], None);

        let display = format!("{serialized}");
        assert!(display.contains("TestEvent.Created"));
        assert!(display.contains("5 bytes"));
    }
}
