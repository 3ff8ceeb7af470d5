//! Domain events emitted by the reservation ledger.

use crate::event::Event;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default topic carrying reservation lifecycle events.
pub const RESERVATION_EVENTS_TOPIC: &str = "reservation-events";

/// Events published by the reservation ledger.
///
/// These cross the event channel, so they may arrive at a consumer more than
/// once or out of order relative to other events. They are immutable facts:
/// the fields describe the reservation as it was at emission time.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReservationEvent {
    /// A reservation row was committed in PENDING state.
    ReservationCreated {
        /// Identifier of the new reservation.
        reservation_id: Uuid,
        /// The guest who owns the reservation.
        user_id: Uuid,
        /// Stay start (check-in).
        start_date: DateTime<Utc>,
        /// Stay end (check-out).
        end_date: DateTime<Utc>,
    },
}

impl Event for ReservationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ReservationEvent::ReservationCreated { .. } => "ReservationCreated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::SerializedEvent;

    #[test]
    #[allow(clippy::expect_used)] // Panics: Test will fail if serialization fails
    fn reservation_created_roundtrip() {
        let event = ReservationEvent::ReservationCreated {
            reservation_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            start_date: "2025-06-01T15:00:00Z".parse().expect("valid timestamp"),
            end_date: "2025-06-03T11:00:00Z".parse().expect("valid timestamp"),
        };

        let serialized = SerializedEvent::from_event(&event, None)
            .expect("serialization should succeed")
            .with_origin("reservation-service");

        assert_eq!(serialized.event_type, "ReservationCreated");
        assert_eq!(serialized.origin(), Some("reservation-service"));

        let decoded =
            ReservationEvent::from_bytes(&serialized.data).expect("deserialization should succeed");
        assert_eq!(decoded, event);
    }
}
