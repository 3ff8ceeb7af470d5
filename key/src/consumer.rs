//! Reservation event consumer.
//!
//! Subscribes to the reservation events topic and provisions a door key for
//! every `ReservationCreated` it sees. Delivery is at-least-once, so the
//! loop leans on the provisioning path being idempotent: a redelivered
//! event finds the reservation's existing key and acks without minting a
//! new code.
//!
//! Acknowledgment rules:
//!
//! - Handled event: ack.
//! - Unknown event type: ack. Newer producers may emit types this consumer
//!   predates; redelivering them forever helps nobody.
//! - Malformed payload of a known type: log and ack. Retrying cannot fix
//!   bytes that do not parse.
//! - Handler failure (reservation not visible yet, storage down, etc.):
//!   nack, so the event is redelivered and retried.

use crate::service::KeyService;
use crate::stores::KeyStore;
use futures::StreamExt;
use staykey_core::event::Event;
use staykey_core::event_bus::{Delivery, EventBus, EventBusError};
use staykey_core::reservation::{RESERVATION_EVENTS_TOPIC, ReservationEvent};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Run the consumer loop until the subscription stream ends.
///
/// # Errors
///
/// Returns [`EventBusError::SubscriptionFailed`] if the subscription cannot
/// be established. Errors on individual messages are logged and do not end
/// the loop.
pub async fn run<S: KeyStore>(
    bus: Arc<dyn EventBus>,
    service: Arc<KeyService<S>>,
) -> Result<(), EventBusError> {
    let mut stream = bus.subscribe(&[RESERVATION_EVENTS_TOPIC]).await?;
    info!(topic = RESERVATION_EVENTS_TOPIC, "consuming reservation events");

    while let Some(result) = stream.next().await {
        match result {
            Ok(delivery) => handle_delivery(&service, delivery).await,
            Err(e) => {
                // Poison messages and transport hiccups surface here; the
                // bus has already settled what it could.
                warn!(error = %e, "event stream error");
            },
        }
    }

    info!("reservation event stream ended");
    Ok(())
}

async fn handle_delivery<S: KeyStore>(service: &KeyService<S>, delivery: Delivery) {
    let event = delivery.event();

    if event.event_type != "ReservationCreated" {
        debug!(event_type = %event.event_type, "ignoring unhandled event type");
        delivery.ack();
        return;
    }

    let decoded = match ReservationEvent::from_bytes(&event.data) {
        Ok(decoded) => decoded,
        Err(e) => {
            error!(
                event_type = %event.event_type,
                origin = event.origin().unwrap_or("unknown"),
                error = %e,
                "malformed reservation event, settling without processing"
            );
            delivery.ack();
            return;
        },
    };

    // The owning user comes from the ledger lookup inside `provision`, not
    // from the event body, so a forged or stale user_id cannot mis-assign
    // a key.
    let ReservationEvent::ReservationCreated {
        reservation_id,
        user_id: _,
        start_date,
        end_date,
    } = decoded;

    match service.provision(reservation_id, start_date, end_date).await {
        Ok(_) => delivery.ack(),
        Err(e) => {
            error!(
                reservation_id = %reservation_id,
                error = %e,
                "failed to provision key, leaving event for redelivery"
            );
            delivery.nack();
        },
    }
}
