//! Event bus abstraction for cross-service communication.
//!
//! The reservation ledger publishes here; the key provisioner subscribes.
//! Delivery is **at-least-once** and unordered across messages: a message may
//! be redelivered after a processing failure, a crash, or an acknowledgment
//! timeout, and duplicate redeliveries may land on different instances of the
//! same consumer group. Consumers must be idempotent — the bus does not
//! deduplicate.
//!
//! # Acknowledgment contract
//!
//! Each delivered message carries an explicit outcome handle:
//!
//! - [`Delivery::ack`] — the handler completed; the message is settled and
//!   will not be redelivered to this consumer group.
//! - [`Delivery::nack`] — the handler failed; the message is left unsettled
//!   and becomes eligible for redelivery under the channel's own
//!   backoff/retry/dead-letter policy.
//! - Dropping a [`Delivery`] without deciding counts as a nack.
//!
//! Implementations commit their transport-level position (e.g. a Kafka
//! offset) only after the consumer acks.

use crate::event::SerializedEvent;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors that can occur during event bus operations.
#[derive(Error, Debug, Clone)]
pub enum EventBusError {
    /// Failed to connect to the event bus
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Failed to publish an event to a topic
    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed {
        /// The topic that failed
        topic: String,
        /// The reason for failure
        reason: String,
    },

    /// Failed to subscribe to topics
    #[error("Subscription failed for topics {topics:?}: {reason}")]
    SubscriptionFailed {
        /// The topics that failed to subscribe
        topics: Vec<String>,
        /// The reason for failure
        reason: String,
    },

    /// Failed to deserialize an event
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    /// Network or transport error
    #[error("Transport error: {0}")]
    TransportError(String),
}

/// Outcome of processing one delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// Handler succeeded; settle the message.
    Ack,
    /// Handler failed; leave the message eligible for redelivery.
    Nack,
}

/// A single message delivered by a subscription, with its outcome handle.
///
/// The consumer inspects [`Delivery::event`], processes it, and then calls
/// [`Delivery::ack`] or [`Delivery::nack`] exactly once. Dropping the
/// delivery without deciding is treated as a nack, so a panicking or
/// early-returning handler never silently settles a message.
#[derive(Debug)]
pub struct Delivery {
    event: SerializedEvent,
    outcome: Option<oneshot::Sender<AckOutcome>>,
}

impl Delivery {
    /// Create a delivery from an event and its outcome channel.
    ///
    /// Used by [`EventBus`] implementations; consumers only receive these.
    #[must_use]
    pub const fn new(event: SerializedEvent, outcome: oneshot::Sender<AckOutcome>) -> Self {
        Self {
            event,
            outcome: Some(outcome),
        }
    }

    /// The delivered event.
    #[must_use]
    pub const fn event(&self) -> &SerializedEvent {
        &self.event
    }

    /// Acknowledge the message: processing completed.
    pub fn ack(mut self) {
        if let Some(tx) = self.outcome.take() {
            let _ = tx.send(AckOutcome::Ack);
        }
    }

    /// Negatively acknowledge the message: processing failed, redeliver.
    pub fn nack(mut self) {
        if let Some(tx) = self.outcome.take() {
            let _ = tx.send(AckOutcome::Nack);
        }
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        // An undecided delivery is a nack: never settle a message whose
        // handler did not finish.
        if let Some(tx) = self.outcome.take() {
            let _ = tx.send(AckOutcome::Nack);
        }
    }
}

/// Stream of deliveries from a subscription.
pub type DeliveryStream = Pin<Box<dyn Stream<Item = Result<Delivery, EventBusError>> + Send>>;

/// Trait for event bus implementations.
///
/// # Design
///
/// - **Async-first**: all operations are futures
/// - **At-least-once**: subscribers may receive duplicates
/// - **Competing consumers**: instances sharing a consumer group split the
///   message stream; each message goes to exactly one instance
///
/// The trait uses explicit `Pin<Box<dyn Future>>` returns instead of
/// `async fn` so it stays dyn-compatible (`Arc<dyn EventBus>` is how the
/// services hold their channel).
pub trait EventBus: Send + Sync {
    /// Publish an event to a topic.
    ///
    /// Resolves once the channel has acknowledged the publish — not once any
    /// downstream consumer has processed the event.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::PublishFailed`] if the channel rejects or
    /// times out the publish.
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>>;

    /// Subscribe to one or more topics.
    ///
    /// Returns a [`DeliveryStream`] yielding messages with explicit ack/nack
    /// handles. The subscription participates in the implementation's
    /// consumer group mechanism, so multiple instances share the workload.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::SubscriptionFailed`] if the subscription
    /// cannot be established.
    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<DeliveryStream, EventBusError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivery_pair() -> (Delivery, oneshot::Receiver<AckOutcome>) {
        let (tx, rx) = oneshot::channel();
        let event = SerializedEvent::new("Test".to_string(), vec![], None);
        (Delivery::new(event, tx), rx)
    }

    #[test]
    fn ack_reports_ack() {
        let (delivery, mut rx) = delivery_pair();
        delivery.ack();
        assert_eq!(rx.try_recv(), Ok(AckOutcome::Ack));
    }

    #[test]
    fn nack_reports_nack() {
        let (delivery, mut rx) = delivery_pair();
        delivery.nack();
        assert_eq!(rx.try_recv(), Ok(AckOutcome::Nack));
    }

    #[test]
    fn dropped_delivery_counts_as_nack() {
        let (delivery, mut rx) = delivery_pair();
        drop(delivery);
        assert_eq!(rx.try_recv(), Ok(AckOutcome::Nack));
    }
}
