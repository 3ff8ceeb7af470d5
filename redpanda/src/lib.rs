//! Kafka-protocol event channel for the StayKey platform.
//!
//! This crate implements the [`EventBus`] trait from `staykey-core` on top of
//! rdkafka, so the reservation ledger and key provisioner can run against
//! Redpanda, Apache Kafka, or any Kafka-compatible broker.
//!
//! # Delivery semantics
//!
//! **At-least-once** with manual offset commits gated on consumer
//! acknowledgment:
//!
//! - `publish` resolves once the broker acknowledges the record (producer
//!   acks), not when any consumer has processed it.
//! - `subscribe` yields [`Delivery`] items; the offset for a message is
//!   committed only after the consumer calls [`Delivery::ack`]. A nack (or a
//!   dropped delivery) seeks the partition back to the nacked message, so it
//!   is redelivered on the next poll and no later ack can commit past it.
//! - Consumer groups give competing-consumer semantics: each message goes to
//!   exactly one instance of a group, but redeliveries may land on a
//!   different instance.
//!
//! Consumers must be idempotent; nothing here deduplicates.
//!
//! # Example
//!
//! ```no_run
//! use staykey_redpanda::RedpandaEventBus;
//! use staykey_core::event_bus::EventBus;
//! use staykey_core::event::SerializedEvent;
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = RedpandaEventBus::builder()
//!     .brokers("localhost:9092")
//!     .consumer_group("key-service")
//!     .build()?;
//!
//! let event = SerializedEvent::new("ReservationCreated".to_string(), vec![1, 2, 3], None)
//!     .with_origin("reservation-service");
//! bus.publish("reservation-events", &event).await?;
//!
//! let mut stream = bus.subscribe(&["reservation-events"]).await?;
//! while let Some(result) = stream.next().await {
//!     match result {
//!         Ok(delivery) => {
//!             println!("received {}", delivery.event().event_type);
//!             delivery.ack();
//!         },
//!         Err(e) => eprintln!("stream error: {e}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use staykey_core::event::SerializedEvent;
use staykey_core::event_bus::{
    AckOutcome, Delivery, DeliveryStream, EventBus, EventBusError,
};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use rdkafka::Offset;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Redpanda/Kafka event channel.
///
/// Holds one producer for publishing; each subscription creates its own
/// consumer joined to a consumer group. Configure with [`RedpandaEventBus::builder`].
pub struct RedpandaEventBus {
    /// Kafka producer for publishing events
    producer: FutureProducer,
    /// Broker addresses (for creating consumers)
    brokers: String,
    /// Producer send timeout
    timeout: Duration,
    /// Consumer group ID (if explicitly set)
    consumer_group: Option<String>,
    /// Delivery buffer size for subscribers
    buffer_size: usize,
    /// Auto offset reset policy
    auto_offset_reset: String,
}

impl RedpandaEventBus {
    /// Create a new event bus with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::ConnectionFailed`] if the producer cannot be
    /// created from the broker configuration.
    pub fn new(brokers: &str) -> Result<Self, EventBusError> {
        Self::builder().brokers(brokers).build()
    }

    /// Create a new builder for configuring the event bus.
    #[must_use]
    pub fn builder() -> RedpandaEventBusBuilder {
        RedpandaEventBusBuilder::default()
    }

    /// The configured broker addresses.
    #[must_use]
    pub fn brokers(&self) -> &str {
        &self.brokers
    }
}

/// Builder for configuring a [`RedpandaEventBus`].
#[derive(Default)]
pub struct RedpandaEventBusBuilder {
    brokers: Option<String>,
    producer_acks: Option<String>,
    timeout: Option<Duration>,
    consumer_group: Option<String>,
    buffer_size: Option<usize>,
    auto_offset_reset: Option<String>,
}

impl RedpandaEventBusBuilder {
    /// Set the broker addresses (comma-separated, e.g. "localhost:9092").
    #[must_use]
    pub fn brokers(mut self, brokers: impl Into<String>) -> Self {
        self.brokers = Some(brokers.into());
        self
    }

    /// Set the producer acknowledgment mode: "0", "1", or "all".
    ///
    /// Default: "all" — a publish only resolves once the broker has
    /// durably accepted the record.
    #[must_use]
    pub fn producer_acks(mut self, acks: impl Into<String>) -> Self {
        self.producer_acks = Some(acks.into());
        self
    }

    /// Set the producer send timeout.
    ///
    /// Default: 5 seconds. A timed-out publish surfaces as
    /// [`EventBusError::PublishFailed`]; the caller decides what that means
    /// (the reservation ledger logs it and keeps the committed row).
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the consumer group ID for subscriptions.
    ///
    /// Multiple service instances sharing a group split the message stream
    /// (competing consumers). If not set, a group name is derived from the
    /// subscribed topics.
    #[must_use]
    pub fn consumer_group(mut self, consumer_group: impl Into<String>) -> Self {
        self.consumer_group = Some(consumer_group.into());
        self
    }

    /// Set the delivery buffer size for subscriptions (default: 64).
    ///
    /// # Panics
    ///
    /// Panics if `buffer_size` is 0.
    #[must_use]
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        assert!(buffer_size > 0, "buffer_size must be greater than 0");
        self.buffer_size = Some(buffer_size);
        self
    }

    /// Set where new consumer groups start reading: "earliest" or "latest".
    ///
    /// Default: "earliest" — a freshly deployed key provisioner must see
    /// reservations created before its first start.
    #[must_use]
    pub fn auto_offset_reset(mut self, policy: impl Into<String>) -> Self {
        self.auto_offset_reset = Some(policy.into());
        self
    }

    /// Build the [`RedpandaEventBus`].
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::ConnectionFailed`] if brokers are not set or
    /// the producer cannot be created.
    pub fn build(self) -> Result<RedpandaEventBus, EventBusError> {
        let brokers = self
            .brokers
            .ok_or_else(|| EventBusError::ConnectionFailed("Brokers not configured".to_string()))?;

        let mut producer_config = ClientConfig::new();
        producer_config
            .set("bootstrap.servers", &brokers)
            .set("message.timeout.ms", "5000")
            .set("acks", self.producer_acks.as_deref().unwrap_or("all"));

        let producer: FutureProducer = producer_config.create().map_err(|e| {
            EventBusError::ConnectionFailed(format!("Failed to create producer: {e}"))
        })?;

        tracing::info!(
            brokers = %brokers,
            acks = self.producer_acks.as_deref().unwrap_or("all"),
            auto_offset_reset = self.auto_offset_reset.as_deref().unwrap_or("earliest"),
            "RedpandaEventBus created"
        );

        Ok(RedpandaEventBus {
            producer,
            brokers,
            timeout: self.timeout.unwrap_or(Duration::from_secs(5)),
            consumer_group: self.consumer_group,
            buffer_size: self.buffer_size.unwrap_or(64),
            auto_offset_reset: self
                .auto_offset_reset
                .unwrap_or_else(|| "earliest".to_string()),
        })
    }
}

impl EventBus for RedpandaEventBus {
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        let topic = topic.to_string();
        let event = event.clone();
        let timeout = self.timeout;

        Box::pin(async move {
            let payload =
                bincode::serialize(&event).map_err(|e| EventBusError::PublishFailed {
                    topic: topic.clone(),
                    reason: format!("Failed to serialize event: {e}"),
                })?;

            // Key by event type: events of one type stay in one partition,
            // which keeps per-type ordering without pinning all traffic to
            // a single partition.
            let key = event.event_type.as_bytes();

            let record = FutureRecord::to(&topic).payload(&payload).key(key);

            let send_result = self.producer.send(record, Timeout::After(timeout)).await;

            match send_result {
                Ok((partition, offset)) => {
                    tracing::debug!(
                        topic = %topic,
                        partition = partition,
                        offset = offset,
                        event_type = %event.event_type,
                        origin = event.origin().unwrap_or("unknown"),
                        "Event published"
                    );
                    Ok(())
                },
                Err((kafka_error, _)) => {
                    tracing::error!(
                        topic = %topic,
                        event_type = %event.event_type,
                        error = %kafka_error,
                        "Failed to publish event"
                    );
                    Err(EventBusError::PublishFailed {
                        topic,
                        reason: kafka_error.to_string(),
                    })
                },
            }
        })
    }

    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<DeliveryStream, EventBusError>> + Send + '_>> {
        let topics: Vec<String> = topics.iter().map(|s| (*s).to_string()).collect();
        let brokers = self.brokers.clone();
        let consumer_group = self.consumer_group.clone();
        let buffer_size = self.buffer_size;
        let auto_offset_reset = self.auto_offset_reset.clone();

        Box::pin(async move {
            let consumer_group_id = consumer_group.unwrap_or_else(|| {
                let mut sorted_topics = topics.clone();
                sorted_topics.sort();
                format!("staykey-{}", sorted_topics.join("-"))
            });

            // Manual commit only: the offset moves when the consumer acks.
            let consumer: StreamConsumer = ClientConfig::new()
                .set("bootstrap.servers", &brokers)
                .set("group.id", &consumer_group_id)
                .set("enable.auto.commit", "false")
                .set("auto.offset.reset", &auto_offset_reset)
                .set("session.timeout.ms", "6000")
                .set("enable.partition.eof", "false")
                .create()
                .map_err(|e| EventBusError::SubscriptionFailed {
                    topics: topics.clone(),
                    reason: format!("Failed to create consumer: {e}"),
                })?;

            let topic_refs: Vec<&str> = topics.iter().map(String::as_str).collect();
            consumer
                .subscribe(&topic_refs)
                .map_err(|e| EventBusError::SubscriptionFailed {
                    topics: topics.clone(),
                    reason: format!("Failed to subscribe to topics: {e}"),
                })?;

            tracing::info!(
                topics = ?topics,
                consumer_group = %consumer_group_id,
                "Subscribed to topics"
            );

            let (tx, rx) = tokio::sync::mpsc::channel(buffer_size);

            // The spawned task owns the consumer. It forwards each message as
            // a Delivery and waits for the consumer's verdict before moving
            // the offset, one message at a time.
            tokio::spawn(async move {
                use futures::StreamExt;

                let mut stream = consumer.stream();

                while let Some(msg_result) = stream.next().await {
                    match msg_result {
                        Ok(message) => {
                            let Some(payload) = message.payload() else {
                                // A record with no payload carries nothing to
                                // retry; settle it so it cannot wedge the
                                // subscription.
                                let err = EventBusError::DeserializationFailed(
                                    "Message has no payload".to_string(),
                                );
                                if tx.send(Err(err)).await.is_err() {
                                    break;
                                }
                                commit(&consumer, &message);
                                continue;
                            };

                            let event = match bincode::deserialize::<SerializedEvent>(payload) {
                                Ok(event) => event,
                                Err(e) => {
                                    // Poison message: surface the error and
                                    // settle, same as the missing-payload case.
                                    let err = EventBusError::DeserializationFailed(format!(
                                        "Failed to deserialize event: {e}"
                                    ));
                                    if tx.send(Err(err)).await.is_err() {
                                        break;
                                    }
                                    commit(&consumer, &message);
                                    continue;
                                },
                            };

                            tracing::trace!(
                                topic = message.topic(),
                                partition = message.partition(),
                                offset = message.offset(),
                                event_type = %event.event_type,
                                "Delivering event"
                            );

                            let (ack_tx, ack_rx) = tokio::sync::oneshot::channel();
                            if tx.send(Ok(Delivery::new(event, ack_tx))).await.is_err() {
                                tracing::debug!("Subscriber dropped, exiting consumer task");
                                break; // Exit WITHOUT committing.
                            }

                            // Block on the handler's verdict: at-least-once
                            // requires that a crash before ack leaves the
                            // offset uncommitted.
                            match settle(ack_rx.await.ok()) {
                                Settlement::Commit => commit(&consumer, &message),
                                Settlement::Rewind => rewind(&consumer, &message),
                            }
                        },
                        Err(e) => {
                            let err = EventBusError::TransportError(format!(
                                "Failed to receive message: {e}"
                            ));
                            if tx.send(Err(err)).await.is_err() {
                                break;
                            }
                        },
                    }
                }

                tracing::debug!("Consumer task exiting");
            });

            let stream = async_stream::stream! {
                let mut rx = rx;
                while let Some(result) = rx.recv().await {
                    yield result;
                }
            };

            Ok(Box::pin(stream) as DeliveryStream)
        })
    }
}

/// What the consumer task does with a message once its verdict is in.
///
/// `None` is a dropped verdict channel; the delivery's `Drop` sends a nack
/// first, so this arm only covers a handler that vanished mid-flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settlement {
    /// Commit the offset; the message is done.
    Commit,
    /// Seek the partition back to the message so it is polled again.
    Rewind,
}

const fn settle(verdict: Option<AckOutcome>) -> Settlement {
    match verdict {
        Some(AckOutcome::Ack) => Settlement::Commit,
        Some(AckOutcome::Nack) | None => Settlement::Rewind,
    }
}

/// Seek back to a nacked message so the next poll redelivers it.
///
/// Leaving the offset uncommitted is not enough on its own: the stream has
/// already moved past the message, and committing any later offset on the
/// same partition would cover it. The seek keeps the nacked message in
/// front of the commit position.
fn rewind(consumer: &StreamConsumer, message: &rdkafka::message::BorrowedMessage<'_>) {
    tracing::warn!(
        topic = message.topic(),
        partition = message.partition(),
        offset = message.offset(),
        "Message nacked, seeking back for redelivery"
    );
    if let Err(e) = consumer.seek(
        message.topic(),
        message.partition(),
        Offset::Offset(message.offset()),
        Timeout::After(Duration::from_secs(5)),
    ) {
        // A failed seek (e.g. the partition was just revoked) falls back to
        // redelivery via the uncommitted offset after the rebalance.
        tracing::error!(
            topic = message.topic(),
            partition = message.partition(),
            offset = message.offset(),
            error = %e,
            "Failed to seek back to nacked message; offset remains uncommitted"
        );
    }
}

fn commit(consumer: &StreamConsumer, message: &rdkafka::message::BorrowedMessage<'_>) {
    if let Err(e) = consumer.commit_message(message, CommitMode::Async) {
        tracing::warn!(
            topic = message.topic(),
            partition = message.partition(),
            offset = message.offset(),
            error = %e,
            "Failed to commit offset (message may be redelivered)"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redpanda_event_bus_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<RedpandaEventBus>();
        assert_sync::<RedpandaEventBus>();
    }

    #[test]
    fn builder_requires_brokers() {
        let result = RedpandaEventBus::builder().build();
        assert!(matches!(result, Err(EventBusError::ConnectionFailed(_))));
    }

    #[test]
    fn only_an_ack_commits_the_offset() {
        assert_eq!(settle(Some(AckOutcome::Ack)), Settlement::Commit);
    }

    #[test]
    fn nack_and_lost_verdict_rewind_instead_of_advancing() {
        // Advancing past a nacked message would let a later ack commit an
        // offset that covers it, losing the event across a restart.
        assert_eq!(settle(Some(AckOutcome::Nack)), Settlement::Rewind);
        assert_eq!(settle(None), Settlement::Rewind);
    }
}
