//! In-memory event bus for tests.

use staykey_core::event::SerializedEvent;
use staykey_core::event_bus::{
    AckOutcome, Delivery, DeliveryStream, EventBus, EventBusError,
};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify, oneshot};

#[derive(Default)]
struct Shared {
    queues: HashMap<String, VecDeque<SerializedEvent>>,
    published: Vec<(String, SerializedEvent)>,
    fail_publish: bool,
}

/// In-memory [`EventBus`] with production acknowledgment semantics.
///
/// - Messages queue per topic; each message is delivered to exactly one
///   subscriber (competing-consumer semantics).
/// - A nacked or dropped delivery is requeued, so tests observe real
///   redelivery, duplicates included.
/// - `publish` can be switched to fail, to exercise the
///   publish-after-commit gap in the reservation ledger.
///
/// # Example
///
/// ```
/// use staykey_testing::InMemoryEventBus;
/// use staykey_core::event::SerializedEvent;
/// use staykey_core::event_bus::EventBus;
/// use futures::StreamExt;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bus = InMemoryEventBus::new();
/// let event = SerializedEvent::new("ReservationCreated".to_string(), vec![], None);
/// bus.publish("reservation-events", &event).await?;
///
/// let mut stream = bus.subscribe(&["reservation-events"]).await?;
/// let delivery = stream.next().await.ok_or("stream ended")??;
/// delivery.ack();
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    shared: Arc<Mutex<Shared>>,
    notify: Arc<Notify>,
}

impl InMemoryEventBus {
    /// Create a new empty in-memory event bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `publish` calls fail with a transport error.
    pub async fn set_fail_publish(&self, fail: bool) {
        self.shared.lock().await.fail_publish = fail;
    }

    /// All successfully published `(topic, event)` pairs, in order.
    pub async fn published(&self) -> Vec<(String, SerializedEvent)> {
        self.shared.lock().await.published.clone()
    }

    /// Number of events successfully published to `topic`.
    pub async fn publish_count(&self, topic: &str) -> usize {
        self.shared
            .lock()
            .await
            .published
            .iter()
            .filter(|(t, _)| t == topic)
            .count()
    }

    /// Number of events still queued (undelivered or nacked) on `topic`.
    pub async fn pending(&self, topic: &str) -> usize {
        self.shared
            .lock()
            .await
            .queues
            .get(topic)
            .map_or(0, VecDeque::len)
    }

    /// Requeue a copy of an already-published event.
    ///
    /// Simulates the channel redelivering a message it already delivered,
    /// e.g. after a visibility timeout on another instance.
    pub async fn redeliver(&self, topic: &str, event: SerializedEvent) {
        self.shared
            .lock()
            .await
            .queues
            .entry(topic.to_string())
            .or_default()
            .push_back(event);
        self.notify.notify_waiters();
    }
}

impl EventBus for InMemoryEventBus {
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        let topic = topic.to_string();
        let event = event.clone();

        Box::pin(async move {
            let mut shared = self.shared.lock().await;
            if shared.fail_publish {
                return Err(EventBusError::PublishFailed {
                    topic,
                    reason: "simulated publish failure".to_string(),
                });
            }

            shared
                .queues
                .entry(topic.clone())
                .or_default()
                .push_back(event.clone());
            shared.published.push((topic, event));
            drop(shared);

            self.notify.notify_waiters();
            Ok(())
        })
    }

    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<DeliveryStream, EventBusError>> + Send + '_>> {
        let topics: Vec<String> = topics.iter().map(|s| (*s).to_string()).collect();
        let shared = Arc::clone(&self.shared);
        let notify = Arc::clone(&self.notify);

        Box::pin(async move {
            let stream = async_stream::stream! {
                loop {
                    // Arm the wakeup before checking the queues so a publish
                    // between check and wait is not missed.
                    let notified = notify.notified();

                    let next = {
                        let mut guard = shared.lock().await;
                        topics.iter().find_map(|topic| {
                            guard
                                .queues
                                .get_mut(topic)
                                .and_then(VecDeque::pop_front)
                                .map(|event| (topic.clone(), event))
                        })
                    };

                    match next {
                        Some((topic, event)) => {
                            let (ack_tx, ack_rx) = oneshot::channel();
                            yield Ok(Delivery::new(event.clone(), ack_tx));

                            // Nack (explicit or via drop) requeues the
                            // message: the test sees a redelivery.
                            match ack_rx.await {
                                Ok(AckOutcome::Ack) => {},
                                Ok(AckOutcome::Nack) | Err(_) => {
                                    shared
                                        .lock()
                                        .await
                                        .queues
                                        .entry(topic)
                                        .or_default()
                                        .push_back(event);
                                    notify.notify_waiters();
                                },
                            }
                        },
                        None => notified.await,
                    }
                }
                // Unreachable: pins the generated async block's output to
                // `()` under edition 2024 never-type fallback.
                #[allow(unreachable_code)]
                ()
            };

            Ok(Box::pin(stream) as DeliveryStream)
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)] // Test code

    use super::*;
    use futures::{FutureExt, StreamExt};

    fn test_event(id: u8) -> SerializedEvent {
        SerializedEvent::new("Test".to_string(), vec![id], None)
    }

    #[tokio::test]
    async fn publish_then_consume_and_ack() {
        let bus = InMemoryEventBus::new();
        bus.publish("t", &test_event(1)).await.unwrap();

        let mut stream = bus.subscribe(&["t"]).await.unwrap();
        let delivery = stream.next().await.unwrap().unwrap();
        assert_eq!(delivery.event().data, vec![1]);
        delivery.ack();

        // Acked messages are settled, not requeued.
        assert!(stream.next().now_or_never().flatten().is_none());
        assert_eq!(bus.pending("t").await, 0);
    }

    #[tokio::test]
    async fn nack_requeues_for_redelivery() {
        let bus = InMemoryEventBus::new();
        bus.publish("t", &test_event(7)).await.unwrap();

        let mut stream = bus.subscribe(&["t"]).await.unwrap();
        let delivery = stream.next().await.unwrap().unwrap();
        delivery.nack();

        // The same message comes around again.
        let redelivered = stream.next().await.unwrap().unwrap();
        assert_eq!(redelivered.event().data, vec![7]);
        redelivered.ack();
    }

    #[tokio::test]
    async fn failed_publish_reaches_no_subscriber() {
        let bus = InMemoryEventBus::new();
        bus.set_fail_publish(true).await;

        let result = bus.publish("t", &test_event(1)).await;
        assert!(matches!(result, Err(EventBusError::PublishFailed { .. })));
        assert_eq!(bus.publish_count("t").await, 0);
        assert_eq!(bus.pending("t").await, 0);
    }

    #[tokio::test]
    async fn subscriber_only_sees_requested_topics() {
        let bus = InMemoryEventBus::new();
        bus.publish("other", &test_event(1)).await.unwrap();
        bus.publish("mine", &test_event(2)).await.unwrap();

        let mut stream = bus.subscribe(&["mine"]).await.unwrap();
        let delivery = stream.next().await.unwrap().unwrap();
        assert_eq!(delivery.event().data, vec![2]);
        delivery.ack();
        assert_eq!(bus.pending("other").await, 1);
    }
}
