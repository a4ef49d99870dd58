use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::OrderEvent;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("mail transport error: {0}")]
    Mail(String),

    #[error("recipient {0} has no account record")]
    UnknownRecipient(uuid::Uuid),
}

/// A notification channel reacting to order lifecycle events.
///
/// Dispatchers run outside the transaction that produced the event: by the
/// time one executes, the order change is already durable. Errors are
/// reported to the bus, which logs them; they never reach the request path.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn dispatch(&self, event: &OrderEvent) -> Result<(), DispatchError>;
}

/// In-process publish/subscribe with an explicit registry.
///
/// Subscribers are registered once at startup. `publish` spawns one task per
/// subscriber and returns immediately; there is no ordering guarantee between
/// subscribers, and a failing subscriber does not affect the others.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Vec<Arc<dyn Dispatcher>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.subscribers.push(dispatcher);
        self
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Fan an event out to every subscriber. Publishing with no subscribers
    /// is a silent no-op.
    pub fn publish(&self, event: OrderEvent) {
        for dispatcher in &self.subscribers {
            let dispatcher = Arc::clone(dispatcher);
            let event = event.clone();
            tokio::spawn(async move {
                if let Err(err) = dispatcher.dispatch(&event).await {
                    tracing::warn!(
                        dispatcher = dispatcher.name(),
                        event = event.kind(),
                        order_id = %event.order().id,
                        error = %err,
                        "notification dispatch failed"
                    );
                } else {
                    tracing::debug!(
                        dispatcher = dispatcher.name(),
                        event = event.kind(),
                        order_id = %event.order().id,
                        "notification dispatched"
                    );
                }
            });
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Order, OrderStatus};
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use uuid::Uuid;

    fn test_order() -> Order {
        Order {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            total_amount: 1999,
            status: OrderStatus::Pending,
            tracking_number: None,
            invoice_number: "INV-20260101-deadbeef".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    struct Counting {
        hits: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Dispatcher for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn dispatch(&self, _event: &OrderEvent) -> Result<(), DispatchError> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Dispatcher for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn dispatch(&self, _event: &OrderEvent) -> Result<(), DispatchError> {
            Err(DispatchError::Mail("smtp unreachable".into()))
        }
    }

    async fn settle() {
        // Dispatch is fire-and-forget; give spawned tasks a chance to run.
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn publish_reaches_every_subscriber() {
        let hits = Arc::new(AtomicUsize::new(0));
        let bus = EventBus::new()
            .subscribe(Arc::new(Counting { hits: hits.clone() }))
            .subscribe(Arc::new(Counting { hits: hits.clone() }))
            .subscribe(Arc::new(Counting { hits: hits.clone() }));

        bus.publish(OrderEvent::placed(test_order(), vec![]));
        settle().await;

        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failing_subscriber_does_not_starve_the_rest() {
        let hits = Arc::new(AtomicUsize::new(0));
        let bus = EventBus::new()
            .subscribe(Arc::new(Failing))
            .subscribe(Arc::new(Counting { hits: hits.clone() }))
            .subscribe(Arc::new(Failing))
            .subscribe(Arc::new(Counting { hits: hits.clone() }));

        bus.publish(OrderEvent::status_changed(
            test_order(),
            OrderStatus::Pending,
            OrderStatus::Completed,
        ));
        settle().await;

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_no_op() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(OrderEvent::placed(test_order(), vec![]));
        settle().await;
    }
}
