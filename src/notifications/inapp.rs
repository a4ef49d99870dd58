use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::DbPool,
    events::{DispatchError, Dispatcher, OrderEvent},
    models::{OrderStatus, format_amount},
};

/// Persists a notification row per lifecycle event so the order owner sees
/// it in their in-app feed.
pub struct InAppDispatcher {
    pool: DbPool,
}

impl InAppDispatcher {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Dispatcher for InAppDispatcher {
    fn name(&self) -> &'static str {
        "in_app"
    }

    async fn dispatch(&self, event: &OrderEvent) -> Result<(), DispatchError> {
        let (title, message) = describe(event);
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, title, message, kind, related_id, related_type)
            VALUES ($1, $2, $3, $4, $5, $6, 'order')
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event.user_id())
        .bind(title)
        .bind(message)
        .bind(event.kind())
        .bind(event.order().id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn describe(event: &OrderEvent) -> (String, String) {
    match event {
        OrderEvent::Placed { order, .. } => (
            "Order placed".to_string(),
            format!(
                "Order {} was placed for {}.",
                order.invoice_number,
                format_amount(order.total_amount)
            ),
        ),
        OrderEvent::StatusChanged {
            order,
            new: OrderStatus::Shipped,
            ..
        } => (
            "Order shipped".to_string(),
            format!(
                "Order {} shipped (tracking {}).",
                order.invoice_number,
                order.tracking_number.as_deref().unwrap_or("unavailable")
            ),
        ),
        OrderEvent::StatusChanged { order, new, .. } => (
            "Order updated".to_string(),
            format!("Order {} is now {}.", order.invoice_number, new),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Order;
    use chrono::Utc;

    fn order() -> Order {
        Order {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            total_amount: 1999,
            status: OrderStatus::Pending,
            tracking_number: Some("TRACK-7".into()),
            invoice_number: "INV-20260830-11223344".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn placed_event_mentions_amount() {
        let (title, message) = describe(&OrderEvent::placed(order(), vec![]));
        assert_eq!(title, "Order placed");
        assert!(message.contains("19.99"));
    }

    #[test]
    fn shipped_event_mentions_tracking() {
        let (title, message) = describe(&OrderEvent::status_changed(
            order(),
            OrderStatus::Pending,
            OrderStatus::Shipped,
        ));
        assert_eq!(title, "Order shipped");
        assert!(message.contains("TRACK-7"));
    }
}
