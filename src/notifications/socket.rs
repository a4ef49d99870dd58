use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use crate::events::{DispatchError, Dispatcher, OrderEvent};

const CHANNEL_CAPACITY: usize = 64;

/// Fan-out hub for real-time socket pushes.
///
/// One broadcast channel per connected user plus a shared channel for
/// admin-facing dashboards. Delivery is best-effort: sending to a channel
/// nobody listens on, or to a lagged receiver, is not an error.
#[derive(Clone)]
pub struct SocketHub {
    users: Arc<RwLock<HashMap<Uuid, broadcast::Sender<String>>>>,
    broadcast: broadcast::Sender<String>,
}

impl Default for SocketHub {
    fn default() -> Self {
        let (broadcast, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            broadcast,
        }
    }
}

impl SocketHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel for one user, created on first subscription.
    pub async fn subscribe_user(&self, user_id: Uuid) -> broadcast::Receiver<String> {
        let mut users = self.users.write().await;
        users
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    pub fn subscribe_broadcast(&self) -> broadcast::Receiver<String> {
        self.broadcast.subscribe()
    }

    pub async fn send_to_user(&self, user_id: Uuid, payload: String) {
        let mut users = self.users.write().await;
        if let Some(sender) = users.get(&user_id) {
            if sender.receiver_count() == 0 {
                // Every receiver for this user has disconnected; drop the
                // channel so the map stays bounded by live connections.
                users.remove(&user_id);
                return;
            }
            // Err means no live receiver; that is fine for best-effort push.
            let _ = sender.send(payload);
        }
    }

    pub fn send_broadcast(&self, payload: String) {
        let _ = self.broadcast.send(payload);
    }
}

impl std::fmt::Debug for SocketHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketHub").finish_non_exhaustive()
    }
}

/// Pushes a JSON summary of each lifecycle event to the order owner's
/// channel and the admin broadcast channel.
pub struct SocketDispatcher {
    hub: SocketHub,
}

impl SocketDispatcher {
    pub fn new(hub: SocketHub) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl Dispatcher for SocketDispatcher {
    fn name(&self) -> &'static str {
        "socket"
    }

    async fn dispatch(&self, event: &OrderEvent) -> Result<(), DispatchError> {
        let order = event.order();
        let payload = serde_json::json!({
            "event": event.kind(),
            "order_id": order.id,
            "invoice_number": order.invoice_number,
            "status": order.status,
            "total_amount": order.total_amount,
        })
        .to_string();

        self.hub.send_to_user(order.user_id, payload.clone()).await;
        self.hub.send_broadcast(payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Order, OrderStatus};
    use chrono::Utc;

    fn order(user_id: Uuid) -> Order {
        Order {
            id: Uuid::new_v4(),
            user_id,
            total_amount: 500,
            status: OrderStatus::Pending,
            tracking_number: None,
            invoice_number: "INV-20260830-55667788".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn event_reaches_owner_and_broadcast_channels() {
        let hub = SocketHub::new();
        let user_id = Uuid::new_v4();
        let mut user_rx = hub.subscribe_user(user_id).await;
        let mut admin_rx = hub.subscribe_broadcast();

        let dispatcher = SocketDispatcher::new(hub);
        dispatcher
            .dispatch(&OrderEvent::placed(order(user_id), vec![]))
            .await
            .unwrap();

        let payload = user_rx.try_recv().unwrap();
        assert!(payload.contains("order_placed"));
        assert!(admin_rx.try_recv().unwrap().contains("order_placed"));
    }

    #[tokio::test]
    async fn push_without_listeners_succeeds() {
        let dispatcher = SocketDispatcher::new(SocketHub::new());
        let result = dispatcher
            .dispatch(&OrderEvent::placed(order(Uuid::new_v4()), vec![]))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn disconnected_user_channels_are_pruned_on_send() {
        let hub = SocketHub::new();
        let user_id = Uuid::new_v4();
        let rx = hub.subscribe_user(user_id).await;
        drop(rx);

        hub.send_to_user(user_id, "ping".into()).await;
        assert!(hub.users.read().await.is_empty());

        // A fresh subscription gets a fresh channel.
        let mut rx = hub.subscribe_user(user_id).await;
        hub.send_to_user(user_id, "pong".into()).await;
        assert_eq!(rx.try_recv().unwrap(), "pong");
    }

    #[tokio::test]
    async fn other_users_do_not_see_the_message() {
        let hub = SocketHub::new();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let mut stranger_rx = hub.subscribe_user(stranger).await;
        let mut owner_rx = hub.subscribe_user(owner).await;

        let dispatcher = SocketDispatcher::new(hub);
        dispatcher
            .dispatch(&OrderEvent::placed(order(owner), vec![]))
            .await
            .unwrap();

        assert!(owner_rx.try_recv().is_ok());
        assert!(stranger_rx.try_recv().is_err());
    }
}
