pub mod bus;

pub use bus::{DispatchError, Dispatcher, EventBus};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Order, OrderItem, OrderStatus};

/// Immutable fact about an order lifecycle transition. Published once per
/// transition, after the owning transaction has committed; never persisted.
#[derive(Debug, Clone)]
pub enum OrderEvent {
    Placed {
        order: Order,
        items: Vec<OrderItem>,
        at: DateTime<Utc>,
    },
    StatusChanged {
        order: Order,
        old: OrderStatus,
        new: OrderStatus,
        at: DateTime<Utc>,
    },
}

impl OrderEvent {
    pub fn placed(order: Order, items: Vec<OrderItem>) -> Self {
        OrderEvent::Placed {
            order,
            items,
            at: Utc::now(),
        }
    }

    pub fn status_changed(order: Order, old: OrderStatus, new: OrderStatus) -> Self {
        OrderEvent::StatusChanged {
            order,
            old,
            new,
            at: Utc::now(),
        }
    }

    pub fn order(&self) -> &Order {
        match self {
            OrderEvent::Placed { order, .. } | OrderEvent::StatusChanged { order, .. } => order,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.order().user_id
    }

    /// Short tag used for logging, in-app notification kinds, and socket
    /// payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderEvent::Placed { .. } => "order_placed",
            OrderEvent::StatusChanged {
                new: OrderStatus::Shipped,
                ..
            } => "order_shipped",
            OrderEvent::StatusChanged { .. } => "order_status",
        }
    }
}
