use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem, OrderStatus};

/// Ad-hoc checkout line: quantity of a product at a client-declared unit
/// price. The declared price is cross-checked against the product record
/// before it is trusted.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AdHocLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdHocOrderRequest {
    pub items: Vec<AdHocLine>,
    /// Client-side display total; ignored in favor of the recomputed sum.
    #[serde(default)]
    pub total: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ShipOrderRequest {
    pub tracking_number: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InventoryAdjustRequest {
    pub delta: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
