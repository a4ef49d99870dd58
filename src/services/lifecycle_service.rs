use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::{AuditAction, log_audit},
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Entity as Orders},
    },
    error::{AppError, AppResult},
    events::OrderEvent,
    middleware::auth::{AuthUser, ensure_fulfiller},
    models::{Order, OrderStatus},
    response::{ApiResponse, Meta},
    services::{inventory_service, order_service::order_from_entity},
    state::AppState,
};

/// Drive an order through its status state machine.
///
/// Setting the current status again is an idempotent no-op: nothing is
/// persisted and no event goes out. A disallowed edge is a caller error.
/// On a real transition the new status is durable before the StatusChanged
/// event is published.
pub async fn set_status(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    new_status: OrderStatus,
    tracking_number: Option<String>,
) -> AppResult<ApiResponse<Order>> {
    ensure_fulfiller(user)?;

    let txn = state.orm.begin().await?;

    let existing = Orders::find_by_id(order_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let old_status: OrderStatus = existing
        .status
        .parse()
        .map_err(|err: String| AppError::Internal(anyhow::anyhow!(err)))?;

    if old_status == new_status {
        // Repeat call; succeed without a second notification.
        return Ok(ApiResponse::success(
            "Status unchanged",
            order_from_entity(existing)?,
            Some(Meta::empty()),
        ));
    }

    if !old_status.can_transition_to(new_status) {
        return Err(AppError::InvalidTransition {
            from: old_status,
            to: new_status,
        });
    }

    if new_status == OrderStatus::Shipped && tracking_number.is_none() {
        return Err(AppError::BadRequest(
            "tracking_number is required when shipping".into(),
        ));
    }

    if new_status == OrderStatus::Cancelled && state.restock_on_cancel {
        restock_items(&txn, order_id).await?;
    }

    let mut active: OrderActive = existing.into();
    active.status = Set(new_status.as_str().into());
    if let Some(tracking) = tracking_number {
        active.tracking_number = Set(Some(tracking));
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await?;

    txn.commit().await?;

    let order = order_from_entity(updated)?;

    state.events.publish(OrderEvent::status_changed(
        order.clone(),
        old_status,
        new_status,
    ));

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        AuditAction::OrderStatusChanged,
        Some("orders"),
        Some(serde_json::json!({
            "order_id": order.id,
            "from": old_status.as_str(),
            "to": new_status.as_str(),
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Status updated",
        order,
        Some(Meta::empty()),
    ))
}

/// Mark an order shipped, attaching the tracking number.
pub async fn ship_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    tracking_number: String,
) -> AppResult<ApiResponse<Order>> {
    if tracking_number.trim().is_empty() {
        return Err(AppError::BadRequest("tracking_number must not be empty".into()));
    }
    set_status(
        state,
        user,
        order_id,
        OrderStatus::Shipped,
        Some(tracking_number),
    )
    .await
}

async fn restock_items<C: sea_orm::ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<()> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .all(conn)
        .await?;
    for item in items {
        inventory_service::release(conn, item.product_id, item.quantity).await?;
    }
    Ok(())
}
