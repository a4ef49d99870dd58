use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::{AuditAction, log_audit},
    dto::{
        checkout::CompleteCheckoutRequest,
        orders::{AdHocOrderRequest, OrderList, OrderWithItems},
    },
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    events::OrderEvent,
    middleware::auth::AuthUser,
    models::{Order, OrderItem, OrderStatus},
    payment,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{cart_service, inventory_service},
    state::AppState,
};

/// One line of a checkout request. `declared_price` is only present on the
/// ad-hoc path and is never trusted without a cross-check against the
/// product record.
#[derive(Debug, Clone)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub declared_price: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSource {
    WholeCart,
    AdHoc,
}

/// Full checkout: simulated payment validation, then the atomic
/// cart -> order conversion (or an explicit item list when one is sent).
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CompleteCheckoutRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    if payload.payment_method == "credit_card" {
        let card = payload
            .credit_card
            .as_ref()
            .ok_or_else(|| AppError::PaymentValidation("credit card details required".into()))?;
        payment::validate_card(card)?;
    }

    // Explicit items take the ad-hoc path (declared prices cross-checked,
    // cart untouched); otherwise the caller's cart is checked out.
    let (lines, source) = match payload.items.filter(|items| !items.is_empty()) {
        Some(items) => (
            items
                .into_iter()
                .map(|item| OrderLine {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    declared_price: Some(item.price),
                })
                .collect(),
            OrderSource::AdHoc,
        ),
        None => (
            cart_service::cart_lines(&state.pool, user).await?,
            OrderSource::WholeCart,
        ),
    };
    let (order, items) = place_order(state, user, lines, source).await?;

    Ok(ApiResponse::success(
        "Checkout success",
        OrderWithItems { order, items },
        Some(Meta::empty()),
    ))
}

/// Ad-hoc checkout from an explicit item list, bypassing the cart.
pub async fn place_ad_hoc(
    state: &AppState,
    user: &AuthUser,
    payload: AdHocOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let lines = payload
        .items
        .into_iter()
        .map(|item| OrderLine {
            product_id: item.product_id,
            quantity: item.quantity,
            declared_price: Some(item.price),
        })
        .collect();

    let (order, items) = place_order(state, user, lines, OrderSource::AdHoc).await?;

    Ok(ApiResponse::success(
        "Order placed",
        OrderWithItems { order, items },
        Some(Meta::empty()),
    ))
}

/// Convert line items into a persisted order.
///
/// Everything through the cart clearing runs in one transaction: stock
/// checks and decrements, the order and item inserts, and (for whole-cart
/// checkout) emptying the cart. Any failure on any line rolls the whole
/// thing back; no partial order and no stray stock decrement can survive.
/// The OrderPlaced event is published only after commit.
pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    lines: Vec<OrderLine>,
    source: OrderSource,
) -> AppResult<(Order, Vec<OrderItem>)> {
    if lines.is_empty() {
        return Err(AppError::EmptyOrder);
    }

    let txn = state.orm.begin().await?;

    let mut total_amount: i64 = 0;
    let mut priced: Vec<(OrderLine, i64)> = Vec::with_capacity(lines.len());

    for line in lines {
        if line.quantity <= 0 {
            return Err(AppError::BadRequest("quantity must be greater than 0".into()));
        }

        // Lock the product row so concurrent checkouts for the same product
        // serialize here.
        let product = Products::find_by_id(line.product_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or(AppError::ProductNotFound(line.product_id))?;

        // The unit price is always the stored one. A declared price that
        // disagrees means the client is working from stale data.
        if let Some(declared) = line.declared_price {
            if declared != product.price {
                return Err(AppError::PriceMismatch {
                    product_id: product.id,
                    declared,
                    current: product.price,
                });
            }
        }

        inventory_service::reserve(&txn, &product, line.quantity).await?;

        total_amount += product.price * (line.quantity as i64);
        let price = product.price;
        priced.push((line, price));
    }

    let order_id = Uuid::new_v4();
    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(user.user_id),
        total_amount: Set(total_amount),
        status: Set(OrderStatus::Pending.as_str().into()),
        tracking_number: Set(None),
        invoice_number: Set(build_invoice_number(order_id)),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items: Vec<OrderItem> = Vec::with_capacity(priced.len());
    for (line, price) in priced {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            price: Set(price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        items.push(order_item_from_entity(item));
    }

    if source == OrderSource::WholeCart {
        CartItems::delete_many()
            .filter(CartCol::UserId.eq(user.user_id))
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;

    let order = order_from_entity(order)?;

    state
        .events
        .publish(OrderEvent::placed(order.clone(), items.clone()));

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        AuditAction::OrderPlaced,
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "total_amount": order.total_amount })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok((order, items))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order)?,
            items,
        },
        Some(Meta::empty()),
    ))
}

pub(crate) fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    let status: OrderStatus = model
        .status
        .parse()
        .map_err(|err: String| AppError::Internal(anyhow::anyhow!(err)))?;
    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        total_amount: model.total_amount,
        status,
        tracking_number: model.tracking_number,
        invoice_number: model.invoice_number,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

pub(crate) fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        quantity: model.quantity,
        price: model.price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn build_invoice_number(order_id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = order_id.to_string();
    let short = &suffix[..8];
    format!("INV-{}-{}", date, short)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_numbers_embed_date_and_order_prefix() {
        let id = Uuid::new_v4();
        let invoice = build_invoice_number(id);
        assert!(invoice.starts_with("INV-"));
        assert!(invoice.ends_with(&id.to_string()[..8]));
        assert_eq!(invoice.len(), "INV-".len() + 8 + 1 + 8);
    }
}
