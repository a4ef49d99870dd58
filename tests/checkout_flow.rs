use std::sync::Arc;
use std::time::Duration;

use axum_marketplace_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        cart::AddToCartRequest,
        checkout::CompleteCheckoutRequest,
        orders::{AdHocLine, AdHocOrderRequest},
    },
    error::AppError,
    events::EventBus,
    middleware::auth::AuthUser,
    models::OrderStatus,
    notifications::{EmailDispatcher, InAppDispatcher, LogMailer, SocketDispatcher, SocketHub},
    payment::CreditCard,
    services::{cart_service, lifecycle_service, order_service},
    state::AppState,
};
use uuid::Uuid;

// Integration flow tests against a real database. Each test creates its own
// users and products, so they can run in parallel without truncation.
// Set TEST_DATABASE_URL or DATABASE_URL to enable them.

async fn setup_state() -> anyhow::Result<Option<AppState>> {
    setup_state_with(false).await
}

async fn setup_state_with(restock_on_cancel: bool) -> anyhow::Result<Option<AppState>> {
    let database_url =
        match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
            Ok(url) => url,
            Err(_) => {
                eprintln!(
                    "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
                );
                return Ok(None);
            }
        };

    let pool = create_pool(&database_url).await?;
    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;

    let sockets = SocketHub::new();
    let events = EventBus::new()
        .subscribe(Arc::new(EmailDispatcher::new(
            pool.clone(),
            Arc::new(LogMailer),
        )))
        .subscribe(Arc::new(InAppDispatcher::new(pool.clone())))
        .subscribe(Arc::new(SocketDispatcher::new(sockets.clone())));

    Ok(Some(AppState::new(
        pool,
        orm,
        events,
        sockets,
        restock_on_cancel,
    )))
}

async fn create_user(state: &AppState, role: &str) -> anyhow::Result<AuthUser> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, email, role) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(format!("{role}-{id}@example.com"))
        .bind(role)
        .execute(&state.pool)
        .await?;
    Ok(AuthUser {
        user_id: id,
        role: role.into(),
    })
}

async fn create_product(
    state: &AppState,
    name: &str,
    price: i64,
    stock: i32,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO products (id, name, price, stock) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(format!("{name}-{id}"))
        .bind(price)
        .bind(stock)
        .execute(&state.pool)
        .await?;
    Ok(id)
}

async fn stock_of(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    let (stock,): (i32,) = sqlx::query_as("SELECT stock FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_one(&state.pool)
        .await?;
    Ok(stock)
}

async fn order_count(state: &AppState, user: &AuthUser) -> anyhow::Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_one(&state.pool)
        .await?;
    Ok(count)
}

async fn notification_count(
    state: &AppState,
    user: &AuthUser,
    kind: &str,
) -> anyhow::Result<i64> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND kind = $2")
            .bind(user.user_id)
            .bind(kind)
            .fetch_one(&state.pool)
            .await?;
    Ok(count)
}

// Dispatch is fire-and-forget; give the spawned tasks time to land.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(300)).await;
}

fn cash_checkout() -> CompleteCheckoutRequest {
    CompleteCheckoutRequest {
        items: None,
        total: None,
        delivery_address: "1 Test Lane".into(),
        delivery_method: "standard".into(),
        payment_method: "cash_on_delivery".into(),
        credit_card: None,
    }
}

#[tokio::test]
async fn whole_cart_checkout_decrements_stock_and_fans_out() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let buyer = create_user(&state, "buyer").await?;
    let product_id = create_product(&state, "Widget", 1999, 3).await?;

    let mut socket_rx = state.sockets.subscribe_user(buyer.user_id).await;

    cart_service::add_to_cart(
        &state.pool,
        &buyer,
        AddToCartRequest {
            product_id,
            quantity: 1,
        },
    )
    .await?;

    let resp = order_service::checkout(&state, &buyer, cash_checkout()).await?;
    let data = resp.data.unwrap();
    assert_eq!(data.order.total_amount, 1999);
    assert_eq!(data.order.status, OrderStatus::Pending);
    assert_eq!(data.items.len(), 1);
    assert_eq!(data.items[0].price, 1999);

    // Stock decremented exactly once per unit ordered.
    assert_eq!(stock_of(&state, product_id).await?, 2);

    // Cart cleared.
    let lines = cart_service::cart_lines(&state.pool, &buyer).await?;
    assert!(lines.is_empty());

    settle().await;

    // In-app and socket channels both observed the OrderPlaced event.
    assert_eq!(notification_count(&state, &buyer, "order_placed").await?, 1);
    let payload = socket_rx.try_recv()?;
    assert!(payload.contains("order_placed"));
    assert!(payload.contains(&data.order.id.to_string()));

    Ok(())
}

#[tokio::test]
async fn insufficient_stock_aborts_the_whole_order() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let buyer = create_user(&state, "buyer").await?;
    let in_stock = create_product(&state, "Plenty", 1000, 5).await?;
    let sold_out = create_product(&state, "SoldOut", 2000, 0).await?;

    for (product_id, quantity) in [(in_stock, 2), (sold_out, 1)] {
        cart_service::add_to_cart(
            &state.pool,
            &buyer,
            AddToCartRequest {
                product_id,
                quantity,
            },
        )
        .await?;
    }

    let err = order_service::checkout(&state, &buyer, cash_checkout())
        .await
        .unwrap_err();
    assert!(
        matches!(err, AppError::InsufficientStock { product_id, .. } if product_id == sold_out),
        "unexpected error: {err:?}"
    );

    // Nothing persisted: the earlier line's decrement rolled back too.
    assert_eq!(stock_of(&state, in_stock).await?, 5);
    assert_eq!(stock_of(&state, sold_out).await?, 0);
    assert_eq!(order_count(&state, &buyer).await?, 0);

    // Cart untouched.
    assert_eq!(cart_service::cart_lines(&state.pool, &buyer).await?.len(), 2);

    settle().await;
    assert_eq!(notification_count(&state, &buyer, "order_placed").await?, 0);

    Ok(())
}

#[tokio::test]
async fn concurrent_checkouts_for_last_unit_serialize() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let first = create_user(&state, "buyer").await?;
    let second = create_user(&state, "buyer").await?;
    let product_id = create_product(&state, "LastUnit", 1500, 1).await?;

    let request = || AdHocOrderRequest {
        items: vec![AdHocLine {
            product_id,
            quantity: 1,
            price: 1500,
        }],
        total: None,
    };

    let (a, b) = tokio::join!(
        order_service::place_ad_hoc(&state, &first, request()),
        order_service::place_ad_hoc(&state, &second, request()),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1, "exactly one checkout must win the last unit");

    let failure = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert!(matches!(failure, AppError::InsufficientStock { .. }));

    assert_eq!(stock_of(&state, product_id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn ad_hoc_checkout_rejects_stale_prices() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let buyer = create_user(&state, "buyer").await?;
    let product_id = create_product(&state, "Repriced", 2500, 10).await?;

    let err = order_service::place_ad_hoc(
        &state,
        &buyer,
        AdHocOrderRequest {
            items: vec![AdHocLine {
                product_id,
                quantity: 1,
                price: 1500,
            }],
            total: None,
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        AppError::PriceMismatch {
            declared: 1500,
            current: 2500,
            ..
        }
    ));
    assert_eq!(stock_of(&state, product_id).await?, 10);
    assert_eq!(order_count(&state, &buyer).await?, 0);

    Ok(())
}

#[tokio::test]
async fn empty_order_is_rejected() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let buyer = create_user(&state, "buyer").await?;

    let err = order_service::checkout(&state, &buyer, cash_checkout())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmptyOrder));

    let err = order_service::place_ad_hoc(&state, &buyer, AdHocOrderRequest {
        items: vec![],
        total: None,
    })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmptyOrder));

    Ok(())
}

#[tokio::test]
async fn bad_card_fails_before_any_mutation() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let buyer = create_user(&state, "buyer").await?;
    let product_id = create_product(&state, "CardTest", 3000, 4).await?;

    cart_service::add_to_cart(
        &state.pool,
        &buyer,
        AddToCartRequest {
            product_id,
            quantity: 1,
        },
    )
    .await?;

    let request = CompleteCheckoutRequest {
        items: None,
        total: None,
        delivery_address: "1 Test Lane".into(),
        delivery_method: "standard".into(),
        payment_method: "credit_card".into(),
        credit_card: Some(CreditCard {
            number: "4111".into(),
            expiry: "12/99".into(),
            cvv: "123".into(),
        }),
    };

    let err = order_service::checkout(&state, &buyer, request)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PaymentValidation(_)));

    assert_eq!(stock_of(&state, product_id).await?, 4);
    assert_eq!(order_count(&state, &buyer).await?, 0);
    assert_eq!(cart_service::cart_lines(&state.pool, &buyer).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn status_transitions_publish_once_and_idempotently() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let buyer = create_user(&state, "buyer").await?;
    let seller = create_user(&state, "seller").await?;
    let product_id = create_product(&state, "Lifecycle", 1200, 10).await?;

    let resp = order_service::place_ad_hoc(
        &state,
        &buyer,
        AdHocOrderRequest {
            items: vec![AdHocLine {
                product_id,
                quantity: 1,
                price: 1200,
            }],
            total: None,
        },
    )
    .await?;
    let order = resp.data.unwrap().order;

    // Ship with tracking number.
    let shipped = lifecycle_service::ship_order(&state, &seller, order.id, "TRACK-99".into())
        .await?
        .data
        .unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);
    assert_eq!(shipped.tracking_number.as_deref(), Some("TRACK-99"));

    settle().await;
    assert_eq!(notification_count(&state, &buyer, "order_shipped").await?, 1);

    // Complete, then repeat: the repeat is a no-op with no extra event.
    lifecycle_service::set_status(&state, &seller, order.id, OrderStatus::Completed, None).await?;
    let repeat = lifecycle_service::set_status(&state, &seller, order.id, OrderStatus::Completed, None)
        .await?
        .data
        .unwrap();
    assert_eq!(repeat.status, OrderStatus::Completed);

    settle().await;
    assert_eq!(notification_count(&state, &buyer, "order_status").await?, 1);

    // Terminal state rejects further transitions.
    let err = lifecycle_service::set_status(&state, &seller, order.id, OrderStatus::Cancelled, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidTransition {
            from: OrderStatus::Completed,
            to: OrderStatus::Cancelled,
        }
    ));

    // Buyers cannot drive the state machine at all.
    let err = lifecycle_service::set_status(&state, &buyer, order.id, OrderStatus::Cancelled, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    Ok(())
}

#[tokio::test]
async fn cancellation_does_not_restock_by_default() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let buyer = create_user(&state, "buyer").await?;
    let admin = create_user(&state, "admin").await?;
    let product_id = create_product(&state, "NoRestock", 800, 5).await?;

    let resp = order_service::place_ad_hoc(
        &state,
        &buyer,
        AdHocOrderRequest {
            items: vec![AdHocLine {
                product_id,
                quantity: 2,
                price: 800,
            }],
            total: None,
        },
    )
    .await?;
    let order = resp.data.unwrap().order;
    assert_eq!(stock_of(&state, product_id).await?, 3);

    lifecycle_service::set_status(&state, &admin, order.id, OrderStatus::Cancelled, None).await?;

    // restock_on_cancel is off: the units stay consumed until someone
    // adjusts inventory manually.
    assert_eq!(stock_of(&state, product_id).await?, 3);

    Ok(())
}

#[tokio::test]
async fn cancellation_restocks_when_policy_enabled() -> anyhow::Result<()> {
    let Some(state) = setup_state_with(true).await? else {
        return Ok(());
    };

    let buyer = create_user(&state, "buyer").await?;
    let admin = create_user(&state, "admin").await?;
    let product_id = create_product(&state, "Restock", 800, 5).await?;

    let resp = order_service::place_ad_hoc(
        &state,
        &buyer,
        AdHocOrderRequest {
            items: vec![AdHocLine {
                product_id,
                quantity: 2,
                price: 800,
            }],
            total: None,
        },
    )
    .await?;
    let order = resp.data.unwrap().order;
    assert_eq!(stock_of(&state, product_id).await?, 3);

    lifecycle_service::set_status(&state, &admin, order.id, OrderStatus::Cancelled, None).await?;

    // The cancelled units go back on the shelf in the same transaction as
    // the status flip.
    assert_eq!(stock_of(&state, product_id).await?, 5);

    Ok(())
}
