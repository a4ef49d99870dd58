use axum::Router;

use crate::state::AppState;

pub mod cart;
pub mod checkout;
pub mod doc;
pub mod fulfillment;
pub mod health;
pub mod notifications;
pub mod orders;
pub mod params;
pub mod ws;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
        .nest("/checkout", checkout::router())
        .nest("/fulfillment", fulfillment::router())
        .nest("/notifications", notifications::router())
        .nest("/ws", ws::router())
}
