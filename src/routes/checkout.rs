use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};

use crate::{
    dto::{checkout::CompleteCheckoutRequest, orders::OrderWithItems},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/complete", post(complete_checkout))
}

#[utoipa::path(
    post,
    path = "/api/checkout/complete",
    request_body = CompleteCheckoutRequest,
    responses(
        (status = 201, description = "Cart converted into an order", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Empty cart"),
        (status = 409, description = "Insufficient stock"),
        (status = 422, description = "Payment validation failed"),
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn complete_checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CompleteCheckoutRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<OrderWithItems>>)> {
    let resp = order_service::checkout(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}
