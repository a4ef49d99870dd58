use axum::Json;

use crate::response::ApiResponse;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = ApiResponse<serde_json::Value>)
    ),
    tag = "Health"
)]
pub async fn health_check() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(
        "OK",
        serde_json::json!({ "status": "healthy" }),
        None,
    ))
}
