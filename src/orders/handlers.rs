// HTTP handlers for order endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AdminUser, AuthenticatedUser};
use crate::orders::models::{CreateOrderRequest, OrderResponse, UpdateOrderItemRequest};
use crate::orders::snapshot::reject_snapshot_fields;
use crate::orders::OrderError;
use crate::AppState;

/// Handler for POST /api/orders
/// Creates a new order for the authenticated user
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created with frozen line prices", body = OrderResponse),
        (status = 400, description = "Invalid request or unknown product"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn create_order_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), OrderError> {
    request.validate()?;

    let order = state.orders.create_order(user.user_id, request).await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// Handler for GET /api/orders/{order_id}
#[utoipa::path(
    get,
    path = "/api/orders/{order_id}",
    params(("order_id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with lines as stored", body = OrderResponse),
        (status = 403, description = "Not the order owner"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn get_order_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, OrderError> {
    let order = state.orders.get_order(order_id, &user).await?;

    Ok(Json(order))
}

/// Handler for PATCH /api/orders/{order_id}/items/{item_id} (Admin only)
/// Corrects a line's quantity; snapshot fields cannot be changed
#[utoipa::path(
    patch,
    path = "/api/orders/{order_id}/items/{item_id}",
    params(
        ("order_id" = Uuid, Path, description = "Order ID"),
        ("item_id" = i32, Path, description = "Order item ID")
    ),
    request_body = UpdateOrderItemRequest,
    responses(
        (status = 200, description = "Line updated", body = OrderResponse),
        (status = 404, description = "Order item not found"),
        (status = 409, description = "Request tried to change a price snapshot")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn update_order_item_handler(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path((order_id, item_id)): Path<(Uuid, i32)>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<OrderResponse>, OrderError> {
    reject_snapshot_fields(&body)?;

    let request: UpdateOrderItemRequest =
        serde_json::from_value(body).map_err(|e| OrderError::ValidationError(e.to_string()))?;
    request.validate()?;

    tracing::debug!("User {} correcting order {} line {}", admin.user_id, order_id, item_id);
    let order = state
        .orders
        .update_item_quantity(order_id, item_id, request.quantity)
        .await?;

    Ok(Json(order))
}
