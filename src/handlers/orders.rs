use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};

use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::orders::{
    CreateOrderRequest, OrderItemResponse, OrderResponse, UpdateOrderItemRequest,
    UpdateOrderStatusRequest,
};
use crate::ApiResponse;

/// Create a new order
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = crate::ApiResponse<OrderResponse>),
        (status = 400, description = "Invalid order data", body = crate::errors::ErrorResponse),
        (status = 404, description = "Referenced product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), ServiceError> {
    let response = state.services.orders.create_order(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

/// List all orders
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    responses(
        (status = 200, description = "All orders", body = crate::ApiResponse<Vec<OrderResponse>>)
    ),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, ServiceError> {
    let response = state.services.orders.list_orders().await?;
    Ok(Json(ApiResponse::success(response)))
}

/// The kitchen queue: in-flight orders, prioritized
#[utoipa::path(
    get,
    path = "/api/v1/orders/kitchen",
    responses(
        (status = 200, description = "Prioritized in-flight orders", body = crate::ApiResponse<Vec<OrderResponse>>)
    ),
    tag = "Orders"
)]
pub async fn kitchen_queue(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, ServiceError> {
    let response = state.services.orders.kitchen_queue().await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Get an order by id
#[utoipa::path(
    get,
    path = "/api/v1/orders/:id",
    params(("id" = i64, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order details", body = crate::ApiResponse<OrderResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let response = state.services.orders.get_order(id).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// List orders by customer CPF
#[utoipa::path(
    get,
    path = "/api/v1/orders/cpf/:cpf",
    params(("cpf" = String, Path, description = "Customer CPF")),
    responses(
        (status = 200, description = "Orders for the CPF", body = crate::ApiResponse<Vec<OrderResponse>>)
    ),
    tag = "Orders"
)]
pub async fn orders_by_cpf(
    State(state): State<AppState>,
    Path(cpf): Path<String>,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, ServiceError> {
    let response = state.services.orders.orders_by_cpf(&cpf).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// List orders by customer id
#[utoipa::path(
    get,
    path = "/api/v1/orders/customer/:customer_id",
    params(("customer_id" = i64, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Orders for the customer", body = crate::ApiResponse<Vec<OrderResponse>>)
    ),
    tag = "Orders"
)]
pub async fn orders_by_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, ServiceError> {
    let response = state.services.orders.orders_by_customer(customer_id).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Update an order's status
#[utoipa::path(
    put,
    path = "/api/v1/orders/:id/status",
    params(("id" = i64, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order updated", body = crate::ApiResponse<OrderResponse>),
        (status = 400, description = "Unknown status or illegal transition", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let response = state.services.orders.update_status(id, request).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Correct the quantity of a line item
#[utoipa::path(
    put,
    path = "/api/v1/orders/:id/items/:item_id",
    params(
        ("id" = i64, Path, description = "Order ID"),
        ("item_id" = i64, Path, description = "Order item ID")
    ),
    request_body = UpdateOrderItemRequest,
    responses(
        (status = 200, description = "Item updated", body = crate::ApiResponse<OrderItemResponse>),
        (status = 400, description = "Invalid quantity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn update_order_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(i64, i64)>,
    Json(request): Json<UpdateOrderItemRequest>,
) -> Result<Json<ApiResponse<OrderItemResponse>>, ServiceError> {
    let response = state
        .services
        .orders
        .update_item_quantity(id, item_id, request)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Delete an order together with its items and payment
#[utoipa::path(
    delete,
    path = "/api/v1/orders/:id",
    params(("id" = i64, Path, description = "Order ID")),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServiceError> {
    state.services.orders.delete_order(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Order routes
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/kitchen", get(kitchen_queue))
        .route("/cpf/:cpf", get(orders_by_cpf))
        .route("/customer/:customer_id", get(orders_by_customer))
        .route("/:id", get(get_order).delete(delete_order))
        .route("/:id/status", put(update_order_status))
        .route("/:id/items/:item_id", put(update_order_item))
}
