use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};

use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::products::{ProductRequest, ProductResponse};
use crate::ApiResponse;

/// Create a product
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = ProductRequest,
    responses(
        (status = 201, description = "Product created", body = crate::ApiResponse<ProductResponse>),
        (status = 400, description = "Invalid product data", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<ProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductResponse>>), ServiceError> {
    let response = state.services.products.create_product(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

/// List all products
#[utoipa::path(
    get,
    path = "/api/v1/products",
    responses(
        (status = 200, description = "All products", body = crate::ApiResponse<Vec<ProductResponse>>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ProductResponse>>>, ServiceError> {
    let response = state.services.products.list_products().await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Get a product by id
#[utoipa::path(
    get,
    path = "/api/v1/products/:id",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product details", body = crate::ApiResponse<ProductResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ProductResponse>>, ServiceError> {
    let response = state.services.products.get_product(id).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// List products in a category
#[utoipa::path(
    get,
    path = "/api/v1/products/category/:category",
    params(("category" = String, Path, description = "Product category")),
    responses(
        (status = 200, description = "Products in the category", body = crate::ApiResponse<Vec<ProductResponse>>),
        (status = 400, description = "Unknown category", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn products_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<ApiResponse<Vec<ProductResponse>>>, ServiceError> {
    let response = state.services.products.products_by_category(&category).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Update a product
#[utoipa::path(
    put,
    path = "/api/v1/products/:id",
    params(("id" = i64, Path, description = "Product ID")),
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Product updated", body = crate::ApiResponse<ProductResponse>),
        (status = 400, description = "Invalid product data", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<ProductRequest>,
) -> Result<Json<ApiResponse<ProductResponse>>, ServiceError> {
    let response = state.services.products.update_product(id, request).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Delete a product
#[utoipa::path(
    delete,
    path = "/api/v1/products/:id",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServiceError> {
    state.services.products.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Product routes
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route("/category/:category", get(products_by_category))
        .route("/:id", get(get_product).put(update_product).delete(delete_product))
}
