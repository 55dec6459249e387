use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};

use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::customers::{CreateCustomerRequest, CustomerResponse};
use crate::ApiResponse;

/// Register a customer
#[utoipa::path(
    post,
    path = "/api/v1/customers",
    request_body = CreateCustomerRequest,
    responses(
        (status = 201, description = "Customer created", body = crate::ApiResponse<CustomerResponse>),
        (status = 400, description = "Invalid customer data", body = crate::errors::ErrorResponse),
        (status = 409, description = "CPF already registered", body = crate::errors::ErrorResponse)
    ),
    tag = "Customers"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    Json(request): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CustomerResponse>>), ServiceError> {
    let response = state.services.customers.create_customer(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

/// Get a customer by id
#[utoipa::path(
    get,
    path = "/api/v1/customers/:id",
    params(("id" = i64, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Customer details", body = crate::ApiResponse<CustomerResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Customers"
)]
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<CustomerResponse>>, ServiceError> {
    let response = state.services.customers.get_customer(id).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Find a customer by CPF
#[utoipa::path(
    get,
    path = "/api/v1/customers/cpf/:cpf",
    params(("cpf" = String, Path, description = "Customer CPF")),
    responses(
        (status = 200, description = "Customer details", body = crate::ApiResponse<CustomerResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Customers"
)]
pub async fn get_customer_by_cpf(
    State(state): State<AppState>,
    Path(cpf): Path<String>,
) -> Result<Json<ApiResponse<CustomerResponse>>, ServiceError> {
    let response = state.services.customers.get_customer_by_cpf(&cpf).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Customer routes
pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_customer))
        .route("/cpf/:cpf", get(get_customer_by_cpf))
        .route("/:id", get(get_customer))
}
