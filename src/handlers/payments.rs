use axum::{
    body::Bytes,
    extract::{Json, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::payments::{
    CheckoutResponse, CreateCheckoutRequest, CreatePaymentRequest, PaymentResponse,
    PaymentStatusResponse, WebhookPaymentRequest,
};
use crate::ApiResponse;

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_WEBHOOK_TOLERANCE_SECS: u64 = 300;

/// Create (or return the existing) payment for an order
#[utoipa::path(
    post,
    path = "/api/v1/payments",
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Payment for the order (new or pre-existing)", body = crate::ApiResponse<PaymentResponse>),
        (status = 400, description = "Invalid payment data", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn create_payment(
    State(state): State<AppState>,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentResponse>>), ServiceError> {
    let response = state.services.payments.create_payment(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

/// Get the payment status for an order
#[utoipa::path(
    get,
    path = "/api/v1/payments/status/:order_id",
    params(("order_id" = i64, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Payment status", body = crate::ApiResponse<PaymentStatusResponse>),
        (status = 404, description = "No payment for the order", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn get_payment_status(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<Json<ApiResponse<PaymentStatusResponse>>, ServiceError> {
    let response = state.services.payments.get_payment_status(order_id).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Find a payment by provider transaction id
#[utoipa::path(
    get,
    path = "/api/v1/payments/transaction/:transaction_id",
    params(("transaction_id" = String, Path, description = "Provider transaction ID")),
    responses(
        (status = 200, description = "Payment details", body = crate::ApiResponse<PaymentResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn get_payment_by_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<ApiResponse<PaymentResponse>>, ServiceError> {
    let response = state
        .services
        .payments
        .get_payment_by_transaction_id(&transaction_id)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Start a hosted checkout with the payment provider
#[utoipa::path(
    post,
    path = "/api/v1/payments/checkout",
    request_body = CreateCheckoutRequest,
    responses(
        (status = 201, description = "Hosted payment page created", body = crate::ApiResponse<CheckoutResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment provider failure", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(request): Json<CreateCheckoutRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CheckoutResponse>>), ServiceError> {
    let response = state.services.payments.create_checkout(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

/// Payment provider status callback
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    request_body = WebhookPaymentRequest,
    responses(
        (status = 200, description = "Webhook accepted"),
        (status = 400, description = "Invalid payload or status", body = crate::errors::ErrorResponse),
        (status = 401, description = "Invalid signature", body = crate::errors::ErrorResponse),
        (status = 404, description = "No payment for the order", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    if let Some(secret) = state.config.payment_webhook_secret.clone() {
        let tolerance = state
            .config
            .payment_webhook_tolerance_secs
            .unwrap_or(DEFAULT_WEBHOOK_TOLERANCE_SECS);
        if !verify_signature(&headers, &body, &secret, tolerance) {
            warn!("payment webhook signature verification failed");
            return Err(ServiceError::Unauthorized(
                "invalid webhook signature".to_string(),
            ));
        }
    }

    let request: WebhookPaymentRequest = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::BadRequest(format!("invalid webhook payload: {}", e)))?;

    state.services.payments.process_webhook(request).await?;
    Ok(StatusCode::OK)
}

/// HMAC-SHA256 over `{timestamp}.{body}` with `x-timestamp`/`x-signature`
/// headers; the timestamp must be within the configured tolerance.
fn verify_signature(headers: &HeaderMap, payload: &Bytes, secret: &str, tolerance_secs: u64) -> bool {
    let (Some(ts), Some(sig)) = (headers.get("x-timestamp"), headers.get("x-signature")) else {
        return false;
    };
    let (Ok(ts), Ok(sig)) = (ts.to_str(), sig.to_str()) else {
        return false;
    };

    if let Ok(ts_i) = ts.parse::<i64>() {
        let now = chrono::Utc::now().timestamp();
        if (now - ts_i).unsigned_abs() > tolerance_secs {
            return false;
        }
    } else {
        return false;
    }

    let signed = format!("{}.{}", ts, std::str::from_utf8(payload).unwrap_or(""));
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(signed.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());
    constant_time_eq(&expected, sig)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

/// Payment routes
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_payment))
        .route("/status/:order_id", get(get_payment_status))
        .route("/transaction/:transaction_id", get(get_payment_by_transaction))
        .route("/checkout", post(create_checkout))
        .route("/webhook", post(payment_webhook))
}
