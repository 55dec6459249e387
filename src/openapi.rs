use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::errors::ErrorResponse;
use crate::health::HealthResponse;
use crate::services::customers::{CreateCustomerRequest, CustomerResponse};
use crate::services::orders::{
    CreateOrderRequest, OrderItemRequest, OrderItemResponse, OrderResponse,
    UpdateOrderItemRequest, UpdateOrderStatusRequest,
};
use crate::services::payments::{
    CheckoutResponse, CreateCheckoutRequest, CreatePaymentRequest, PaymentResponse,
    PaymentStatusResponse, WebhookPaymentRequest,
};
use crate::services::products::{ProductRequest, ProductResponse};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "fastfood-api",
        description = "Fast-food ordering backend: orders, kitchen workflow and payment reconciliation"
    ),
    paths(
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::kitchen_queue,
        crate::handlers::orders::get_order,
        crate::handlers::orders::orders_by_cpf,
        crate::handlers::orders::orders_by_customer,
        crate::handlers::orders::update_order_status,
        crate::handlers::orders::update_order_item,
        crate::handlers::orders::delete_order,
        crate::handlers::payments::create_payment,
        crate::handlers::payments::get_payment_status,
        crate::handlers::payments::get_payment_by_transaction,
        crate::handlers::payments::create_checkout,
        crate::handlers::payments::payment_webhook,
        crate::handlers::products::create_product,
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::products_by_category,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::customers::create_customer,
        crate::handlers::customers::get_customer,
        crate::handlers::customers::get_customer_by_cpf,
        crate::health::health,
    ),
    components(schemas(
        crate::ApiResponse<serde_json::Value>,
        ErrorResponse,
        HealthResponse,
        CreateOrderRequest,
        OrderItemRequest,
        UpdateOrderStatusRequest,
        UpdateOrderItemRequest,
        OrderItemResponse,
        OrderResponse,
        CreatePaymentRequest,
        WebhookPaymentRequest,
        CreateCheckoutRequest,
        PaymentResponse,
        PaymentStatusResponse,
        CheckoutResponse,
        ProductRequest,
        ProductResponse,
        CreateCustomerRequest,
        CustomerResponse,
    )),
    tags(
        (name = "Orders", description = "Order assembly, kitchen workflow and lifecycle"),
        (name = "Payments", description = "Payment creation, checkout and provider webhooks"),
        (name = "Products", description = "Menu catalog"),
        (name = "Customers", description = "Customer registry"),
        (name = "Health", description = "Service health")
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
