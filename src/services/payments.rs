use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{
    entities::{payment, OrderStatus, PaymentStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    payment_provider::{CheckoutOrderRequest, PaymentProviderClient},
    repositories::{OrderStore, PaymentStore},
};

fn validate_positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    if *value > Decimal::ZERO {
        Ok(())
    } else {
        let mut err = ValidationError::new("range");
        err.message = Some("amount must be greater than 0".into());
        Err(err)
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePaymentRequest {
    pub order_id: i64,

    #[validate(custom = "validate_positive_amount")]
    pub amount: Decimal,

    #[validate(length(min = 1, message = "payment method is required"))]
    pub payment_method: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct WebhookPaymentRequest {
    pub order_id: i64,

    /// Provider-reported status; must be one of the terminal outcomes.
    #[validate(length(min = 1, message = "status is required"))]
    pub status: String,

    #[validate(length(min = 1, message = "transaction id is required"))]
    pub transaction_id: String,

    /// Amount echoed by the provider, when present only checked against the
    /// stored payment for logging.
    pub amount: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateCheckoutRequest {
    pub order_id: i64,

    #[validate(email(message = "payer email must be valid"))]
    pub payer_email: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    pub id: i64,
    pub order_id: i64,
    pub amount: Decimal,
    pub status: String,
    pub payment_method: String,
    pub transaction_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentStatusResponse {
    pub id: i64,
    pub order_id: i64,
    pub status: String,
    pub amount: Decimal,
    pub transaction_id: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutResponse {
    pub order_id: i64,
    pub payment_id: i64,
    /// Hosted payment page (QR code) the client is redirected to.
    pub ticket_url: String,
}

/// Payment reconciliation: idempotent creation, provider webhooks and the
/// approval cascade into the owning order.
#[derive(Clone)]
pub struct PaymentService {
    payments: Arc<dyn PaymentStore>,
    orders: Arc<dyn OrderStore>,
    provider: Option<Arc<dyn PaymentProviderClient>>,
    event_sender: Option<Arc<EventSender>>,
}

impl PaymentService {
    pub fn new(
        payments: Arc<dyn PaymentStore>,
        orders: Arc<dyn OrderStore>,
        provider: Option<Arc<dyn PaymentProviderClient>>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            payments,
            orders,
            provider,
            event_sender,
        }
    }

    /// Creates a payment for an order, or returns the existing one.
    ///
    /// Duplicate checkout calls (client retries) must not create a second
    /// payment row. The unique index on `payments.order_id` closes the
    /// remaining race window: when a concurrent insert wins, the loser
    /// re-reads and returns the winner.
    #[instrument(skip(self, request), fields(order_id = request.order_id))]
    pub async fn create_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<PaymentResponse, ServiceError> {
        request.validate()?;

        self.orders
            .get_by_id(request.order_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("order with id {} not found", request.order_id))
            })?;

        if let Some(existing) = self.payments.get_by_order_id(request.order_id).await? {
            info!(
                payment_id = existing.id,
                order_id = request.order_id,
                "returning existing payment for order"
            );
            return Ok(Self::to_response(existing));
        }

        let now = Utc::now();
        let payment = payment::Model {
            id: 0,
            order_id: request.order_id,
            amount: request.amount,
            status: PaymentStatus::Pending.to_string(),
            payment_method: request.payment_method.clone(),
            transaction_id: String::new(),
            created_at: now,
            updated_at: now,
        };

        let created = match self.payments.create(payment).await {
            Ok(created) => created,
            Err(create_err) => {
                // Lost a concurrent race on the unique order_id index.
                if let Ok(Some(winner)) = self.payments.get_by_order_id(request.order_id).await {
                    info!(
                        payment_id = winner.id,
                        order_id = request.order_id,
                        "concurrent checkout already created the payment"
                    );
                    return Ok(Self::to_response(winner));
                }
                return Err(create_err);
            }
        };

        info!(payment_id = created.id, order_id = created.order_id, "payment created");
        self.emit(Event::PaymentCreated(created.id)).await;

        Ok(Self::to_response(created))
    }

    #[instrument(skip(self))]
    pub async fn get_payment_status(
        &self,
        order_id: i64,
    ) -> Result<PaymentStatusResponse, ServiceError> {
        let payment = self
            .payments
            .get_by_order_id(order_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("payment not found for order {}", order_id))
            })?;

        Ok(PaymentStatusResponse {
            id: payment.id,
            order_id: payment.order_id,
            status: payment.status,
            amount: payment.amount,
            transaction_id: payment.transaction_id,
            updated_at: payment.updated_at,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_payment_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<PaymentResponse, ServiceError> {
        let payment = self
            .payments
            .get_by_transaction_id(transaction_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "payment with transaction id {} not found",
                    transaction_id
                ))
            })?;
        Ok(Self::to_response(payment))
    }

    /// Applies an asynchronous status callback from the payment provider.
    ///
    /// Safe under webhook re-delivery: an already-applied callback
    /// short-circuits, and the approval cascade only ever moves a `received`
    /// order forward, so retries after a partial failure converge.
    #[instrument(skip(self, request), fields(order_id = request.order_id, status = %request.status))]
    pub async fn process_webhook(
        &self,
        request: WebhookPaymentRequest,
    ) -> Result<(), ServiceError> {
        request.validate()?;

        let payment = self
            .payments
            .get_by_order_id(request.order_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "payment not found for order {}",
                    request.order_id
                ))
            })?;

        let new_status = PaymentStatus::from_str(request.status.trim())
            .ok()
            .filter(|s| s.is_terminal())
            .ok_or_else(|| {
                ServiceError::InvalidStatus(format!(
                    "invalid payment status received: {}",
                    request.status
                ))
            })?;

        if let Some(amount) = request.amount {
            if amount != payment.amount {
                warn!(
                    payment_id = payment.id,
                    stored = %payment.amount,
                    reported = %amount,
                    "provider-reported amount differs from stored payment"
                );
            }
        }

        let already_applied = payment.status == new_status.to_string()
            && payment.transaction_id == request.transaction_id;

        let payment = if already_applied {
            debug!(payment_id = payment.id, "webhook already applied; skipping payment update");
            payment
        } else {
            let mut updated = payment;
            updated.status = new_status.to_string();
            updated.transaction_id = request.transaction_id.clone();
            updated.updated_at = Utc::now();
            let updated = self.payments.update(updated).await.map_err(|e| {
                ServiceError::InternalError(format!("failed to update payment: {}", e))
            })?;

            info!(
                payment_id = updated.id,
                order_id = updated.order_id,
                status = %updated.status,
                "payment status updated from webhook"
            );
            self.emit(Event::PaymentStatusChanged {
                payment_id: updated.id,
                order_id: updated.order_id,
                new_status: updated.status.clone(),
            })
            .await;
            updated
        };

        if new_status.is_approved() {
            self.cascade_approval(payment.order_id).await?;
        }

        Ok(())
    }

    /// An approved payment releases the order to the kitchen. Only a
    /// `received` order moves; anything further along stays where it is, so
    /// re-applying the cascade is harmless.
    async fn cascade_approval(&self, order_id: i64) -> Result<(), ServiceError> {
        let order = self.orders.get_by_id(order_id).await.map_err(|e| {
            ServiceError::InternalError(format!(
                "failed to get order for status update: {}",
                e
            ))
        })?;

        let Some(order) = order else {
            warn!(order_id, "approved payment references a missing order");
            return Ok(());
        };

        if OrderStatus::from_str(&order.status) != Ok(OrderStatus::Received) {
            debug!(order_id, status = %order.status, "order already progressed; skipping cascade");
            return Ok(());
        }

        let old_status = order.status.clone();
        let mut updated = order;
        updated.status = OrderStatus::InProgress.to_string();
        updated.updated_at = Utc::now();
        let updated = self.orders.update(updated).await.map_err(|e| {
            ServiceError::InternalError(format!(
                "failed to update order status after payment approval: {}",
                e
            ))
        })?;

        info!(order_id, %old_status, new_status = %updated.status, "order released to kitchen");
        self.emit(Event::OrderStatusChanged {
            order_id,
            old_status,
            new_status: updated.status,
        })
        .await;
        Ok(())
    }

    /// Initiates a hosted checkout with the payment provider.
    ///
    /// Ensures a local pending payment exists for the order (reusing the
    /// idempotent creation), then exchanges the order total for the
    /// provider's payment page URL.
    #[instrument(skip(self, request), fields(order_id = request.order_id))]
    pub async fn create_checkout(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutResponse, ServiceError> {
        request.validate()?;

        let provider = self.provider.clone().ok_or_else(|| {
            ServiceError::ExternalServiceError("payment provider is not configured".to_string())
        })?;

        self.orders
            .get_by_id(request.order_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("order with id {} not found", request.order_id))
            })?;

        let items = self.orders.items_for_order(request.order_id).await?;
        let total: Decimal = items.iter().map(|item| item.subtotal()).sum();
        if total <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "order {} has no payable total",
                request.order_id
            )));
        }

        let payment = self
            .create_payment(CreatePaymentRequest {
                order_id: request.order_id,
                amount: total,
                payment_method: "pix".to_string(),
            })
            .await?;

        let checkout = provider
            .create_checkout_order(CheckoutOrderRequest::pix(
                request.order_id.to_string(),
                total.to_string(),
                request.payer_email.clone(),
            ))
            .await?;

        let ticket_url = checkout.ticket_url().ok_or_else(|| {
            ServiceError::ExternalServiceError(
                "payment provider returned no transactions".to_string(),
            )
        })?;

        info!(order_id = request.order_id, payment_id = payment.id, "checkout created");

        Ok(CheckoutResponse {
            order_id: request.order_id,
            payment_id: payment.id,
            ticket_url: ticket_url.to_string(),
        })
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(err) = sender.send(event).await {
                warn!(error = %err, "failed to send event");
            }
        }
    }

    fn to_response(payment: payment::Model) -> PaymentResponse {
        PaymentResponse {
            id: payment.id,
            order_id: payment.order_id,
            amount: payment.amount,
            status: payment.status,
            payment_method: payment.payment_method,
            transaction_id: payment.transaction_id,
            created_at: payment.created_at,
            updated_at: payment.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{order, order_item};
    use crate::payment_provider::CheckoutOrderResponse;
    use crate::repositories::{InMemoryOrderStore, InMemoryPaymentStore};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use serde_json::json;

    enum ProviderBehavior {
        TicketUrl(&'static str),
        NoTransactions,
        Unavailable,
    }

    struct FakeProvider {
        behavior: ProviderBehavior,
    }

    #[async_trait]
    impl PaymentProviderClient for FakeProvider {
        async fn create_checkout_order(
            &self,
            _request: CheckoutOrderRequest,
        ) -> Result<CheckoutOrderResponse, ServiceError> {
            match self.behavior {
                ProviderBehavior::TicketUrl(url) => Ok(serde_json::from_value(json!({
                    "id": "ORD-1",
                    "transactions": {"payments": [{"payment_method": {"id": "pix", "ticket_url": url}}]}
                }))
                .unwrap()),
                ProviderBehavior::NoTransactions => {
                    Ok(serde_json::from_value(json!({"id": "ORD-2"})).unwrap())
                }
                ProviderBehavior::Unavailable => Err(ServiceError::ExternalServiceError(
                    "provider down".to_string(),
                )),
            }
        }
    }

    struct Fixture {
        service: PaymentService,
        orders: Arc<InMemoryOrderStore>,
        payments: Arc<InMemoryPaymentStore>,
    }

    fn fixture_with_provider(provider: Option<Arc<dyn PaymentProviderClient>>) -> Fixture {
        let orders = Arc::new(InMemoryOrderStore::new());
        let payments = Arc::new(InMemoryPaymentStore::new());
        let service = PaymentService::new(payments.clone(), orders.clone(), provider, None);
        Fixture {
            service,
            orders,
            payments,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_provider(None)
    }

    async fn seed_order(f: &Fixture, unit_price: Decimal, quantity: i32) -> i64 {
        let now = Utc::now();
        let order = order::Model {
            id: 0,
            customer_id: 0,
            cpf: "12345678901".to_string(),
            status: OrderStatus::Received.to_string(),
            created_at: now,
            updated_at: now,
        };
        let item = order_item::Model {
            id: 0,
            order_id: 0,
            product_id: 1,
            quantity,
            price: unit_price,
            created_at: now,
            updated_at: now,
        };
        let (order, _) = f.orders.create(order, vec![item]).await.unwrap();
        order.id
    }

    fn payment_request(order_id: i64, amount: Decimal) -> CreatePaymentRequest {
        CreatePaymentRequest {
            order_id,
            amount,
            payment_method: "pix".to_string(),
        }
    }

    fn webhook(order_id: i64, status: &str, transaction_id: &str) -> WebhookPaymentRequest {
        WebhookPaymentRequest {
            order_id,
            status: status.to_string(),
            transaction_id: transaction_id.to_string(),
            amount: None,
        }
    }

    #[tokio::test]
    async fn create_payment_requires_existing_order() {
        let f = fixture();
        let err = f
            .service
            .create_payment(payment_request(77, dec!(10.00)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert_eq!(f.payments.payment_count(), 0);
    }

    #[tokio::test]
    async fn create_payment_starts_pending_without_transaction_id() {
        let f = fixture();
        let order_id = seed_order(&f, dec!(25.50), 1).await;

        let payment = f
            .service
            .create_payment(payment_request(order_id, dec!(25.50)))
            .await
            .unwrap();

        assert_eq!(payment.status, "pending");
        assert_eq!(payment.amount, dec!(25.50));
        assert_eq!(payment.payment_method, "pix");
        assert!(payment.transaction_id.is_empty());
    }

    #[tokio::test]
    async fn create_payment_is_idempotent_per_order() {
        let f = fixture();
        let order_id = seed_order(&f, dec!(25.50), 1).await;

        let first = f
            .service
            .create_payment(payment_request(order_id, dec!(25.50)))
            .await
            .unwrap();
        let second = f
            .service
            .create_payment(payment_request(order_id, dec!(25.50)))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(f.payments.payment_count(), 1);
    }

    #[tokio::test]
    async fn create_payment_rejects_non_positive_amount() {
        let f = fixture();
        let order_id = seed_order(&f, dec!(25.50), 1).await;

        let err = f
            .service
            .create_payment(payment_request(order_id, dec!(0)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn payment_status_for_unknown_order_is_not_found() {
        let f = fixture();
        let err = f.service.get_payment_status(5).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn approved_webhook_updates_payment_and_releases_order() {
        let f = fixture();
        let order_id = seed_order(&f, dec!(25.50), 1).await;
        f.service
            .create_payment(payment_request(order_id, dec!(25.50)))
            .await
            .unwrap();

        f.service
            .process_webhook(webhook(order_id, "approved", "tx-001"))
            .await
            .unwrap();

        let status = f.service.get_payment_status(order_id).await.unwrap();
        assert_eq!(status.status, "approved");
        assert_eq!(status.transaction_id, "tx-001");

        let order = f.orders.get_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, "in_progress");
    }

    #[tokio::test]
    async fn rejected_webhook_leaves_order_untouched() {
        let f = fixture();
        let order_id = seed_order(&f, dec!(25.50), 1).await;
        f.service
            .create_payment(payment_request(order_id, dec!(25.50)))
            .await
            .unwrap();

        f.service
            .process_webhook(webhook(order_id, "rejected", "tx-002"))
            .await
            .unwrap();

        let status = f.service.get_payment_status(order_id).await.unwrap();
        assert_eq!(status.status, "rejected");

        let order = f.orders.get_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, "received");
    }

    #[tokio::test]
    async fn webhook_rejects_unrecognized_and_non_terminal_statuses() {
        let f = fixture();
        let order_id = seed_order(&f, dec!(25.50), 1).await;
        f.service
            .create_payment(payment_request(order_id, dec!(25.50)))
            .await
            .unwrap();

        for bogus in ["foo", "pending"] {
            let err = f
                .service
                .process_webhook(webhook(order_id, bogus, "tx-003"))
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::InvalidStatus(_)));
        }

        let status = f.service.get_payment_status(order_id).await.unwrap();
        assert_eq!(status.status, "pending");
        assert!(status.transaction_id.is_empty());
    }

    #[tokio::test]
    async fn webhook_without_payment_is_not_found() {
        let f = fixture();
        let order_id = seed_order(&f, dec!(25.50), 1).await;

        let err = f
            .service
            .process_webhook(webhook(order_id, "approved", "tx-004"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn webhook_redelivery_is_a_noop() {
        let f = fixture();
        let order_id = seed_order(&f, dec!(25.50), 1).await;
        f.service
            .create_payment(payment_request(order_id, dec!(25.50)))
            .await
            .unwrap();

        f.service
            .process_webhook(webhook(order_id, "approved", "tx-005"))
            .await
            .unwrap();
        let first = f.service.get_payment_status(order_id).await.unwrap();

        f.service
            .process_webhook(webhook(order_id, "approved", "tx-005"))
            .await
            .unwrap();
        let second = f.service.get_payment_status(order_id).await.unwrap();

        assert_eq!(first.updated_at, second.updated_at);
        let order = f.orders.get_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, "in_progress");
    }

    #[tokio::test]
    async fn cascade_never_regresses_a_progressed_order() {
        let f = fixture();
        let order_id = seed_order(&f, dec!(25.50), 1).await;
        f.service
            .create_payment(payment_request(order_id, dec!(25.50)))
            .await
            .unwrap();
        f.service
            .process_webhook(webhook(order_id, "approved", "tx-006"))
            .await
            .unwrap();

        // Kitchen moves on before the provider re-delivers.
        let mut order = f.orders.get_by_id(order_id).await.unwrap().unwrap();
        order.status = OrderStatus::Ready.to_string();
        f.orders.update(order).await.unwrap();

        f.service
            .process_webhook(webhook(order_id, "approved", "tx-006"))
            .await
            .unwrap();

        let order = f.orders.get_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, "ready");
    }

    #[tokio::test]
    async fn checkout_returns_hosted_payment_url() {
        let f = fixture_with_provider(Some(Arc::new(FakeProvider {
            behavior: ProviderBehavior::TicketUrl("https://pay.example/qr/42"),
        })));
        let order_id = seed_order(&f, dec!(10.00), 2).await;

        let checkout = f
            .service
            .create_checkout(CreateCheckoutRequest {
                order_id,
                payer_email: "customer@example.com".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(checkout.ticket_url, "https://pay.example/qr/42");

        let status = f.service.get_payment_status(order_id).await.unwrap();
        assert_eq!(status.status, "pending");
        assert_eq!(status.amount, dec!(20.00));
    }

    #[tokio::test]
    async fn checkout_fails_when_provider_returns_no_transactions() {
        let f = fixture_with_provider(Some(Arc::new(FakeProvider {
            behavior: ProviderBehavior::NoTransactions,
        })));
        let order_id = seed_order(&f, dec!(10.00), 1).await;

        let err = f
            .service
            .create_checkout(CreateCheckoutRequest {
                order_id,
                payer_email: "customer@example.com".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ExternalServiceError(_)));
    }

    #[tokio::test]
    async fn checkout_surfaces_provider_outage() {
        let f = fixture_with_provider(Some(Arc::new(FakeProvider {
            behavior: ProviderBehavior::Unavailable,
        })));
        let order_id = seed_order(&f, dec!(10.00), 1).await;

        let err = f
            .service
            .create_checkout(CreateCheckoutRequest {
                order_id,
                payer_email: "customer@example.com".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ExternalServiceError(_)));
    }

    #[tokio::test]
    async fn checkout_requires_a_configured_provider() {
        let f = fixture();
        let order_id = seed_order(&f, dec!(10.00), 1).await;

        let err = f
            .service
            .create_checkout(CreateCheckoutRequest {
                order_id,
                payer_email: "customer@example.com".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ExternalServiceError(_)));
    }
}
