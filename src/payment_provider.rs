//! Hosted-checkout client for the payment provider.
//!
//! The provider exposes an order resource: we create one with a single pix
//! payment and hand the returned ticket URL (QR code page) to the client.
//! Confirmation arrives later through the webhook.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::errors::ServiceError;

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutOrderRequest {
    #[serde(rename = "type")]
    pub order_type: String,
    pub total_amount: String,
    pub external_reference: String,
    pub transactions: TransactionsRequest,
    pub payer: PayerRequest,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionsRequest {
    pub payments: Vec<PaymentRequest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentRequest {
    pub amount: String,
    pub payment_method: PaymentMethodRequest,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentMethodRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub method_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayerRequest {
    pub email: String,
}

impl CheckoutOrderRequest {
    /// A provider order holding one pix bank-transfer payment.
    pub fn pix(external_reference: String, amount: String, payer_email: String) -> Self {
        Self {
            order_type: "online".to_string(),
            total_amount: amount.clone(),
            external_reference,
            transactions: TransactionsRequest {
                payments: vec![PaymentRequest {
                    amount,
                    payment_method: PaymentMethodRequest {
                        id: "pix".to_string(),
                        method_type: "bank_transfer".to_string(),
                    },
                }],
            },
            payer: PayerRequest { email: payer_email },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutOrderResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub transactions: Option<TransactionsResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionsResponse {
    #[serde(default)]
    pub payments: Vec<PaymentResponseItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentResponseItem {
    #[serde(default)]
    pub payment_method: Option<PaymentMethodResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentMethodResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub ticket_url: Option<String>,
}

impl CheckoutOrderResponse {
    /// Redirect/QR-code URL of the first returned transaction.
    pub fn ticket_url(&self) -> Option<&str> {
        self.transactions
            .as_ref()?
            .payments
            .first()?
            .payment_method
            .as_ref()?
            .ticket_url
            .as_deref()
    }
}

#[async_trait]
pub trait PaymentProviderClient: Send + Sync {
    async fn create_checkout_order(
        &self,
        request: CheckoutOrderRequest,
    ) -> Result<CheckoutOrderResponse, ServiceError>;
}

/// HTTP client for a MercadoPago-style orders API.
pub struct MercadoPagoClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl MercadoPagoClient {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }
}

#[async_trait]
impl PaymentProviderClient for MercadoPagoClient {
    async fn create_checkout_order(
        &self,
        request: CheckoutOrderRequest,
    ) -> Result<CheckoutOrderResponse, ServiceError> {
        let url = format!("{}/v1/orders", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .header("X-Idempotency-Key", &request.external_reference)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "payment provider request failed");
                ServiceError::ExternalServiceError(format!("payment provider unreachable: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, %body, "payment provider rejected checkout order");
            return Err(ServiceError::ExternalServiceError(format!(
                "payment provider returned {}",
                status
            )));
        }

        response.json::<CheckoutOrderResponse>().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!(
                "malformed payment provider response: {}",
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn ticket_url_comes_from_first_transaction() {
        let response: CheckoutOrderResponse = serde_json::from_value(json!({
            "id": "ORD01",
            "transactions": {
                "payments": [
                    {"payment_method": {"id": "pix", "ticket_url": "https://pay.example/qr/1"}},
                    {"payment_method": {"id": "pix", "ticket_url": "https://pay.example/qr/2"}}
                ]
            }
        }))
        .unwrap();

        assert_eq!(response.ticket_url(), Some("https://pay.example/qr/1"));
    }

    #[test]
    fn missing_transactions_yield_no_ticket_url() {
        let response: CheckoutOrderResponse = serde_json::from_value(json!({"id": "ORD02"})).unwrap();
        assert_eq!(response.ticket_url(), None);
    }

    #[tokio::test]
    async fn posts_checkout_order_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .and(header_exists("authorization"))
            .and(header_exists("x-idempotency-key"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "ORD03",
                "transactions": {
                    "payments": [
                        {"payment_method": {"id": "pix", "ticket_url": "https://pay.example/qr/3"}}
                    ]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = MercadoPagoClient::new(server.uri(), "test-token");
        let response = client
            .create_checkout_order(CheckoutOrderRequest::pix(
                "42".to_string(),
                "25.50".to_string(),
                "customer@example.com".to_string(),
            ))
            .await
            .unwrap();

        assert_eq!(response.ticket_url(), Some("https://pay.example/qr/3"));
    }

    #[tokio::test]
    async fn provider_errors_surface_as_external_service_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = MercadoPagoClient::new(server.uri(), "test-token");
        let err = client
            .create_checkout_order(CheckoutOrderRequest::pix(
                "42".to_string(),
                "25.50".to_string(),
                "customer@example.com".to_string(),
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::ExternalServiceError(_)));
    }
}
