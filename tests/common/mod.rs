#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::ServiceExt;

use fastfood_api::{
    config::AppConfig,
    db::{self, DbConfig},
    events::{self, EventSender},
    handlers::AppServices,
    AppState,
};

/// Test harness: application state and router backed by a fresh in-memory
/// SQLite database with migrations applied.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::new("sqlite::memory:", "127.0.0.1", 18080, "test")).await
    }

    pub async fn with_webhook_secret(secret: &str) -> Self {
        let mut cfg = AppConfig::new("sqlite::memory:", "127.0.0.1", 18080, "test");
        cfg.payment_webhook_secret = Some(secret.to_string());
        Self::with_config(cfg).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let db_cfg = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&db_cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db.clone(), Arc::new(event_sender.clone()), None);
        let state = AppState {
            db,
            config,
            event_sender,
            services,
        };

        let router = Router::new()
            .merge(fastfood_api::health::health_routes())
            .nest("/api/v1", fastfood_api::api_v1_routes())
            .with_state(state.clone());

        Self { router, state }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                builder.body(Body::from(json.to_string())).unwrap()
            }
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response was not JSON")
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, None).await
    }

    /// Seeds a catalog product and returns its id.
    pub async fn seed_product(&self, name: &str, price: &str) -> i64 {
        let (status, body) = self
            .post(
                "/api/v1/products",
                json!({
                    "name": name,
                    "description": "test product",
                    "price": price,
                    "category": "snack",
                    "image_url": ""
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "seeding product failed: {body}");
        body["data"]["id"].as_i64().unwrap()
    }

    /// Creates an order and returns its response payload.
    pub async fn create_order(&self, cpf: &str, items: Value) -> Value {
        let (status, body) = self
            .post("/api/v1/orders", json!({"cpf": cpf, "items": items}))
            .await;
        assert_eq!(status, StatusCode::CREATED, "creating order failed: {body}");
        body["data"].clone()
    }

    /// Walks an order through the given statuses.
    pub async fn drive_status(&self, order_id: i64, statuses: &[&str]) {
        for status in statuses {
            let (code, body) = self
                .put(
                    &format!("/api/v1/orders/{order_id}/status"),
                    json!({"status": status}),
                )
                .await;
            assert_eq!(
                code,
                StatusCode::OK,
                "status update to {status} failed: {body}"
            );
        }
    }
}

/// Parses a Decimal out of a JSON value that may be a string or number.
pub fn decimal(value: &Value) -> rust_decimal::Decimal {
    match value {
        Value::String(s) => s.parse().expect("invalid decimal string"),
        Value::Number(n) => n.to_string().parse().expect("invalid decimal number"),
        other => panic!("expected decimal, got {other:?}"),
    }
}
