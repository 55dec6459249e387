mod common;

use axum::http::StatusCode;
use common::{decimal, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn order_total_is_the_sum_of_snapshot_priced_items() {
    let app = TestApp::new().await;
    let burger = app.seed_product("burger", "10.00").await;
    let soda = app.seed_product("soda", "5.50").await;

    let order = app
        .create_order(
            "12345678901",
            json!([
                {"product_id": burger, "quantity": 2},
                {"product_id": soda, "quantity": 1}
            ]),
        )
        .await;

    assert_eq!(order["status"], "received");
    assert_eq!(order["items"].as_array().unwrap().len(), 2);
    assert_eq!(decimal(&order["total"]), dec!(25.50));
}

#[tokio::test]
async fn persisted_orders_reload_with_identical_items_and_prices() {
    let app = TestApp::new().await;
    let burger = app.seed_product("burger", "10.00").await;
    let soda = app.seed_product("soda", "5.50").await;

    let created = app
        .create_order(
            "12345678901",
            json!([
                {"product_id": burger, "quantity": 2},
                {"product_id": soda, "quantity": 1}
            ]),
        )
        .await;
    let order_id = created["id"].as_i64().unwrap();

    let (status, body) = app.get(&format!("/api/v1/orders/{order_id}")).await;
    assert_eq!(status, StatusCode::OK);
    let reloaded = &body["data"];

    let created_items = created["items"].as_array().unwrap();
    let reloaded_items = reloaded["items"].as_array().unwrap();
    assert_eq!(created_items.len(), reloaded_items.len());
    for (a, b) in created_items.iter().zip(reloaded_items) {
        assert_eq!(a["quantity"], b["quantity"]);
        assert_eq!(decimal(&a["price"]), decimal(&b["price"]));
        assert_eq!(decimal(&a["subtotal"]), decimal(&b["subtotal"]));
    }
    assert_eq!(decimal(&reloaded["total"]), dec!(25.50));
}

#[tokio::test]
async fn unknown_product_aborts_creation_without_persisting() {
    let app = TestApp::new().await;

    let (status, _) = app
        .post(
            "/api/v1/orders",
            json!({"cpf": "12345678901", "items": [{"product_id": 999, "quantity": 1}]}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get("/api/v1/orders").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn order_without_items_is_rejected() {
    let app = TestApp::new().await;

    let (status, _) = app
        .post("/api/v1/orders", json!({"cpf": "12345678901", "items": []}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn order_without_cpf_is_rejected() {
    let app = TestApp::new().await;
    let burger = app.seed_product("burger", "10.00").await;

    let (status, _) = app
        .post(
            "/api/v1/orders",
            json!({"cpf": "", "items": [{"product_id": burger, "quantity": 1}]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_progresses_through_the_kitchen_chain() {
    let app = TestApp::new().await;
    let burger = app.seed_product("burger", "10.00").await;
    let order = app
        .create_order("12345678901", json!([{"product_id": burger, "quantity": 1}]))
        .await;
    let order_id = order["id"].as_i64().unwrap();

    app.drive_status(order_id, &["in_progress", "ready", "completed"])
        .await;

    let (status, body) = app.get(&format!("/api/v1/orders/{order_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");
}

#[tokio::test]
async fn bogus_status_is_rejected_and_order_unchanged() {
    let app = TestApp::new().await;
    let burger = app.seed_product("burger", "10.00").await;
    let order = app
        .create_order("12345678901", json!([{"product_id": burger, "quantity": 1}]))
        .await;
    let order_id = order["id"].as_i64().unwrap();

    let (status, _) = app
        .put(
            &format!("/api/v1/orders/{order_id}/status"),
            json!({"status": "bogus"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get(&format!("/api/v1/orders/{order_id}")).await;
    assert_eq!(body["data"]["status"], "received");
}

#[tokio::test]
async fn skipping_ahead_in_the_chain_is_rejected() {
    let app = TestApp::new().await;
    let burger = app.seed_product("burger", "10.00").await;
    let order = app
        .create_order("12345678901", json!([{"product_id": burger, "quantity": 1}]))
        .await;
    let order_id = order["id"].as_i64().unwrap();

    let (status, _) = app
        .put(
            &format!("/api/v1/orders/{order_id}/status"),
            json!({"status": "completed"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn updating_status_of_missing_order_is_not_found() {
    let app = TestApp::new().await;

    let (status, _) = app
        .put("/api/v1/orders/41/status", json!({"status": "in_progress"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn kitchen_queue_prioritizes_nearly_done_orders_and_hides_terminal_ones() {
    let app = TestApp::new().await;
    let burger = app.seed_product("burger", "10.00").await;

    let received = app
        .create_order("12345678901", json!([{"product_id": burger, "quantity": 1}]))
        .await["id"]
        .as_i64()
        .unwrap();
    let in_progress = app
        .create_order("12345678901", json!([{"product_id": burger, "quantity": 1}]))
        .await["id"]
        .as_i64()
        .unwrap();
    let ready = app
        .create_order("12345678901", json!([{"product_id": burger, "quantity": 1}]))
        .await["id"]
        .as_i64()
        .unwrap();
    let completed = app
        .create_order("12345678901", json!([{"product_id": burger, "quantity": 1}]))
        .await["id"]
        .as_i64()
        .unwrap();
    let cancelled = app
        .create_order("12345678901", json!([{"product_id": burger, "quantity": 1}]))
        .await["id"]
        .as_i64()
        .unwrap();

    app.drive_status(in_progress, &["in_progress"]).await;
    app.drive_status(ready, &["in_progress", "ready"]).await;
    app.drive_status(completed, &["in_progress", "ready", "completed"])
        .await;
    app.drive_status(cancelled, &["cancelled"]).await;

    let (status, body) = app.get("/api/v1/orders/kitchen").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].as_i64().unwrap())
        .collect();

    assert_eq!(ids, vec![ready, in_progress, received]);
    for order in body["data"].as_array().unwrap() {
        assert!(!order["items"].as_array().unwrap().is_empty());
    }
}

#[tokio::test]
async fn orders_are_listed_by_cpf_and_customer() {
    let app = TestApp::new().await;
    let burger = app.seed_product("burger", "10.00").await;

    let (status, _) = app
        .post(
            "/api/v1/orders",
            json!({
                "customer_id": 7,
                "cpf": "12345678901",
                "items": [{"product_id": burger, "quantity": 1}]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    app.create_order("98765432100", json!([{"product_id": burger, "quantity": 1}]))
        .await;

    let (_, by_cpf) = app.get("/api/v1/orders/cpf/12345678901").await;
    assert_eq!(by_cpf["data"].as_array().unwrap().len(), 1);
    assert_eq!(by_cpf["data"][0]["cpf"], "12345678901");

    let (_, by_customer) = app.get("/api/v1/orders/customer/7").await;
    assert_eq!(by_customer["data"].as_array().unwrap().len(), 1);
    assert_eq!(by_customer["data"][0]["customer_id"], 7);
}

#[tokio::test]
async fn item_quantity_correction_updates_the_total() {
    let app = TestApp::new().await;
    let burger = app.seed_product("burger", "10.00").await;
    let order = app
        .create_order("12345678901", json!([{"product_id": burger, "quantity": 1}]))
        .await;
    let order_id = order["id"].as_i64().unwrap();
    let item_id = order["items"][0]["id"].as_i64().unwrap();

    let (status, body) = app
        .put(
            &format!("/api/v1/orders/{order_id}/items/{item_id}"),
            json!({"quantity": 3}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["data"]["subtotal"]), dec!(30.00));

    let (_, reloaded) = app.get(&format!("/api/v1/orders/{order_id}")).await;
    assert_eq!(decimal(&reloaded["data"]["total"]), dec!(30.00));
}

#[tokio::test]
async fn deleting_an_order_removes_it_and_its_items() {
    let app = TestApp::new().await;
    let burger = app.seed_product("burger", "10.00").await;
    let order = app
        .create_order("12345678901", json!([{"product_id": burger, "quantity": 1}]))
        .await;
    let order_id = order["id"].as_i64().unwrap();

    let (status, _) = app.delete(&format!("/api/v1/orders/{order_id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&format!("/api/v1/orders/{order_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, kitchen) = app.get("/api/v1/orders/kitchen").await;
    assert!(kitchen["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn guest_orders_with_customer_id_zero_are_accepted() {
    let app = TestApp::new().await;
    let burger = app.seed_product("burger", "10.00").await;

    let order = app
        .create_order("12345678901", json!([{"product_id": burger, "quantity": 1}]))
        .await;
    assert_eq!(order["customer_id"], 0);
}

#[tokio::test]
async fn health_endpoint_reports_database_up() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "up");
}
