use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    entities::{order, order_item, OrderStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    repositories::{OrderStore, PaymentStore, ProductLookup},
};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    /// Zero for guest orders.
    #[serde(default)]
    pub customer_id: i64,

    #[validate(length(min = 1, message = "CPF is required"))]
    pub cpf: String,

    #[validate(length(min = 1, message = "order must contain at least one item"))]
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItemRequest {
    pub product_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderStatusRequest {
    #[validate(length(min = 1, message = "status is required"))]
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderItemRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: i64,
    pub customer_id: i64,
    pub cpf: String,
    pub status: String,
    pub items: Vec<OrderItemResponse>,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order assembly, status progression, kitchen projection and deletion.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    products: Arc<dyn ProductLookup>,
    payments: Arc<dyn PaymentStore>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        products: Arc<dyn ProductLookup>,
        payments: Arc<dyn PaymentStore>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            store,
            products,
            payments,
            event_sender,
        }
    }

    /// Assembles and persists a new order.
    ///
    /// Every line item is resolved against the product catalog before
    /// anything is persisted; the unit price is frozen into the item at this
    /// point. The order and its items are stored in a single transaction.
    #[instrument(skip(self, request), fields(customer_id = request.customer_id))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;

        let now = Utc::now();
        let mut items = Vec::with_capacity(request.items.len());
        for item_request in &request.items {
            let product = match self.products.get_by_id(item_request.product_id).await {
                Ok(Some(product)) => product,
                Ok(None) => {
                    return Err(ServiceError::NotFound(format!(
                        "product with id {} not found",
                        item_request.product_id
                    )))
                }
                Err(err) => {
                    warn!(product_id = item_request.product_id, error = %err, "product lookup failed");
                    return Err(ServiceError::NotFound(format!(
                        "failed to validate product with id {}: {}",
                        item_request.product_id, err
                    )));
                }
            };

            let item = order_item::Model {
                id: 0,
                order_id: 0,
                product_id: item_request.product_id,
                quantity: item_request.quantity,
                price: product.price,
                created_at: now,
                updated_at: now,
            };

            if item.product_id <= 0 || item.quantity <= 0 || item.price <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "invalid order item data for product {}",
                    item_request.product_id
                )));
            }

            items.push(item);
        }

        let order = order::Model {
            id: 0,
            customer_id: request.customer_id,
            cpf: request.cpf.clone(),
            status: OrderStatus::Received.to_string(),
            created_at: now,
            updated_at: now,
        };

        let (order, items) = self.store.create(order, items).await?;

        info!(order_id = order.id, item_count = items.len(), "order created");
        self.emit(Event::OrderCreated(order.id)).await;

        Ok(Self::to_response(order, items))
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, id: i64) -> Result<OrderResponse, ServiceError> {
        let order = self
            .store
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order with id {} not found", id)))?;
        let items = self.store.items_for_order(id).await?;
        Ok(Self::to_response(order, items))
    }

    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<OrderResponse>, ServiceError> {
        let orders = self.store.get_all().await?;
        Ok(self.attach_items(orders).await)
    }

    #[instrument(skip(self))]
    pub async fn orders_by_cpf(&self, cpf: &str) -> Result<Vec<OrderResponse>, ServiceError> {
        let orders = self.store.get_by_cpf(cpf).await?;
        Ok(self.attach_items(orders).await)
    }

    #[instrument(skip(self))]
    pub async fn orders_by_customer(
        &self,
        customer_id: i64,
    ) -> Result<Vec<OrderResponse>, ServiceError> {
        let orders = self.store.get_by_customer_id(customer_id).await?;
        Ok(self.attach_items(orders).await)
    }

    /// The kitchen queue: in-flight orders, those closest to completion
    /// first, oldest first within the same priority band.
    #[instrument(skip(self))]
    pub async fn kitchen_queue(&self) -> Result<Vec<OrderResponse>, ServiceError> {
        let mut orders = self.store.get_pending_for_kitchen().await?;
        orders.sort_by(|a, b| {
            kitchen_rank(a)
                .cmp(&kitchen_rank(b))
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(self.attach_items(orders).await)
    }

    #[instrument(skip(self, request), fields(new_status = %request.status))]
    pub async fn update_status(
        &self,
        id: i64,
        request: UpdateOrderStatusRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;

        let new_status = OrderStatus::from_str(request.status.trim()).map_err(|_| {
            ServiceError::InvalidStatus(format!("unknown order status: {}", request.status))
        })?;

        let order = self
            .store
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order with id {} not found", id)))?;

        let current = OrderStatus::from_str(&order.status).map_err(|_| {
            ServiceError::InternalError(format!(
                "order {} carries unrecognized status {}",
                id, order.status
            ))
        })?;

        if !current.can_transition_to(new_status) {
            return Err(ServiceError::InvalidStatus(format!(
                "cannot transition order from '{}' to '{}'",
                current, new_status
            )));
        }

        let old_status = order.status.clone();
        let mut updated = order;
        updated.status = new_status.to_string();
        updated.updated_at = Utc::now();
        let updated = self.store.update(updated).await?;

        info!(order_id = id, %old_status, new_status = %updated.status, "order status updated");
        self.emit(Event::OrderStatusChanged {
            order_id: id,
            old_status,
            new_status: updated.status.clone(),
        })
        .await;

        let items = self.store.items_for_order(id).await?;
        Ok(Self::to_response(updated, items))
    }

    /// Administrative quantity correction on a single line item.
    #[instrument(skip(self, request))]
    pub async fn update_item_quantity(
        &self,
        order_id: i64,
        item_id: i64,
        request: UpdateOrderItemRequest,
    ) -> Result<OrderItemResponse, ServiceError> {
        if request.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "quantity must be greater than zero".to_string(),
            ));
        }

        let items = self.store.items_for_order(order_id).await?;
        if !items.iter().any(|item| item.id == item_id) {
            return Err(ServiceError::NotFound(format!(
                "order item with id {} not found on order {}",
                item_id, order_id
            )));
        }

        let item = self
            .store
            .update_item_quantity(item_id, request.quantity)
            .await?;
        Ok(Self::item_response(&item))
    }

    /// Removes an order together with its items and any payment attached to
    /// it.
    #[instrument(skip(self))]
    pub async fn delete_order(&self, id: i64) -> Result<(), ServiceError> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order with id {} not found", id)))?;

        if let Some(payment) = self.payments.get_by_order_id(id).await? {
            self.payments.delete(payment.id).await?;
        }
        self.store.delete(id).await?;

        info!(order_id = id, "order deleted");
        self.emit(Event::OrderDeleted(id)).await;
        Ok(())
    }

    /// Attaches items to each order, skipping orders whose items cannot be
    /// fetched instead of failing the whole listing.
    async fn attach_items(&self, orders: Vec<order::Model>) -> Vec<OrderResponse> {
        let mut responses = Vec::with_capacity(orders.len());
        for order in orders {
            match self.store.items_for_order(order.id).await {
                Ok(items) => responses.push(Self::to_response(order, items)),
                Err(err) => {
                    warn!(order_id = order.id, error = %err, "skipping order: items could not be loaded");
                }
            }
        }
        responses
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(err) = sender.send(event).await {
                warn!(error = %err, "failed to send event");
            }
        }
    }

    fn item_response(item: &order_item::Model) -> OrderItemResponse {
        OrderItemResponse {
            id: item.id,
            product_id: item.product_id,
            quantity: item.quantity,
            price: item.price,
            subtotal: item.subtotal(),
        }
    }

    fn to_response(order: order::Model, items: Vec<order_item::Model>) -> OrderResponse {
        let total = items.iter().map(order_item::Model::subtotal).sum();
        OrderResponse {
            id: order.id,
            customer_id: order.customer_id,
            cpf: order.cpf,
            status: order.status,
            items: items.iter().map(Self::item_response).collect(),
            total,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

fn kitchen_rank(order: &order::Model) -> u8 {
    order
        .status
        .parse::<OrderStatus>()
        .ok()
        .and_then(OrderStatus::kitchen_priority)
        .unwrap_or(u8::MAX)
}
