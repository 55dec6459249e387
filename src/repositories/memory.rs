//! In-memory store implementations.
//!
//! Useful for unit tests and local experiments; they mirror the database
//! semantics (id assignment, the unique payment-per-order constraint) without
//! a running database.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use crate::{
    entities::{customer, order, order_item, payment, product, OrderStatus},
    errors::ServiceError,
    repositories::{CustomerStore, OrderStore, PaymentStore, ProductLookup, ProductStore},
};

#[derive(Default)]
pub struct InMemoryProductStore {
    products: Mutex<Vec<product::Model>>,
    next_id: AtomicI64,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl ProductLookup for InMemoryProductStore {
    async fn get_by_id(&self, id: i64) -> Result<Option<product::Model>, ServiceError> {
        let products = self.products.lock().unwrap();
        Ok(products.iter().find(|p| p.id == id).cloned())
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn create(&self, mut product: product::Model) -> Result<product::Model, ServiceError> {
        product.id = self.next_id();
        self.products.lock().unwrap().push(product.clone());
        Ok(product)
    }

    async fn get_all(&self) -> Result<Vec<product::Model>, ServiceError> {
        Ok(self.products.lock().unwrap().clone())
    }

    async fn get_by_category(&self, category: &str) -> Result<Vec<product::Model>, ServiceError> {
        let products = self.products.lock().unwrap();
        Ok(products
            .iter()
            .filter(|p| p.category == category)
            .cloned()
            .collect())
    }

    async fn update(&self, product: product::Model) -> Result<product::Model, ServiceError> {
        let mut products = self.products.lock().unwrap();
        let slot = products
            .iter_mut()
            .find(|p| p.id == product.id)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("product with id {} not found", product.id))
            })?;
        *slot = product.clone();
        Ok(product)
    }

    async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        self.products.lock().unwrap().retain(|p| p.id != id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCustomerStore {
    customers: Mutex<Vec<customer::Model>>,
    next_id: AtomicI64,
}

impl InMemoryCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CustomerStore for InMemoryCustomerStore {
    async fn create(&self, mut customer: customer::Model) -> Result<customer::Model, ServiceError> {
        let mut customers = self.customers.lock().unwrap();
        if customers.iter().any(|c| c.cpf == customer.cpf) {
            return Err(ServiceError::Conflict(format!(
                "customer with cpf {} already exists",
                customer.cpf
            )));
        }
        customer.id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        customers.push(customer.clone());
        Ok(customer)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<customer::Model>, ServiceError> {
        let customers = self.customers.lock().unwrap();
        Ok(customers.iter().find(|c| c.id == id).cloned())
    }

    async fn get_by_cpf(&self, cpf: &str) -> Result<Option<customer::Model>, ServiceError> {
        let customers = self.customers.lock().unwrap();
        Ok(customers.iter().find(|c| c.cpf == cpf).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: Mutex<Vec<order::Model>>,
    items: Mutex<Vec<order_item::Model>>,
    next_order_id: AtomicI64,
    next_item_id: AtomicI64,
    #[cfg(test)]
    failing_item_orders: Mutex<std::collections::HashSet<i64>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_count(&self) -> usize {
        self.orders.lock().unwrap().len()
    }

    /// Makes `items_for_order` fail for the given order, to exercise the
    /// best-effort projection paths.
    #[cfg(test)]
    pub fn fail_items_for(&self, order_id: i64) {
        self.failing_item_orders.lock().unwrap().insert(order_id);
    }

    fn sorted_desc(mut orders: Vec<order::Model>) -> Vec<order::Model> {
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(
        &self,
        mut order: order::Model,
        items: Vec<order_item::Model>,
    ) -> Result<(order::Model, Vec<order_item::Model>), ServiceError> {
        order.id = self.next_order_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.orders.lock().unwrap().push(order.clone());

        let mut created_items = Vec::with_capacity(items.len());
        let mut stored = self.items.lock().unwrap();
        for mut item in items {
            item.id = self.next_item_id.fetch_add(1, Ordering::SeqCst) + 1;
            item.order_id = order.id;
            stored.push(item.clone());
            created_items.push(item);
        }

        Ok((order, created_items))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<order::Model>, ServiceError> {
        let orders = self.orders.lock().unwrap();
        Ok(orders.iter().find(|o| o.id == id).cloned())
    }

    async fn get_by_cpf(&self, cpf: &str) -> Result<Vec<order::Model>, ServiceError> {
        let orders = self.orders.lock().unwrap();
        Ok(Self::sorted_desc(
            orders.iter().filter(|o| o.cpf == cpf).cloned().collect(),
        ))
    }

    async fn get_by_customer_id(
        &self,
        customer_id: i64,
    ) -> Result<Vec<order::Model>, ServiceError> {
        let orders = self.orders.lock().unwrap();
        Ok(Self::sorted_desc(
            orders
                .iter()
                .filter(|o| o.customer_id == customer_id)
                .cloned()
                .collect(),
        ))
    }

    async fn get_all(&self) -> Result<Vec<order::Model>, ServiceError> {
        let orders = self.orders.lock().unwrap();
        Ok(Self::sorted_desc(orders.clone()))
    }

    async fn get_pending_for_kitchen(&self) -> Result<Vec<order::Model>, ServiceError> {
        let orders = self.orders.lock().unwrap();
        let mut pending: Vec<order::Model> = orders
            .iter()
            .filter(|o| {
                matches!(
                    o.status.parse::<OrderStatus>(),
                    Ok(OrderStatus::Received | OrderStatus::InProgress | OrderStatus::Ready)
                )
            })
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(pending)
    }

    async fn update(&self, order: order::Model) -> Result<order::Model, ServiceError> {
        let mut orders = self.orders.lock().unwrap();
        let slot = orders.iter_mut().find(|o| o.id == order.id).ok_or_else(|| {
            ServiceError::NotFound(format!("order with id {} not found", order.id))
        })?;
        *slot = order.clone();
        Ok(order)
    }

    async fn items_for_order(
        &self,
        order_id: i64,
    ) -> Result<Vec<order_item::Model>, ServiceError> {
        #[cfg(test)]
        if self.failing_item_orders.lock().unwrap().contains(&order_id) {
            return Err(ServiceError::InternalError(format!(
                "simulated item fetch failure for order {}",
                order_id
            )));
        }

        let items = self.items.lock().unwrap();
        Ok(items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn update_item_quantity(
        &self,
        item_id: i64,
        quantity: i32,
    ) -> Result<order_item::Model, ServiceError> {
        let mut items = self.items.lock().unwrap();
        let item = items.iter_mut().find(|i| i.id == item_id).ok_or_else(|| {
            ServiceError::NotFound(format!("order item with id {} not found", item_id))
        })?;
        item.quantity = quantity;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        self.items.lock().unwrap().retain(|i| i.order_id != id);
        self.orders.lock().unwrap().retain(|o| o.id != id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryPaymentStore {
    payments: Mutex<Vec<payment::Model>>,
    next_id: AtomicI64,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payment_count(&self) -> usize {
        self.payments.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn create(&self, mut payment: payment::Model) -> Result<payment::Model, ServiceError> {
        let mut payments = self.payments.lock().unwrap();
        // Mirrors the unique index on payments.order_id.
        if payments.iter().any(|p| p.order_id == payment.order_id) {
            return Err(ServiceError::Conflict(format!(
                "payment already exists for order {}",
                payment.order_id
            )));
        }
        payment.id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        payments.push(payment.clone());
        Ok(payment)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<payment::Model>, ServiceError> {
        let payments = self.payments.lock().unwrap();
        Ok(payments.iter().find(|p| p.id == id).cloned())
    }

    async fn get_by_order_id(
        &self,
        order_id: i64,
    ) -> Result<Option<payment::Model>, ServiceError> {
        let payments = self.payments.lock().unwrap();
        Ok(payments.iter().find(|p| p.order_id == order_id).cloned())
    }

    async fn get_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<payment::Model>, ServiceError> {
        let payments = self.payments.lock().unwrap();
        Ok(payments
            .iter()
            .find(|p| p.transaction_id == transaction_id)
            .cloned())
    }

    async fn update(&self, payment: payment::Model) -> Result<payment::Model, ServiceError> {
        let mut payments = self.payments.lock().unwrap();
        let slot = payments
            .iter_mut()
            .find(|p| p.id == payment.id)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("payment with id {} not found", payment.id))
            })?;
        *slot = payment.clone();
        Ok(payment)
    }

    async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        self.payments.lock().unwrap().retain(|p| p.id != id);
        Ok(())
    }
}
