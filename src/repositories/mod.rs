//! Store abstractions decoupling the services from persistence.
//!
//! Each port has one sea-orm-backed implementation and one in-memory
//! implementation used by unit tests.

pub mod customers;
pub mod memory;
pub mod orders;
pub mod payments;
pub mod products;

use async_trait::async_trait;

use crate::{
    entities::{customer, order, order_item, payment, product},
    errors::ServiceError,
};

pub use customers::DbCustomerStore;
pub use memory::{
    InMemoryCustomerStore, InMemoryOrderStore, InMemoryPaymentStore, InMemoryProductStore,
};
pub use orders::DbOrderStore;
pub use payments::DbPaymentStore;
pub use products::DbProductStore;

/// Resolves a product id to its current catalog entry. Order assembly uses
/// this for existence checks and for the price snapshot.
#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn get_by_id(&self, id: i64) -> Result<Option<product::Model>, ServiceError>;
}

#[async_trait]
pub trait ProductStore: ProductLookup {
    async fn create(&self, product: product::Model) -> Result<product::Model, ServiceError>;
    async fn get_all(&self) -> Result<Vec<product::Model>, ServiceError>;
    async fn get_by_category(&self, category: &str) -> Result<Vec<product::Model>, ServiceError>;
    async fn update(&self, product: product::Model) -> Result<product::Model, ServiceError>;
    async fn delete(&self, id: i64) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn create(&self, customer: customer::Model) -> Result<customer::Model, ServiceError>;
    async fn get_by_id(&self, id: i64) -> Result<Option<customer::Model>, ServiceError>;
    async fn get_by_cpf(&self, cpf: &str) -> Result<Option<customer::Model>, ServiceError>;
}

/// Aggregate store for orders and their items. Items are exclusively owned
/// by their order, so multi-row writes (creation, deletion) go through this
/// single port and run in one transaction.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists the order and all of its items atomically, assigning ids.
    /// Either everything lands or nothing does.
    async fn create(
        &self,
        order: order::Model,
        items: Vec<order_item::Model>,
    ) -> Result<(order::Model, Vec<order_item::Model>), ServiceError>;

    async fn get_by_id(&self, id: i64) -> Result<Option<order::Model>, ServiceError>;
    async fn get_by_cpf(&self, cpf: &str) -> Result<Vec<order::Model>, ServiceError>;
    async fn get_by_customer_id(&self, customer_id: i64)
        -> Result<Vec<order::Model>, ServiceError>;
    async fn get_all(&self) -> Result<Vec<order::Model>, ServiceError>;

    /// Orders still in flight: `received`, `in_progress` or `ready`.
    async fn get_pending_for_kitchen(&self) -> Result<Vec<order::Model>, ServiceError>;

    async fn update(&self, order: order::Model) -> Result<order::Model, ServiceError>;

    async fn items_for_order(&self, order_id: i64)
        -> Result<Vec<order_item::Model>, ServiceError>;

    /// Administrative quantity correction on a persisted item.
    async fn update_item_quantity(
        &self,
        item_id: i64,
        quantity: i32,
    ) -> Result<order_item::Model, ServiceError>;

    /// Removes the order's items, then the order itself, in one transaction.
    async fn delete(&self, id: i64) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn create(&self, payment: payment::Model) -> Result<payment::Model, ServiceError>;
    async fn get_by_id(&self, id: i64) -> Result<Option<payment::Model>, ServiceError>;
    async fn get_by_order_id(&self, order_id: i64)
        -> Result<Option<payment::Model>, ServiceError>;
    async fn get_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<payment::Model>, ServiceError>;
    async fn update(&self, payment: payment::Model) -> Result<payment::Model, ServiceError>;
    async fn delete(&self, id: i64) -> Result<(), ServiceError>;
}
