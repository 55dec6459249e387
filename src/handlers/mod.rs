pub mod customers;
pub mod orders;
pub mod payments;
pub mod products;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::payment_provider::PaymentProviderClient;
use crate::repositories::{DbCustomerStore, DbOrderStore, DbPaymentStore, DbProductStore};
use crate::services::{
    customers::CustomerService, orders::OrderService, payments::PaymentService,
    products::ProductService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentService>,
    pub products: Arc<ProductService>,
    pub customers: Arc<CustomerService>,
}

impl AppServices {
    /// Wires the database-backed stores into the services.
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        payment_provider: Option<Arc<dyn PaymentProviderClient>>,
    ) -> Self {
        let order_store = Arc::new(DbOrderStore::new(db.clone()));
        let product_store = Arc::new(DbProductStore::new(db.clone()));
        let payment_store = Arc::new(DbPaymentStore::new(db.clone()));
        let customer_store = Arc::new(DbCustomerStore::new(db));

        let orders = Arc::new(OrderService::new(
            order_store.clone(),
            product_store.clone(),
            payment_store.clone(),
            Some(event_sender.clone()),
        ));
        let payments = Arc::new(PaymentService::new(
            payment_store,
            order_store,
            payment_provider,
            Some(event_sender),
        ));
        let products = Arc::new(ProductService::new(product_store));
        let customers = Arc::new(CustomerService::new(customer_store));

        Self {
            orders,
            payments,
            products,
            customers,
        }
    }
}
