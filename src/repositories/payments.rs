use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use tracing::error;

use crate::{
    db::DbPool,
    entities::payment::{self, Entity as PaymentEntity},
    errors::ServiceError,
    repositories::PaymentStore,
};

/// sea-orm-backed payment store. The `payments.order_id` column carries a
/// unique index, so a concurrent duplicate insert surfaces as a database
/// error rather than a second row.
#[derive(Clone)]
pub struct DbPaymentStore {
    db: Arc<DbPool>,
}

impl DbPaymentStore {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PaymentStore for DbPaymentStore {
    async fn create(&self, payment: payment::Model) -> Result<payment::Model, ServiceError> {
        let active = payment::ActiveModel {
            order_id: Set(payment.order_id),
            amount: Set(payment.amount),
            status: Set(payment.status.clone()),
            payment_method: Set(payment.payment_method.clone()),
            transaction_id: Set(payment.transaction_id.clone()),
            created_at: Set(payment.created_at),
            updated_at: Set(payment.updated_at),
            ..Default::default()
        };

        active.insert(&*self.db).await.map_err(|e| {
            error!(error = %e, order_id = payment.order_id, "failed to insert payment");
            ServiceError::DatabaseError(e)
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<payment::Model>, ServiceError> {
        Ok(PaymentEntity::find_by_id(id).one(&*self.db).await?)
    }

    async fn get_by_order_id(
        &self,
        order_id: i64,
    ) -> Result<Option<payment::Model>, ServiceError> {
        Ok(PaymentEntity::find()
            .filter(payment::Column::OrderId.eq(order_id))
            .one(&*self.db)
            .await?)
    }

    async fn get_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<payment::Model>, ServiceError> {
        Ok(PaymentEntity::find()
            .filter(payment::Column::TransactionId.eq(transaction_id))
            .one(&*self.db)
            .await?)
    }

    async fn update(&self, payment: payment::Model) -> Result<payment::Model, ServiceError> {
        let status = payment.status.clone();
        let transaction_id = payment.transaction_id.clone();
        let updated_at = payment.updated_at;
        let mut active: payment::ActiveModel = payment.into();
        active.status = Set(status);
        active.transaction_id = Set(transaction_id);
        active.updated_at = Set(updated_at);
        Ok(active.update(&*self.db).await?)
    }

    async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        PaymentEntity::delete_by_id(id).exec(&*self.db).await?;
        Ok(())
    }
}
