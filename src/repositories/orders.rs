use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::error;

use crate::{
    db::DbPool,
    entities::order::{self, Entity as OrderEntity},
    entities::order_item::{self, Entity as OrderItemEntity},
    entities::OrderStatus,
    errors::ServiceError,
    repositories::OrderStore,
};

/// sea-orm-backed order store.
#[derive(Clone)]
pub struct DbOrderStore {
    db: Arc<DbPool>,
}

impl DbOrderStore {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OrderStore for DbOrderStore {
    async fn create(
        &self,
        order: order::Model,
        items: Vec<order_item::Model>,
    ) -> Result<(order::Model, Vec<order_item::Model>), ServiceError> {
        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let order_active = order::ActiveModel {
            customer_id: Set(order.customer_id),
            cpf: Set(order.cpf.clone()),
            status: Set(order.status.clone()),
            created_at: Set(order.created_at),
            updated_at: Set(order.updated_at),
            ..Default::default()
        };

        let created_order = order_active.insert(&txn).await.map_err(|e| {
            error!(error = %e, "failed to insert order");
            ServiceError::DatabaseError(e)
        })?;

        let mut created_items = Vec::with_capacity(items.len());
        for item in items {
            let item_active = order_item::ActiveModel {
                order_id: Set(created_order.id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                price: Set(item.price),
                created_at: Set(item.created_at),
                updated_at: Set(item.updated_at),
                ..Default::default()
            };
            let created = item_active.insert(&txn).await.map_err(|e| {
                error!(error = %e, order_id = created_order.id, "failed to insert order item");
                ServiceError::DatabaseError(e)
            })?;
            created_items.push(created);
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, "failed to commit order creation");
            ServiceError::DatabaseError(e)
        })?;

        Ok((created_order, created_items))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<order::Model>, ServiceError> {
        Ok(OrderEntity::find_by_id(id).one(&*self.db).await?)
    }

    async fn get_by_cpf(&self, cpf: &str) -> Result<Vec<order::Model>, ServiceError> {
        Ok(OrderEntity::find()
            .filter(order::Column::Cpf.eq(cpf))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    async fn get_by_customer_id(
        &self,
        customer_id: i64,
    ) -> Result<Vec<order::Model>, ServiceError> {
        Ok(OrderEntity::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    async fn get_all(&self) -> Result<Vec<order::Model>, ServiceError> {
        Ok(OrderEntity::find()
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    async fn get_pending_for_kitchen(&self) -> Result<Vec<order::Model>, ServiceError> {
        let in_flight = [
            OrderStatus::Received.to_string(),
            OrderStatus::InProgress.to_string(),
            OrderStatus::Ready.to_string(),
        ];
        Ok(OrderEntity::find()
            .filter(order::Column::Status.is_in(in_flight))
            .order_by_asc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    async fn update(&self, order: order::Model) -> Result<order::Model, ServiceError> {
        let status = order.status.clone();
        let updated_at = order.updated_at;
        let mut active: order::ActiveModel = order.into();
        active.status = Set(status);
        active.updated_at = Set(updated_at);
        Ok(active.update(&*self.db).await?)
    }

    async fn items_for_order(
        &self,
        order_id: i64,
    ) -> Result<Vec<order_item::Model>, ServiceError> {
        Ok(OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::Id)
            .all(&*self.db)
            .await?)
    }

    async fn update_item_quantity(
        &self,
        item_id: i64,
        quantity: i32,
    ) -> Result<order_item::Model, ServiceError> {
        let item = OrderItemEntity::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("order item with id {} not found", item_id))
            })?;

        let mut active: order_item::ActiveModel = item.into();
        active.quantity = Set(quantity);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::DatabaseError)?;

        OrderItemEntity::delete_many()
            .filter(order_item::Column::OrderId.eq(id))
            .exec(&txn)
            .await?;
        OrderEntity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = id, "failed to commit order deletion");
            ServiceError::DatabaseError(e)
        })?;
        Ok(())
    }
}
