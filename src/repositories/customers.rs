use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use std::sync::Arc;

use crate::{
    db::DbPool,
    entities::customer::{self, Entity as CustomerEntity},
    errors::ServiceError,
    repositories::CustomerStore,
};

#[derive(Clone)]
pub struct DbCustomerStore {
    db: Arc<DbPool>,
}

impl DbCustomerStore {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CustomerStore for DbCustomerStore {
    async fn create(&self, customer: customer::Model) -> Result<customer::Model, ServiceError> {
        let active = customer::ActiveModel {
            first_name: Set(customer.first_name.clone()),
            last_name: Set(customer.last_name.clone()),
            cpf: Set(customer.cpf.clone()),
            email: Set(customer.email.clone()),
            created_at: Set(customer.created_at),
            updated_at: Set(customer.updated_at),
            ..Default::default()
        };
        Ok(active.insert(&*self.db).await?)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<customer::Model>, ServiceError> {
        Ok(CustomerEntity::find_by_id(id).one(&*self.db).await?)
    }

    async fn get_by_cpf(&self, cpf: &str) -> Result<Option<customer::Model>, ServiceError> {
        Ok(CustomerEntity::find()
            .filter(customer::Column::Cpf.eq(cpf))
            .one(&*self.db)
            .await?)
    }
}
