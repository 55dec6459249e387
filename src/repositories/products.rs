use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;

use crate::{
    db::DbPool,
    entities::product::{self, Entity as ProductEntity},
    errors::ServiceError,
    repositories::{ProductLookup, ProductStore},
};

#[derive(Clone)]
pub struct DbProductStore {
    db: Arc<DbPool>,
}

impl DbProductStore {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductLookup for DbProductStore {
    async fn get_by_id(&self, id: i64) -> Result<Option<product::Model>, ServiceError> {
        Ok(ProductEntity::find_by_id(id).one(&*self.db).await?)
    }
}

#[async_trait]
impl ProductStore for DbProductStore {
    async fn create(&self, product: product::Model) -> Result<product::Model, ServiceError> {
        let active = product::ActiveModel {
            name: Set(product.name.clone()),
            description: Set(product.description.clone()),
            price: Set(product.price),
            category: Set(product.category.clone()),
            image_url: Set(product.image_url.clone()),
            created_at: Set(product.created_at),
            updated_at: Set(product.updated_at),
            ..Default::default()
        };
        Ok(active.insert(&*self.db).await?)
    }

    async fn get_all(&self) -> Result<Vec<product::Model>, ServiceError> {
        Ok(ProductEntity::find()
            .order_by_asc(product::Column::Id)
            .all(&*self.db)
            .await?)
    }

    async fn get_by_category(&self, category: &str) -> Result<Vec<product::Model>, ServiceError> {
        Ok(ProductEntity::find()
            .filter(product::Column::Category.eq(category))
            .order_by_asc(product::Column::Id)
            .all(&*self.db)
            .await?)
    }

    async fn update(&self, product: product::Model) -> Result<product::Model, ServiceError> {
        let mut active: product::ActiveModel = product.clone().into();
        active.name = Set(product.name);
        active.description = Set(product.description);
        active.price = Set(product.price);
        active.category = Set(product.category);
        active.image_url = Set(product.image_url);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        ProductEntity::delete_by_id(id).exec(&*self.db).await?;
        Ok(())
    }
}
