use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{
    entities::{product, ProductCategory},
    errors::ServiceError,
    repositories::ProductStore,
};

fn validate_positive_price(value: &Decimal) -> Result<(), ValidationError> {
    if *value > Decimal::ZERO {
        Ok(())
    } else {
        let mut err = ValidationError::new("range");
        err.message = Some("price must be greater than 0".into());
        Err(err)
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ProductRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[validate(custom = "validate_positive_price")]
    pub price: Decimal,

    pub category: String,

    #[serde(default)]
    pub image_url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Menu catalog maintenance.
#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn ProductStore>,
}

impl ProductService {
    pub fn new(store: Arc<dyn ProductStore>) -> Self {
        Self { store }
    }

    fn parse_category(raw: &str) -> Result<ProductCategory, ServiceError> {
        ProductCategory::from_str(raw.trim())
            .map_err(|_| ServiceError::ValidationError(format!("invalid product category: {}", raw)))
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_product(
        &self,
        request: ProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        request.validate()?;
        let category = Self::parse_category(&request.category)?;

        let now = Utc::now();
        let product = self
            .store
            .create(product::Model {
                id: 0,
                name: request.name,
                description: request.description,
                price: request.price,
                category: category.to_string(),
                image_url: request.image_url,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(product_id = product.id, "product created");
        Ok(Self::to_response(product))
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: i64) -> Result<ProductResponse, ServiceError> {
        let product = self
            .store
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product with id {} not found", id)))?;
        Ok(Self::to_response(product))
    }

    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<ProductResponse>, ServiceError> {
        let products = self.store.get_all().await?;
        Ok(products.into_iter().map(Self::to_response).collect())
    }

    #[instrument(skip(self))]
    pub async fn products_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<ProductResponse>, ServiceError> {
        let category = Self::parse_category(category)?;
        let products = self.store.get_by_category(&category.to_string()).await?;
        Ok(products.into_iter().map(Self::to_response).collect())
    }

    #[instrument(skip(self, request))]
    pub async fn update_product(
        &self,
        id: i64,
        request: ProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        request.validate()?;
        let category = Self::parse_category(&request.category)?;

        let existing = self
            .store
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product with id {} not found", id)))?;

        let mut updated = existing;
        updated.name = request.name;
        updated.description = request.description;
        updated.price = request.price;
        updated.category = category.to_string();
        updated.image_url = request.image_url;
        updated.updated_at = Utc::now();

        let updated = self.store.update(updated).await?;
        Ok(Self::to_response(updated))
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: i64) -> Result<(), ServiceError> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product with id {} not found", id)))?;
        self.store.delete(id).await?;
        info!(product_id = id, "product deleted");
        Ok(())
    }

    fn to_response(product: product::Model) -> ProductResponse {
        ProductResponse {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            category: product.category,
            image_url: product.image_url,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}
