use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::{entities::customer, errors::ServiceError, repositories::CustomerStore};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, message = "first name is required"))]
    pub first_name: String,

    #[validate(length(min = 1, message = "last name is required"))]
    pub last_name: String,

    #[validate(length(min = 11, max = 14, message = "CPF must have 11 to 14 characters"))]
    pub cpf: String,

    #[validate(email(message = "email must be valid"))]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CustomerResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub cpf: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Customer registry, keyed by id and CPF.
#[derive(Clone)]
pub struct CustomerService {
    store: Arc<dyn CustomerStore>,
}

impl CustomerService {
    pub fn new(store: Arc<dyn CustomerStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, request), fields(cpf = %request.cpf))]
    pub async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<CustomerResponse, ServiceError> {
        request.validate()?;

        if self.store.get_by_cpf(&request.cpf).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "customer with cpf {} already exists",
                request.cpf
            )));
        }

        let now = Utc::now();
        let customer = self
            .store
            .create(customer::Model {
                id: 0,
                first_name: request.first_name,
                last_name: request.last_name,
                cpf: request.cpf,
                email: request.email,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(customer_id = customer.id, "customer created");
        Ok(Self::to_response(customer))
    }

    #[instrument(skip(self))]
    pub async fn get_customer(&self, id: i64) -> Result<CustomerResponse, ServiceError> {
        let customer = self
            .store
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("customer with id {} not found", id)))?;
        Ok(Self::to_response(customer))
    }

    #[instrument(skip(self))]
    pub async fn get_customer_by_cpf(&self, cpf: &str) -> Result<CustomerResponse, ServiceError> {
        let customer = self
            .store
            .get_by_cpf(cpf)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("customer with cpf {} not found", cpf)))?;
        Ok(Self::to_response(customer))
    }

    fn to_response(customer: customer::Model) -> CustomerResponse {
        CustomerResponse {
            id: customer.id,
            first_name: customer.first_name,
            last_name: customer.last_name,
            cpf: customer.cpf,
            email: customer.email,
            created_at: customer.created_at,
            updated_at: customer.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryCustomerStore;

    fn service() -> CustomerService {
        CustomerService::new(Arc::new(InMemoryCustomerStore::new()))
    }

    fn request(cpf: &str) -> CreateCustomerRequest {
        CreateCustomerRequest {
            first_name: "Ana".to_string(),
            last_name: "Silva".to_string(),
            cpf: cpf.to_string(),
            email: "ana.silva@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_cpf_is_a_conflict() {
        let service = service();
        service.create_customer(request("12345678901")).await.unwrap();
        let err = service
            .create_customer(request("12345678901"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn lookup_by_cpf_finds_created_customer() {
        let service = service();
        let created = service.create_customer(request("12345678901")).await.unwrap();
        let found = service.get_customer_by_cpf("12345678901").await.unwrap();
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn short_cpf_fails_validation() {
        let service = service();
        let err = service.create_customer(request("123")).await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }
}
