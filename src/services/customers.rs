use crate::{
    db::DbPool,
    entities::customer::{self, Entity as CustomerEntity},
    errors::ServiceError,
    services::non_blank,
};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

/// Phone numbers are stored exactly as `XXX-XXX-XXXX`.
pub static PHONE_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{3}-\d{3}-\d{4}$").expect("phone number pattern compiles"));

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewCustomer {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub name: String,
    #[validate(regex(path = "PHONE_NUMBER_RE", message = "must look like 555-123-4567"))]
    pub phone_number: String,
    #[validate(length(max = 255, message = "must be at most 255 characters"))]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateCustomerAddress {
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CustomerView {
    pub id: i32,
    pub name: String,
    pub phone_number: String,
    pub address: Option<String>,
}

impl From<customer::Model> for CustomerView {
    fn from(model: customer::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            phone_number: model.phone_number,
            address: model.address,
        }
    }
}

/// Finds the customer owning `new.phone_number`, creating it when absent.
///
/// An existing record is returned unchanged; the name and address on `new`
/// only apply to a first visit.
pub(crate) async fn resolve_by_phone<C>(
    conn: &C,
    new: &NewCustomer,
) -> Result<customer::Model, ServiceError>
where
    C: ConnectionTrait,
{
    new.validate()?;

    let insert = CustomerEntity::insert(customer::ActiveModel {
        name: Set(new.name.trim().to_string()),
        phone_number: Set(new.phone_number.clone()),
        address: Set(non_blank(new.address.clone())),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::column(customer::Column::PhoneNumber)
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await;

    match insert {
        Ok(_) | Err(DbErr::RecordNotInserted) => {}
        Err(e) => {
            error!(error = %e, "customer upsert failed");
            return Err(ServiceError::DatabaseError(e));
        }
    }

    CustomerEntity::find()
        .filter(customer::Column::PhoneNumber.eq(new.phone_number.as_str()))
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::InternalError(format!(
                "customer {} vanished after upsert",
                new.phone_number
            ))
        })
}

/// Service for customer records
#[derive(Clone)]
pub struct CustomerService {
    db_pool: Arc<DbPool>,
}

impl CustomerService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Lists customers, optionally narrowed to one phone number
    #[instrument(skip(self))]
    pub async fn list_customers(
        &self,
        phone_number: Option<&str>,
    ) -> Result<Vec<CustomerView>, ServiceError> {
        let mut query = CustomerEntity::find().order_by_asc(customer::Column::Id);
        if let Some(phone) = phone_number {
            query = query.filter(customer::Column::PhoneNumber.eq(phone));
        }
        let customers = query.all(&*self.db_pool).await?;
        Ok(customers.into_iter().map(CustomerView::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn find_by_phone(&self, phone_number: &str) -> Result<CustomerView, ServiceError> {
        CustomerEntity::find()
            .filter(customer::Column::PhoneNumber.eq(phone_number))
            .one(&*self.db_pool)
            .await?
            .map(CustomerView::from)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("No customer with phone number {}", phone_number))
            })
    }

    #[instrument(skip(self))]
    pub async fn get_customer(&self, id: i32) -> Result<CustomerView, ServiceError> {
        CustomerEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .map(CustomerView::from)
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", id)))
    }

    /// Registers a new customer; a phone number can only belong to one customer.
    #[instrument(skip(self, request), fields(phone_number = %request.phone_number))]
    pub async fn create_customer(&self, request: NewCustomer) -> Result<CustomerView, ServiceError> {
        request.validate()?;

        let created = customer::ActiveModel {
            name: Set(request.name.trim().to_string()),
            phone_number: Set(request.phone_number.clone()),
            address: Set(non_blank(request.address)),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .map_err(|e| {
            ServiceError::from_write(
                e,
                format!(
                    "A customer with phone number {} already exists",
                    request.phone_number
                ),
            )
        })?;

        info!(customer_id = created.id, "customer created");
        Ok(created.into())
    }

    #[instrument(skip(self, request))]
    pub async fn update_address(
        &self,
        id: i32,
        request: UpdateCustomerAddress,
    ) -> Result<CustomerView, ServiceError> {
        request.validate()?;
        let address = non_blank(Some(request.address)).ok_or_else(|| {
            ServiceError::ValidationError("address: must not be blank".to_string())
        })?;

        let existing = CustomerEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", id)))?;

        let mut active: customer::ActiveModel = existing.into();
        active.address = Set(Some(address));
        let updated = active.update(&*self.db_pool).await?;

        info!(customer_id = id, "customer address updated");
        Ok(updated.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_pattern_requires_dashed_ten_digits() {
        assert!(PHONE_NUMBER_RE.is_match("555-123-4567"));
        assert!(!PHONE_NUMBER_RE.is_match("5551234567"));
        assert!(!PHONE_NUMBER_RE.is_match("555-1234-567"));
        assert!(!PHONE_NUMBER_RE.is_match(" 555-123-4567"));
    }

    #[test]
    fn new_customer_validation_names_the_field() {
        let bad = NewCustomer {
            name: "Ada".into(),
            phone_number: "555 123 4567".into(),
            address: None,
        };
        let err = bad.validate().unwrap_err();
        assert!(err.field_errors().contains_key("phone_number"));

        let nameless = NewCustomer {
            name: String::new(),
            phone_number: "555-123-4567".into(),
            address: None,
        };
        assert!(nameless.validate().unwrap_err().field_errors().contains_key("name"));
    }
}
