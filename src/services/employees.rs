use crate::{
    db::DbPool,
    entities::employee::{self, Entity as EmployeeEntity},
    errors::ServiceError,
    services::non_blank,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateEmployeeRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub name: String,
    #[validate(length(min = 3, max = 64, message = "must be 3-64 characters"))]
    pub username: Option<String>,
    #[serde(default)]
    pub is_manager: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateEmployeeRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 3, max = 64, message = "must be 3-64 characters"))]
    pub username: Option<String>,
    pub is_manager: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EmployeeView {
    pub id: i32,
    pub name: String,
    pub username: Option<String>,
    pub is_manager: bool,
}

impl From<employee::Model> for EmployeeView {
    fn from(model: employee::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            username: model.username,
            is_manager: model.is_manager,
        }
    }
}

/// Service for staff records
#[derive(Clone)]
pub struct EmployeeService {
    db_pool: Arc<DbPool>,
}

impl EmployeeService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn list_employees(&self) -> Result<Vec<EmployeeView>, ServiceError> {
        let employees = EmployeeEntity::find()
            .order_by_asc(employee::Column::Id)
            .all(&*self.db_pool)
            .await?;
        Ok(employees.into_iter().map(EmployeeView::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get_employee(&self, id: i32) -> Result<EmployeeView, ServiceError> {
        self.find_model(id).await.map(EmployeeView::from)
    }

    /// Looks up the employee that signs in as `username`
    #[instrument(skip(self))]
    pub async fn find_by_username(&self, username: &str) -> Result<EmployeeView, ServiceError> {
        EmployeeEntity::find()
            .filter(employee::Column::Username.eq(username))
            .one(&*self.db_pool)
            .await?
            .map(EmployeeView::from)
            .ok_or_else(|| ServiceError::NotFound(format!("No employee with username {}", username)))
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_employee(
        &self,
        request: CreateEmployeeRequest,
    ) -> Result<EmployeeView, ServiceError> {
        request.validate()?;

        let name = request.name.trim().to_string();
        let created = employee::ActiveModel {
            name: Set(name.clone()),
            username: Set(non_blank(request.username)),
            is_manager: Set(request.is_manager),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .map_err(|e| {
            ServiceError::from_write(e, format!("Employee name or username already taken: {}", name))
        })?;

        info!(employee_id = created.id, "employee created");
        Ok(created.into())
    }

    #[instrument(skip(self, request))]
    pub async fn update_employee(
        &self,
        id: i32,
        request: UpdateEmployeeRequest,
    ) -> Result<EmployeeView, ServiceError> {
        request.validate()?;

        let mut active: employee::ActiveModel = self.find_model(id).await?.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(username) = request.username {
            active.username = Set(non_blank(Some(username)));
        }
        if let Some(is_manager) = request.is_manager {
            active.is_manager = Set(is_manager);
        }

        let updated = active
            .update(&*self.db_pool)
            .await
            .map_err(|e| ServiceError::from_write(e, "Employee name or username already taken"))?;

        info!(employee_id = id, "employee updated");
        Ok(updated.into())
    }

    /// Removes an employee. Employees that have taken orders cannot be removed.
    #[instrument(skip(self))]
    pub async fn delete_employee(&self, id: i32) -> Result<(), ServiceError> {
        let existing = self.find_model(id).await?;
        EmployeeEntity::delete_by_id(existing.id)
            .exec(&*self.db_pool)
            .await
            .map_err(|e| {
                ServiceError::from_write(e, format!("Employee {} has orders on record", id))
            })?;

        info!(employee_id = id, "employee deleted");
        Ok(())
    }

    async fn find_model(&self, id: i32) -> Result<employee::Model, ServiceError> {
        EmployeeEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Employee {} not found", id)))
    }
}
