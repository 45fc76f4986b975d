use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};

use crate::{
    auth::AuthRouterExt,
    errors::ServiceError,
    services::employees::{CreateEmployeeRequest, EmployeeView, UpdateEmployeeRequest},
    ApiResponse, AppState,
};

/// Build the staff Router scoped under `/api/v1/employees`. Managers only.
pub fn employee_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_employees).post(create_employee))
        .route(
            "/:id",
            get(get_employee)
                .patch(update_employee)
                .delete(delete_employee),
        )
        .manager_only()
}

#[utoipa::path(
    get,
    path = "/api/v1/employees",
    summary = "List employees",
    responses(
        (status = 200, description = "Staff records", body = ApiResponse<Vec<EmployeeView>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Employees"
)]
pub async fn list_employees(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<EmployeeView>>>, ServiceError> {
    let employees = state.services.employees.list_employees().await?;
    Ok(Json(ApiResponse::success(employees)))
}

#[utoipa::path(
    get,
    path = "/api/v1/employees/{id}",
    summary = "Get employee",
    params(("id" = i32, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Staff record", body = ApiResponse<EmployeeView>),
        (status = 404, description = "Employee not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Employees"
)]
pub async fn get_employee(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<EmployeeView>>, ServiceError> {
    let employee = state.services.employees.get_employee(id).await?;
    Ok(Json(ApiResponse::success(employee)))
}

#[utoipa::path(
    post,
    path = "/api/v1/employees",
    summary = "Create employee",
    request_body = CreateEmployeeRequest,
    responses(
        (status = 201, description = "Employee created", body = ApiResponse<EmployeeView>),
        (status = 400, description = "Invalid employee", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name or username taken", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Employees"
)]
pub async fn create_employee(
    State(state): State<AppState>,
    Json(request): Json<CreateEmployeeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<EmployeeView>>), ServiceError> {
    let created = state.services.employees.create_employee(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

#[utoipa::path(
    patch,
    path = "/api/v1/employees/{id}",
    summary = "Update employee",
    params(("id" = i32, Path, description = "Employee id")),
    request_body = UpdateEmployeeRequest,
    responses(
        (status = 200, description = "Employee updated", body = ApiResponse<EmployeeView>),
        (status = 404, description = "Employee not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name or username taken", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Employees"
)]
pub async fn update_employee(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateEmployeeRequest>,
) -> Result<Json<ApiResponse<EmployeeView>>, ServiceError> {
    let updated = state.services.employees.update_employee(id, request).await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/employees/{id}",
    summary = "Delete employee",
    params(("id" = i32, Path, description = "Employee id")),
    responses(
        (status = 204, description = "Employee deleted"),
        (status = 404, description = "Employee not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Employee has orders on record", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Employees"
)]
pub async fn delete_employee(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ServiceError> {
    state.services.employees.delete_employee(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
