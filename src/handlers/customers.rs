use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    errors::ServiceError,
    services::customers::{CustomerView, NewCustomer, UpdateCustomerAddress},
    ApiResponse, AppState,
};

/// Build the customer Router scoped under `/api/v1/customers`.
///
/// Open to the till and kiosk, which register customers as they order.
pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route("/by-phone/:phone", get(get_customer_by_phone))
        .route("/:id", get(get_customer))
        .route("/:id/address", patch(update_customer_address))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CustomerQuery {
    /// Exact phone number, `555-123-4567`
    pub phone: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/customers",
    summary = "List customers",
    params(CustomerQuery),
    responses(
        (status = 200, description = "Customers", body = ApiResponse<Vec<CustomerView>>),
    ),
    tag = "Customers"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<CustomerQuery>,
) -> Result<Json<ApiResponse<Vec<CustomerView>>>, ServiceError> {
    let customers = state
        .services
        .customers
        .list_customers(query.phone.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(customers)))
}

#[utoipa::path(
    get,
    path = "/api/v1/customers/by-phone/{phone}",
    summary = "Find customer by phone",
    params(("phone" = String, Path, description = "Phone number, 555-123-4567")),
    responses(
        (status = 200, description = "Customer", body = ApiResponse<CustomerView>),
        (status = 404, description = "No customer with that phone", body = crate::errors::ErrorResponse),
    ),
    tag = "Customers"
)]
pub async fn get_customer_by_phone(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<Json<ApiResponse<CustomerView>>, ServiceError> {
    let customer = state.services.customers.find_by_phone(&phone).await?;
    Ok(Json(ApiResponse::success(customer)))
}

#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}",
    summary = "Get customer",
    params(("id" = i32, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer", body = ApiResponse<CustomerView>),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Customers"
)]
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<CustomerView>>, ServiceError> {
    let customer = state.services.customers.get_customer(id).await?;
    Ok(Json(ApiResponse::success(customer)))
}

#[utoipa::path(
    post,
    path = "/api/v1/customers",
    summary = "Create customer",
    request_body = NewCustomer,
    responses(
        (status = 201, description = "Customer created", body = ApiResponse<CustomerView>),
        (status = 400, description = "Invalid name or phone", body = crate::errors::ErrorResponse),
        (status = 409, description = "Phone number already registered", body = crate::errors::ErrorResponse),
    ),
    tag = "Customers"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    Json(request): Json<NewCustomer>,
) -> Result<(StatusCode, Json<ApiResponse<CustomerView>>), ServiceError> {
    let created = state.services.customers.create_customer(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

#[utoipa::path(
    patch,
    path = "/api/v1/customers/{id}/address",
    summary = "Update customer address",
    params(("id" = i32, Path, description = "Customer id")),
    request_body = UpdateCustomerAddress,
    responses(
        (status = 200, description = "Address updated", body = ApiResponse<CustomerView>),
        (status = 400, description = "Blank address", body = crate::errors::ErrorResponse),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Customers"
)]
pub async fn update_customer_address(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateCustomerAddress>,
) -> Result<Json<ApiResponse<CustomerView>>, ServiceError> {
    let updated = state.services.customers.update_address(id, request).await?;
    Ok(Json(ApiResponse::success(updated)))
}
