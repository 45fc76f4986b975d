use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::AuthRouterExt,
    errors::ServiceError,
    services::inventory::{
        AdjustInventoryRequest, CreateInventoryItemRequest, InventoryAdjustment,
        InventoryItemView, UpdateInventoryItemRequest,
    },
    ApiResponse, AppState,
};

/// Build the inventory Router scoped under `/api/v1/inventory`.
pub fn inventory_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_inventory))
        .route("/exists", get(inventory_exists))
        .route("/:id", get(get_inventory));

    let write = Router::new()
        .route("/", axum::routing::post(create_inventory))
        .route(
            "/:id",
            axum::routing::patch(update_inventory).delete(delete_inventory),
        )
        .route("/:id/adjust", axum::routing::post(adjust_inventory))
        .manager_only();

    read.merge(write)
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ExistsQuery {
    /// Exact inventory item name
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExistsResponse {
    pub name: String,
    pub exists: bool,
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    summary = "List inventory",
    responses(
        (status = 200, description = "Stocked items", body = ApiResponse<Vec<InventoryItemView>>),
    ),
    tag = "Inventory"
)]
pub async fn list_inventory(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<InventoryItemView>>>, ServiceError> {
    let items = state.services.inventory.list_items().await?;
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/exists",
    summary = "Check an inventory name",
    params(ExistsQuery),
    responses(
        (status = 200, description = "Whether the name is stocked", body = ApiResponse<ExistsResponse>),
    ),
    tag = "Inventory"
)]
pub async fn inventory_exists(
    State(state): State<AppState>,
    Query(query): Query<ExistsQuery>,
) -> Result<Json<ApiResponse<ExistsResponse>>, ServiceError> {
    let exists = state.services.inventory.exists(&query.name).await?;
    Ok(Json(ApiResponse::success(ExistsResponse {
        name: query.name,
        exists,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/{id}",
    summary = "Get inventory item",
    params(("id" = i32, Path, description = "Inventory item id")),
    responses(
        (status = 200, description = "Inventory item", body = ApiResponse<InventoryItemView>),
        (status = 404, description = "Inventory item not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Inventory"
)]
pub async fn get_inventory(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<InventoryItemView>>, ServiceError> {
    let item = state.services.inventory.get_item(id).await?;
    Ok(Json(ApiResponse::success(item)))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory",
    summary = "Create inventory item",
    request_body = CreateInventoryItemRequest,
    responses(
        (status = 201, description = "Inventory item created", body = ApiResponse<InventoryItemView>),
        (status = 400, description = "Invalid item", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already stocked", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Inventory"
)]
pub async fn create_inventory(
    State(state): State<AppState>,
    Json(request): Json<CreateInventoryItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<InventoryItemView>>), ServiceError> {
    let created = state.services.inventory.create_item(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

#[utoipa::path(
    patch,
    path = "/api/v1/inventory/{id}",
    summary = "Update inventory item",
    params(("id" = i32, Path, description = "Inventory item id")),
    request_body = UpdateInventoryItemRequest,
    responses(
        (status = 200, description = "Inventory item updated", body = ApiResponse<InventoryItemView>),
        (status = 404, description = "Inventory item not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already stocked", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Inventory"
)]
pub async fn update_inventory(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateInventoryItemRequest>,
) -> Result<Json<ApiResponse<InventoryItemView>>, ServiceError> {
    let updated = state.services.inventory.update_item(id, request).await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/inventory/{id}",
    summary = "Delete inventory item",
    params(("id" = i32, Path, description = "Inventory item id")),
    responses(
        (status = 204, description = "Inventory item deleted"),
        (status = 404, description = "Inventory item not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Inventory"
)]
pub async fn delete_inventory(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ServiceError> {
    state.services.inventory.delete_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory/{id}/adjust",
    summary = "Adjust stock",
    description = "Signed manual adjustment: positive receives stock, negative writes it off",
    params(("id" = i32, Path, description = "Inventory item id")),
    request_body = AdjustInventoryRequest,
    responses(
        (status = 200, description = "Stock adjusted", body = ApiResponse<InventoryAdjustment>),
        (status = 400, description = "Zero delta", body = crate::errors::ErrorResponse),
        (status = 404, description = "Inventory item not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Would drive stock negative", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Inventory"
)]
pub async fn adjust_inventory(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<AdjustInventoryRequest>,
) -> Result<Json<ApiResponse<InventoryAdjustment>>, ServiceError> {
    let adjustment = state.services.inventory.adjust(id, request).await?;
    Ok(Json(ApiResponse::success(adjustment)))
}
