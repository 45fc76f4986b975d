use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    auth::AuthRouterExt,
    entities::menu_item::MenuCategory,
    errors::ServiceError,
    services::catalog::{
        CreateMenuItemRequest, MenuItemView, MenuItemWithRecipe, RecipeLineView,
        UpdateMenuItemRequest,
    },
    ApiResponse, AppState,
};

/// Build the menu Router scoped under `/api/v1/menu`.
///
/// Reads are open to the kiosk; writes need a manager session.
pub fn menu_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_menu_items))
        .route("/:id", get(get_menu_item))
        .route("/:id/recipe", get(get_recipe));

    let write = Router::new()
        .route("/", axum::routing::post(create_menu_item))
        .route(
            "/:id",
            axum::routing::patch(update_menu_item).delete(delete_menu_item),
        )
        .manager_only();

    read.merge(write)
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MenuQuery {
    /// Only items of this category, e.g. `Chicken` or `Sides/Extras`
    pub category: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/menu",
    summary = "List menu items",
    params(MenuQuery),
    responses(
        (status = 200, description = "Menu items", body = ApiResponse<Vec<MenuItemView>>),
        (status = 400, description = "Unknown category", body = crate::errors::ErrorResponse),
    ),
    tag = "Menu"
)]
pub async fn list_menu_items(
    State(state): State<AppState>,
    Query(query): Query<MenuQuery>,
) -> Result<Json<ApiResponse<Vec<MenuItemView>>>, ServiceError> {
    let category = query
        .category
        .as_deref()
        .map(|raw| {
            raw.parse::<MenuCategory>().map_err(|_| {
                ServiceError::ValidationError(format!("category: unknown category {}", raw))
            })
        })
        .transpose()?;

    let items = state.services.catalog.list_menu_items(category).await?;
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    get,
    path = "/api/v1/menu/{id}",
    summary = "Get menu item",
    params(("id" = i32, Path, description = "Menu item id")),
    responses(
        (status = 200, description = "Menu item", body = ApiResponse<MenuItemView>),
        (status = 404, description = "Menu item not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Menu"
)]
pub async fn get_menu_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MenuItemView>>, ServiceError> {
    let item = state.services.catalog.get_menu_item(id).await?;
    Ok(Json(ApiResponse::success(item)))
}

#[utoipa::path(
    get,
    path = "/api/v1/menu/{id}/recipe",
    summary = "Get recipe",
    description = "Inventory units consumed by one unit of the menu item",
    params(("id" = i32, Path, description = "Menu item id")),
    responses(
        (status = 200, description = "Recipe lines", body = ApiResponse<Vec<RecipeLineView>>),
        (status = 404, description = "Menu item not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Menu"
)]
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<RecipeLineView>>>, ServiceError> {
    let recipe = state.services.catalog.recipe(id).await?;
    Ok(Json(ApiResponse::success(recipe)))
}

#[utoipa::path(
    post,
    path = "/api/v1/menu",
    summary = "Create menu item",
    request_body = CreateMenuItemRequest,
    responses(
        (status = 201, description = "Menu item created", body = ApiResponse<MenuItemWithRecipe>),
        (status = 400, description = "Invalid item or unknown ingredient", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already on the menu", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Menu"
)]
pub async fn create_menu_item(
    State(state): State<AppState>,
    Json(request): Json<CreateMenuItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MenuItemWithRecipe>>), ServiceError> {
    let created = state.services.catalog.create_menu_item(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

#[utoipa::path(
    patch,
    path = "/api/v1/menu/{id}",
    summary = "Update menu item",
    params(("id" = i32, Path, description = "Menu item id")),
    request_body = UpdateMenuItemRequest,
    responses(
        (status = 200, description = "Menu item updated", body = ApiResponse<MenuItemView>),
        (status = 400, description = "Invalid update", body = crate::errors::ErrorResponse),
        (status = 404, description = "Menu item not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already on the menu", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Menu"
)]
pub async fn update_menu_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateMenuItemRequest>,
) -> Result<Json<ApiResponse<MenuItemView>>, ServiceError> {
    let updated = state.services.catalog.update_menu_item(id, request).await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/menu/{id}",
    summary = "Delete menu item",
    params(("id" = i32, Path, description = "Menu item id")),
    responses(
        (status = 204, description = "Menu item deleted"),
        (status = 404, description = "Menu item not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Item appears on orders", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Menu"
)]
pub async fn delete_menu_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ServiceError> {
    state.services.catalog.delete_menu_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
