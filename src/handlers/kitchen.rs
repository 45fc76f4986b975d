use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};

use crate::{
    errors::ServiceError,
    services::{
        kitchen::{FeedQuery, KitchenSnapshot},
        orders::OrderView,
    },
    ApiResponse, AppState,
};

/// Build the kitchen display Router scoped under `/api/v1/kitchen`.
pub fn kitchen_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(open_orders))
        .route("/feed", get(kitchen_feed))
}

#[utoipa::path(
    get,
    path = "/api/v1/kitchen/orders",
    summary = "Open orders",
    description = "Every order not yet done, oldest first",
    responses(
        (status = 200, description = "Open orders", body = ApiResponse<Vec<OrderView>>),
    ),
    tag = "Kitchen"
)]
pub async fn open_orders(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<OrderView>>>, ServiceError> {
    let orders = state.services.kitchen.open_orders().await?;
    Ok(Json(ApiResponse::success(orders)))
}

#[utoipa::path(
    get,
    path = "/api/v1/kitchen/feed",
    summary = "Kitchen long-poll",
    description = "Answers at once when the feed version has moved past `since`, otherwise \
                   waits up to `wait_secs` for an order to be placed, extended or completed.",
    params(FeedQuery),
    responses(
        (status = 200, description = "Feed snapshot", body = ApiResponse<KitchenSnapshot>),
    ),
    tag = "Kitchen"
)]
pub async fn kitchen_feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<ApiResponse<KitchenSnapshot>>, ServiceError> {
    let snapshot = state.services.kitchen.poll(query).await?;
    Ok(Json(ApiResponse::success(snapshot)))
}
