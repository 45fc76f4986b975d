use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    auth::EmployeeSession,
    errors::ServiceError,
    handlers::parse_date,
    middleware_helpers::IdempotencyKey,
    services::{
        order_status::CompletionOutcome,
        orders::{KitchenLineView, OrderLineRequest, OrderReceipt, OrderView, PlaceOrderRequest},
    },
    ApiResponse, AppState,
};

/// Build the orders Router scoped under `/api/v1/orders`.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(place_order))
        .route("/completed", get(list_completed_orders))
        .route("/:id", get(get_order))
        .route("/:id/items", get(get_order_items).post(add_order_item))
        .route("/:id/complete", post(complete_order))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CompletedQuery {
    /// Business date, `YYYY-MM-DD`
    pub date: String,
}

/// Folds the header key, the body key and the signed-in employee into the
/// request the service sees.
fn prepare_request(
    mut request: PlaceOrderRequest,
    header_key: IdempotencyKey,
    session: Option<&EmployeeSession>,
) -> Result<PlaceOrderRequest, ServiceError> {
    match (header_key.into_inner(), request.idempotency_key.as_deref()) {
        (Some(header), Some(body)) if IdempotencyKey::parse(body)? != header => {
            return Err(ServiceError::ValidationError(
                "idempotency_key: header and body keys differ".to_string(),
            ));
        }
        (Some(header), _) => request.idempotency_key = Some(header),
        (None, _) => {}
    }

    if request.employee_id.is_none() {
        request.employee_id = session.map(|s| s.employee_id);
    }
    Ok(request)
}

#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Place order",
    description = "Resolves the customer, writes the order and its lines, and consumes every \
                   ingredient the lines need, all in one transaction. Retrying with the same \
                   Idempotency-Key returns the original order.",
    request_body = PlaceOrderRequest,
    params(
        ("Idempotency-Key" = Option<String>, Header, description = "Client retry token"),
    ),
    responses(
        (status = 201, description = "Order placed", body = ApiResponse<OrderReceipt>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 200, description = "Replay of an earlier placement", body = ApiResponse<OrderReceipt>),
        (status = 400, description = "Invalid cart", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown customer, employee or menu item", body = crate::errors::ErrorResponse),
        (status = 409, description = "Idempotency key reused with a different request", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn place_order(
    State(state): State<AppState>,
    session: Option<EmployeeSession>,
    idempotency_key: IdempotencyKey,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderReceipt>>), ServiceError> {
    let request = prepare_request(request, idempotency_key, session.as_ref())?;
    let receipt = state.services.orders.place_order(request).await?;

    let status = if receipt.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(ApiResponse::success(receipt))))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/completed",
    summary = "Completed orders",
    description = "Orders marked done on the given date, with their lines",
    params(CompletedQuery),
    responses(
        (status = 200, description = "Completed orders", body = ApiResponse<Vec<OrderView>>),
        (status = 400, description = "Malformed date", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn list_completed_orders(
    State(state): State<AppState>,
    Query(query): Query<CompletedQuery>,
) -> Result<Json<ApiResponse<Vec<OrderView>>>, ServiceError> {
    let date = parse_date("date", &query.date)?;
    let orders = state.services.orders.completed_orders(date).await?;
    Ok(Json(ApiResponse::success(orders)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with lines", body = ApiResponse<OrderView>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<OrderView>>, ServiceError> {
    let order = state.services.orders.get_order(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/items",
    summary = "Order ticket lines",
    description = "Lines flattened the way the kitchen ticket prints them",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Ticket lines", body = ApiResponse<Vec<KitchenLineView>>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn get_order_items(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<KitchenLineView>>>, ServiceError> {
    let lines = state.services.orders.order_lines(id).await?;
    Ok(Json(ApiResponse::success(lines)))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/items",
    summary = "Add order line",
    description = "Appends a line to an open order and consumes its ingredients",
    params(("id" = i32, Path, description = "Order id")),
    request_body = OrderLineRequest,
    responses(
        (status = 201, description = "Line added", body = ApiResponse<OrderReceipt>),
        (status = 400, description = "Invalid line or order already done", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order or menu item not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn add_order_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(line): Json<OrderLineRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderReceipt>>), ServiceError> {
    let receipt = state.services.orders.add_line(id, line).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(receipt))))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/complete",
    summary = "Mark order done",
    description = "Moves the order off the kitchen display. Repeating the call is harmless.",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order is done", body = ApiResponse<CompletionOutcome>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn complete_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<CompletionOutcome>>, ServiceError> {
    let outcome = state.services.order_status.mark_done(id).await?;
    Ok(Json(ApiResponse::success(outcome)))
}
