use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use utoipa::IntoParams;

use crate::{
    auth::AuthRouterExt,
    errors::ServiceError,
    handlers::{parse_date, parse_date_time},
    services::analytics::{IngredientUsage, SalesSummary, XReport},
    ApiResponse, AppState,
};

/// Build the analytics Router scoped under `/api/v1/analytics`. Managers only.
pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/summary", get(get_summary))
        .route("/sales-per-hour", get(get_sales_per_hour))
        .route("/product-usage", get(get_product_usage))
        .route("/x-report", get(get_x_report))
        .manager_only()
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DateQuery {
    /// Business date, `YYYY-MM-DD`
    pub date: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct UsageQuery {
    /// Inclusive start, `YYYY-MM-DDTHH:MM:SS`
    pub start: String,
    /// Inclusive end, `YYYY-MM-DDTHH:MM:SS`
    pub end: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/summary",
    summary = "Sales summary",
    description = "Total sales, top customers and items, orders per employee and the busiest hour",
    responses(
        (status = 200, description = "Summary", body = ApiResponse<SalesSummary>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Analytics"
)]
pub async fn get_summary(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SalesSummary>>, ServiceError> {
    let summary = state.services.analytics.summary().await?;
    Ok(Json(ApiResponse::success(summary)))
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/sales-per-hour",
    summary = "Sales per hour",
    description = "Hour of day to sales total; hours without orders are omitted",
    params(DateQuery),
    responses(
        (status = 200, description = "Hourly totals", body = ApiResponse<BTreeMap<u32, Decimal>>),
        (status = 400, description = "Malformed date", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Analytics"
)]
pub async fn get_sales_per_hour(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> Result<Json<ApiResponse<BTreeMap<u32, Decimal>>>, ServiceError> {
    let date = parse_date("date", &query.date)?;
    let hourly = state.services.analytics.sales_per_hour(date).await?;
    Ok(Json(ApiResponse::success(hourly)))
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/product-usage",
    summary = "Ingredient usage",
    description = "Inventory units consumed by orders placed within the range, largest first",
    params(UsageQuery),
    responses(
        (status = 200, description = "Usage per inventory item", body = ApiResponse<Vec<IngredientUsage>>),
        (status = 400, description = "Malformed or inverted range", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Analytics"
)]
pub async fn get_product_usage(
    State(state): State<AppState>,
    Query(query): Query<UsageQuery>,
) -> Result<Json<ApiResponse<Vec<IngredientUsage>>>, ServiceError> {
    let start = parse_date_time("start", &query.start)?;
    let end = parse_date_time("end", &query.end)?;
    let usage = state.services.analytics.product_usage(start, end).await?;
    Ok(Json(ApiResponse::success(usage)))
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/x-report",
    summary = "X report",
    description = "Order count, sales total and hourly breakdown for one business date",
    params(DateQuery),
    responses(
        (status = 200, description = "X report", body = ApiResponse<XReport>),
        (status = 400, description = "Malformed date", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Analytics"
)]
pub async fn get_x_report(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> Result<Json<ApiResponse<XReport>>, ServiceError> {
    let date = parse_date("date", &query.date)?;
    let report = state.services.analytics.x_report(date).await?;
    Ok(Json(ApiResponse::success(report)))
}
