use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    auth::{EmployeeSession, IssuedSession},
    errors::ServiceError,
    ApiResponse, AppState,
};

/// Build the session Router scoped under `/api/v1/sessions`.
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session))
        .route("/current", get(current_session))
}

/// Sent by the identity-provider callback once the provider has vouched for `username`
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SessionRequest {
    #[validate(length(min = 1, max = 64, message = "must be 1-64 characters"))]
    pub username: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/sessions",
    summary = "Issue employee session",
    request_body = SessionRequest,
    responses(
        (status = 201, description = "Session issued", body = ApiResponse<IssuedSession>),
        (status = 400, description = "Blank username", body = crate::errors::ErrorResponse),
        (status = 404, description = "No employee with that username", body = crate::errors::ErrorResponse),
    ),
    tag = "Sessions"
)]
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<SessionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<IssuedSession>>), ServiceError> {
    request.validate()?;
    let employee = state
        .services
        .employees
        .find_by_username(request.username.trim())
        .await?;
    let issued = state.sessions.issue(employee)?;

    info!(employee_id = issued.employee.id, "employee session issued");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(issued))))
}

#[utoipa::path(
    get,
    path = "/api/v1/sessions/current",
    summary = "Current session",
    responses(
        (status = 200, description = "The signed-in employee", body = ApiResponse<EmployeeSession>),
        (status = 401, description = "Not signed in", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Sessions"
)]
pub async fn current_session(
    session: EmployeeSession,
) -> Result<Json<ApiResponse<EmployeeSession>>, ServiceError> {
    Ok(Json(ApiResponse::success(session)))
}
