/*!
 * # Employee Sessions
 *
 * Staff sign in through the identity provider; its callback exchanges the
 * provider's username for a short-lived HS256 token issued here. Every
 * request passes through [`session_middleware`], which turns a valid
 * `Bearer` token into an [`EmployeeSession`] request extension. Manager-only
 * routes are wrapped with [`require_manager`] via [`AuthRouterExt`].
 */

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{config::AppConfig, errors::ServiceError, services::employees::EmployeeView};

const ISSUER: &str = "feathers-pos";

/// Claim structure for session tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String, // employee id
    pub name: String,
    pub mgr: bool,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// The signed-in employee, attached to the request by [`session_middleware`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EmployeeSession {
    pub employee_id: i32,
    pub name: String,
    pub is_manager: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IssuedSession {
    pub token: String,
    pub token_type: String,
    /// Seconds until the token expires
    pub expires_in: i64,
    pub employee: EmployeeView,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingAuth,

    #[error("Invalid session token")]
    InvalidToken,

    #[error("Session has expired")]
    TokenExpired,

    #[error("Manager access required")]
    InsufficientPermissions,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingAuth | AuthError::InvalidToken | AuthError::TokenExpired => {
                ServiceError::Unauthorized(err.to_string())
            }
            AuthError::InsufficientPermissions => ServiceError::Forbidden(err.to_string()),
            AuthError::TokenCreation(msg) => ServiceError::InternalError(msg),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ServiceError::from(self).into_response()
    }
}

/// Signing material and lifetime for session tokens
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.session_secret,
            Duration::from_secs(config.session_ttl_secs),
        )
    }

    pub fn issue(&self, employee: EmployeeView) -> Result<IssuedSession, AuthError> {
        let now = Utc::now();
        let expires = now
            + ChronoDuration::from_std(self.ttl)
                .map_err(|_| AuthError::TokenCreation("Invalid session lifetime".to_string()))?;

        let claims = SessionClaims {
            sub: employee.id.to_string(),
            name: employee.name.clone(),
            mgr: employee.is_manager,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
            iss: ISSUER.to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok(IssuedSession {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.ttl.as_secs() as i64,
            employee,
        })
    }

    pub fn validate(&self, token: &str) -> Result<EmployeeSession, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);

        let claims = decode::<SessionClaims>(token, &self.decoding, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })?
            .claims;

        let employee_id = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;
        Ok(EmployeeSession {
            employee_id,
            name: claims.name,
            is_manager: claims.mgr,
        })
    }
}

/// Attaches an [`EmployeeSession`] when the request carries a valid bearer
/// token. Requests without an `Authorization` header pass through untouched;
/// a present but invalid token is rejected.
pub async fn session_middleware(
    State(keys): State<Arc<SessionKeys>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if let Some(value) = request.headers().get(header::AUTHORIZATION) {
        let token = value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .ok_or(AuthError::InvalidToken)?;
        let session = keys.validate(token)?;
        debug!(employee_id = session.employee_id, "session attached");
        request.extensions_mut().insert(session);
    }

    Ok(next.run(request).await)
}

/// Rejects requests without a manager session
pub async fn require_manager(request: Request, next: Next) -> Result<Response, AuthError> {
    let session = request
        .extensions()
        .get::<EmployeeSession>()
        .ok_or(AuthError::MissingAuth)?;
    if !session.is_manager {
        return Err(AuthError::InsufficientPermissions);
    }
    Ok(next.run(request).await)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for EmployeeSession
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<EmployeeSession>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Extension methods for Router to gate routes on the session
pub trait AuthRouterExt {
    fn manager_only(self) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn manager_only(self) -> Self {
        self.route_layer(axum::middleware::from_fn(require_manager))
    }
}
