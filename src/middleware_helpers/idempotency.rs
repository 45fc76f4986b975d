use axum::{extract::FromRequestParts, http::request::Parts};

use crate::errors::ServiceError;

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";
const MAX_KEY_LEN: usize = 128;

/// Client supplied retry token taken from the `Idempotency-Key` header.
/// Absent header yields `None`; a malformed one is a validation error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdempotencyKey(pub Option<String>);

impl IdempotencyKey {
    pub fn parse(raw: &str) -> Result<String, ServiceError> {
        let key = raw.trim();
        if key.is_empty() || key.len() > MAX_KEY_LEN {
            return Err(ServiceError::ValidationError(format!(
                "{}: must be between 1 and {} characters",
                IDEMPOTENCY_KEY_HEADER, MAX_KEY_LEN
            )));
        }
        if !key.chars().all(|c| c.is_ascii_graphic()) {
            return Err(ServiceError::ValidationError(format!(
                "{}: must contain printable ASCII only",
                IDEMPOTENCY_KEY_HEADER
            )));
        }
        Ok(key.to_string())
    }

    pub fn into_inner(self) -> Option<String> {
        self.0
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for IdempotencyKey
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(IDEMPOTENCY_KEY_HEADER) else {
            return Ok(IdempotencyKey(None));
        };
        let raw = value.to_str().map_err(|_| {
            ServiceError::ValidationError(format!(
                "{}: must contain printable ASCII only",
                IDEMPOTENCY_KEY_HEADER
            ))
        })?;
        Ok(IdempotencyKey(Some(Self::parse(raw)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_accepts_uuid_like_keys() {
        assert_eq!(
            IdempotencyKey::parse("  7d9f-kiosk-2 ").unwrap(),
            "7d9f-kiosk-2"
        );
    }

    #[test]
    fn parse_rejects_empty_and_oversized_keys() {
        assert!(IdempotencyKey::parse("   ").is_err());
        assert!(IdempotencyKey::parse(&"k".repeat(MAX_KEY_LEN + 1)).is_err());
        assert!(IdempotencyKey::parse("has space").is_err());
    }
}
