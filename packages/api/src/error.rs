//! # Error taxonomy shared by guards, services and handlers
//!
//! | Variant | Status | Body |
//! |---------|--------|------|
//! | `Unauthenticated` | 401 | `Unauthorized` (page routes redirect instead, see the `web` crate) |
//! | `InvalidCredentials` | 401 | `Invalid credentials` |
//! | `Forbidden` | 403 | the reason |
//! | `NotFound` | 404 | the reason |
//! | `Conflict` | 409 | the reason |
//! | `BadRequest` | 400 | the reason |
//! | `Unexpected` | 500 | `Unexpected error occurred`; the detail is only logged |

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use store::StoreError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unexpected: {0}")]
    Unexpected(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn forbidden() -> Self {
        Self::Forbidden("Forbidden".into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound(format!("{entity} {id} not found")),
            StoreError::Conflict(reason) => Self::Conflict(reason),
            StoreError::Backend(reason) => Self::Unexpected(reason),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Unauthenticated => "Unauthorized".to_string(),
            Self::InvalidCredentials => "Invalid credentials".to_string(),
            Self::Forbidden(reason)
            | Self::NotFound(reason)
            | Self::Conflict(reason)
            | Self::BadRequest(reason) => reason,
            Self::Unexpected(detail) => {
                tracing::error!("Unexpected error: {}", detail);
                "Unexpected error occurred".to_string()
            }
        };
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_statuses() {
        let not_found: ApiError = StoreError::not_found("list", 3).into();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found, ApiError::NotFound("list 3 not found".into()));

        let conflict: ApiError = StoreError::Conflict("taken".into()).into();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let backend: ApiError = StoreError::Backend("socket closed".into()).into();
        assert_eq!(backend.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_unexpected_hides_detail() {
        let response = ApiError::Unexpected("password column missing".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
