use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::common::error::DomainError;

/// Control-socket error type.
///
/// Every non-200 response carries a single-line plain-text reason, which is
/// the wire contract the CLI client relays verbatim.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Forbidden(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(m) => (StatusCode::NOT_FOUND, m),
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            Self::Conflict(m) => (StatusCode::CONFLICT, m),
            Self::Forbidden(m) => (StatusCode::FORBIDDEN, m),
            Self::ServiceUnavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m),
            Self::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, message).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match &err {
            DomainError::NotFound(_) => Self::NotFound(err.to_string()),
            DomainError::DeviceExists(_) => Self::Conflict(err.to_string()),
            DomainError::UserMismatch { .. } | DomainError::Locked(_) => {
                Self::Forbidden(err.to_string())
            }
            DomainError::InvalidRule(_) => Self::BadRequest(err.to_string()),
            DomainError::TableError(_) | DomainError::TransportError(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}
