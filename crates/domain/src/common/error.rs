use thiserror::Error;

use crate::routes::error::RouteError;

/// Top-level error surfaced by the controller to the control plane.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid rule: {0}")]
    InvalidRule(#[from] RouteError),

    #[error("device {0} already registered")]
    DeviceExists(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("device {device} does not belong to user {user}")]
    UserMismatch { device: String, user: String },

    #[error("account {0} is locked")]
    Locked(String),

    #[error("table error: {0}")]
    TableError(String),

    #[error("transport error: {0}")]
    TransportError(String),
}
