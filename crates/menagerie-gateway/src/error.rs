//! Error types for the gateway layer.
//!
//! [`GatewayError`] unifies all failure modes into a single enum that
//! renders as a JSON error body via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.
//! Authorization failures from the core map to 403, missing entities to
//! 404; persistence and delivery failures never surface here (they are
//! contained in the controller and the hub).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use menagerie_core::ActionError;
use menagerie_db::DbError;

/// Errors that can occur in the gateway layer.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The request carried no usable caller identity.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The authenticated caller is not allowed to perform the
    /// operation on this entity.
    #[error("forbidden: {source}")]
    Forbidden {
        /// The underlying authorization error.
        #[from]
        source: ActionError,
    },

    /// The requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request conflicts with existing state (e.g. a taken
    /// username).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The request was syntactically valid but unusable.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DbError> for GatewayError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::UsernameTaken { username } => {
                Self::Conflict(format!("username already exists: {username}"))
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden { source } => (StatusCode::FORBIDDEN, source.to_string()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
