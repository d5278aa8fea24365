//! Caller identity extraction.
//!
//! Credential issuance and verification live outside this repository:
//! the fronting credential service validates the bearer token and
//! attaches the resulting opaque user identifier as the `x-user-id`
//! request header. The gateway only ever sees already-validated
//! identifiers; a request without one is rejected with 401 before any
//! handler runs.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use menagerie_types::UserId;
use uuid::Uuid;

use crate::error::GatewayError;

/// Header carrying the validated caller identifier.
pub const CALLER_HEADER: &str = "x-user-id";

/// The authenticated caller, extracted from [`CALLER_HEADER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub UserId);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts.headers.get(CALLER_HEADER).ok_or_else(|| {
            GatewayError::Unauthenticated(format!("missing {CALLER_HEADER} header"))
        })?;

        let text = value.to_str().map_err(|_| {
            GatewayError::Unauthenticated(format!("{CALLER_HEADER} header is not valid UTF-8"))
        })?;

        let id = Uuid::parse_str(text).map_err(|_| {
            GatewayError::Unauthenticated(format!("{CALLER_HEADER} header is not a UUID"))
        })?;

        Ok(Self(UserId::from(id)))
    }
}
