//! Principal extraction from trusted gateway headers.
//!
//! The auth collaborator sits in front of this service and stamps each
//! request with `x-user-id` and `x-user-role`. The core trusts those
//! headers and never re-authenticates.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::{Principal, Role, UserId};
use uuid::Uuid;

use crate::error::ApiError;

/// Header carrying the authenticated user's UUID.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the authenticated user's role.
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Extractor for the authenticated principal.
#[derive(Debug, Clone, Copy)]
pub struct AuthPrincipal(pub Principal);

impl<S> FromRequestParts<S> for AuthPrincipal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header_value(parts, USER_ID_HEADER)?;
        let id = Uuid::parse_str(id)
            .map_err(|e| ApiError::Unauthorized(format!("invalid {USER_ID_HEADER}: {e}")))?;

        let role = header_value(parts, USER_ROLE_HEADER)?;
        let role = Role::parse(role)
            .ok_or_else(|| ApiError::Unauthorized(format!("invalid {USER_ROLE_HEADER}: {role}")))?;

        Ok(AuthPrincipal(Principal::new(UserId::from_uuid(id), role)))
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ApiError> {
    parts
        .headers
        .get(name)
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {name} header")))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized(format!("malformed {name} header")))
}
