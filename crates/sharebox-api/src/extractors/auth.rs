//! `AuthUser` extractor: the caller identity set by the fronting auth proxy.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use sharebox_core::error::AppError;

use crate::error::ApiError;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated user available in handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub Uuid);

impl AuthUser {
    /// The user id.
    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::authorization("Authentication required"))?;

        let id = Uuid::parse_str(raw.trim())
            .map_err(|_| AppError::authorization("Invalid user identity"))?;

        Ok(AuthUser(id))
    }
}
