use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::claims::AuthContext;
use crate::error::AppError;

/// Caller identity placed in the request by [`super::guard::require_auth`].
pub struct AuthUser(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .map(AuthUser)
            .ok_or(AppError::MissingCredentials)
    }
}
