//! Request-scoped identity.
//!
//! The identity provider is external: it authenticates users and hands them
//! a session token whose subject is their user id. Requests carry that token
//! on the `Authorization: Bearer` header, and these extractors resolve it to
//! a [`AuthUser`] that handlers pass onward explicitly. Swapping in a
//! different token scheme only touches [`parse_token`].

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::ApiError;

/// The authenticated caller. Extraction fails with 401 when credentials are
/// missing or malformed.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
}

/// Identity for routes that also serve anonymous callers. Absent credentials
/// yield `None`; present-but-malformed credentials are still rejected.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl MaybeAuthUser {
    pub fn user_id(&self) -> Option<Uuid> {
        self.0.map(|user| user.id)
    }

    pub fn require(&self) -> Result<Uuid, ApiError> {
        self.user_id().ok_or(ApiError::Unauthenticated)
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn parse_token(token: &str) -> Result<AuthUser, ApiError> {
    let id = Uuid::parse_str(token.trim()).map_err(|_| ApiError::Unauthenticated)?;
    Ok(AuthUser { id })
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthenticated)?;
        parse_token(token)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            None => Ok(Self(None)),
            Some(token) => Ok(Self(Some(parse_token(token)?))),
        }
    }
}
