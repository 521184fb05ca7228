use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::{AccessTokenClaims, JwtError};
use crate::db::Role;

/// The authenticated caller of an API request.
///
/// The auth middleware verifies the bearer token and stores its claims in the request
/// extensions; handlers take a `Session` argument to get at them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl Session {
    #[must_use]
    pub const fn is_manager(&self) -> bool {
        self.role.is_manager()
    }
}

impl TryFrom<&AccessTokenClaims> for Session {
    type Error = JwtError;

    fn try_from(claims: &AccessTokenClaims) -> Result<Self, Self::Error> {
        let user_id = claims.sub.parse::<i64>().map_err(|_| JwtError::InvalidToken)?;
        Ok(Self {
            user_id,
            username: claims.username.clone(),
            role: claims.role,
        })
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = JwtError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(JwtError::InvalidAuthorizationHeader)
    }
}
