use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use chrono::DateTime;
use serde::Deserialize;
use serde_json::json;
use sha2::Digest;
use thiserror::Error;

use crate::auth;
use crate::auth::{JwtError, TokenResponse};
use crate::core;
use crate::core::DbError;
use crate::db;
use crate::db::{NewRefreshToken, User};
use crate::services::audit::{self, DomainAuditEvent};

#[derive(Deserialize)]
pub struct Login {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshTokenRequest {
    refresh_token: String,
}

#[derive(Deserialize)]
pub struct RevokeTokenRequest {
    refresh_token: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("JWT error: {0}")]
    JwtError(#[from] JwtError),

    #[error("Password error: {0}")]
    PasswordHashingError(#[from] argon2::password_hash::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DbError),

    #[error("Token expired or invalid")]
    TokenInvalid,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        tracing::error!(
            error_type = %std::any::type_name::<Self>(),
            error_message = %self);

        #[allow(clippy::match_same_arms)]
        let (status, error_message) = match self {
            Self::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::JwtError(ref e) if !e.is_client_error() => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            Self::JwtError(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::PasswordHashingError(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            Self::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            Self::TokenInvalid => (StatusCode::UNAUTHORIZED, self.to_string()),
        };

        let body = Json(json!({
            "result": "error",
            "message": error_message
        }));

        (status, body).into_response()
    }
}

fn hash_token(token: &str) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(token);
    format!("{:x}", hasher.finalize())
}

fn user_json(user: &User) -> serde_json::Value {
    json!({
        "id": user.id,
        "username": user.username,
        "role": user.role,
    })
}

/// Login route
pub async fn login(State(context): State<core::ArcContext>, Json(login): Json<Login>) -> Result<impl IntoResponse, AuthError> {
    tracing::info!("Logging in user: {}", login.username);

    let user = match db::get_user_by_name(&context.db, &login.username).await {
        Ok(user) => user,
        Err(e) if e.is_not_found() => {
            audit::log_domain_event(&DomainAuditEvent::LoginFailed { username: login.username });
            return Err(AuthError::InvalidCredentials);
        }
        Err(e) => return Err(e.into()),
    };

    // Accounts without a password cannot log in
    let verified = match user.password_hash.as_deref() {
        Some(hash) => auth::verify_password(&login.password, Some(hash))?,
        None => false,
    };
    if !verified {
        audit::log_domain_event(&DomainAuditEvent::LoginFailed { username: login.username });
        return Err(AuthError::InvalidCredentials);
    }

    let access_token = auth::generate_access_token(&context.jwt, user.id, &user.username, user.role)?;
    let refresh_token = auth::generate_refresh_token(&context.jwt, user.id)?;

    // store refresh token in database
    let refresh_claims = auth::decode_refresh_token(&context.jwt, &refresh_token)?;
    let expires_at = DateTime::from_timestamp(refresh_claims.exp, 0).ok_or(AuthError::TokenInvalid)?;
    let new_refresh_token = NewRefreshToken {
        jti: refresh_claims.jti,
        user_id: user.id,
        token_hash: hash_token(&refresh_token),
        expires_at: expires_at.naive_utc(),
    };
    db::create_refresh_token(&context.db, new_refresh_token).await?;

    let token_response = TokenResponse::new(&context.jwt, access_token, refresh_token);
    Ok(Json(json!({
        "result": "ok",
        "tokens": token_response,
        "user": user_json(&user),
    })))
}

/// Logout route, revokes every refresh token of the caller
pub async fn logout(State(context): State<core::ArcContext>, headers: HeaderMap) -> Result<impl IntoResponse, AuthError> {
    let claims = auth::decode_access_token_from_headers(&context.jwt, &headers)?;
    tracing::info!(user_id = claims.sub, username = claims.username, "Logout");

    let user_id = claims.sub.parse::<i64>().map_err(|_| AuthError::TokenInvalid)?;
    let revoked = db::revoke_all_refresh_tokens_for_user(&context.db, user_id).await?;
    tracing::debug!(user_id, revoked, "Revoked refresh tokens");

    Ok(Json(json!({"result": "ok"})))
}

/// Route to refresh access token using refresh token
pub async fn refresh_access_token(
    State(context): State<core::ArcContext>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    tracing::info!("Refreshing access token");

    let refresh_claims =
        auth::decode_refresh_token(&context.jwt, &request.refresh_token).map_err(|_| AuthError::TokenInvalid)?;

    // Check if refresh token exists in database and is not revoked
    let stored_token = db::get_refresh_token_by_jti(&context.db, &refresh_claims.jti)
        .await
        .map_err(|_| AuthError::TokenInvalid)?;
    if stored_token.token_hash != hash_token(&request.refresh_token) {
        return Err(AuthError::TokenInvalid);
    }

    // The role is read again so a changed role takes effect on refresh
    let user = db::get_user_by_id(&context.db, stored_token.user_id).await?;
    let new_access_token = auth::generate_access_token(&context.jwt, user.id, &user.username, user.role)?;

    Ok(Json(json!({
        "result": "ok",
        "access_token": new_access_token,
        "expires_in": context.jwt.access_token_expiry,
        "user": user_json(&user),
    })))
}

/// Route to revoke a refresh token
pub async fn revoke_token(
    State(context): State<core::ArcContext>,
    Json(request): Json<RevokeTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    tracing::info!("Revoking refresh token");

    let refresh_claims =
        auth::decode_refresh_token(&context.jwt, &request.refresh_token).map_err(|_| AuthError::TokenInvalid)?;
    db::revoke_refresh_token(&context.db, &refresh_claims.jti).await?;
    Ok(Json(json!({"result": "ok"})))
}
