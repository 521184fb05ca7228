use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use thiserror::Error;

use crate::auth::JwtError;
use crate::core::DbError;
use crate::services::invoices::BillingError;
use crate::services::maintenance::TicketError;
use crate::services::payments::PaymentError;

/// Error returned by every API handler.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    DuplicateInvoice(String),

    #[error("{0}")]
    InvalidReading(String),

    #[error("{0}")]
    InvalidAmount(String),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Authentication failed: {0}")]
    Unauthorized(#[from] JwtError),

    #[error("{0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(DbError),
}

impl ApiError {
    #[must_use]
    pub fn forbidden() -> Self {
        Self::Forbidden("You are not allowed to perform this action".to_string())
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::DuplicateInvoice(_)
            | Self::InvalidReading(_)
            | Self::InvalidAmount(_)
            | Self::InvalidTransition(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(e) if !e.is_client_error() => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(
                error_type = %std::any::type_name::<Self>(),
                error_message = %self);
        } else {
            tracing::warn!(
                error_type = %std::any::type_name::<Self>(),
                error_message = %self);
        }

        // Store details stay in the log
        let message = if status.is_server_error() { "Internal server error".to_string() } else { self.to_string() };
        let body = Json(json!({
            "result": "error",
            "message": message
        }));

        (status, body).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(error: DbError) -> Self {
        match error {
            DbError::RowNotFound(_) => Self::NotFound("Resource not found".to_string()),
            DbError::UniqueViolation(_) => Self::Validation("A record with the same key already exists".to_string()),
            other => Self::Database(other),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        DbError::from(error).into()
    }
}

impl From<BillingError> for ApiError {
    fn from(error: BillingError) -> Self {
        match error {
            BillingError::Validation(_) => Self::Validation(error.to_string()),
            BillingError::Duplicate { .. } => Self::DuplicateInvoice(error.to_string()),
            BillingError::InvalidReading { .. } => Self::InvalidReading(error.to_string()),
            BillingError::Database(e) => e.into(),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(error: PaymentError) -> Self {
        match error {
            PaymentError::InvalidAmount(_) => Self::InvalidAmount(error.to_string()),
            PaymentError::Validation(message) => Self::Validation(message),
            PaymentError::Database(e) => e.into(),
        }
    }
}

impl From<TicketError> for ApiError {
    fn from(error: TicketError) -> Self {
        match error {
            TicketError::Validation(message) => Self::Validation(message),
            TicketError::InvalidTransition { .. } => Self::InvalidTransition(error.to_string()),
            TicketError::Forbidden(message) => Self::Forbidden(message),
            TicketError::Database(e) => e.into(),
        }
    }
}
