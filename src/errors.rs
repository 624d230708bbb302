use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::identity::IdentityError;
use crate::store::StoreError;
use crate::tokens::TokenError;

pub const MESSAGE_UNAUTHENTICATED: &str = "Unauthenticated";
pub const MESSAGE_INTERNAL: &str = "Internal Server Error";

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing/malformed header, bad/expired/revoked token, or a failed
    /// revocation check. Deliberately carries no detail.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Rejected by the user service; its message is passed through.
    #[error("unauthenticated: {0}")]
    InvalidCredentials(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("user service error: {0}")]
    Upstream(String),

    #[error("revocation store error: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<IdentityError> for AppError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::NotFound(m) => AppError::NotFound(m),
            IdentityError::AlreadyExists(m) => AppError::AlreadyExists(m),
            IdentityError::InvalidCredentials(m) => AppError::InvalidCredentials(m),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Invalid => AppError::Unauthenticated,
            TokenError::Store(s) => AppError::Store(s),
            other => AppError::Internal(anyhow::anyhow!(other)),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated | AppError::InvalidCredentials(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::AlreadyExists(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(_) | AppError::Store(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, code, msg) = match &self {
            AppError::Unauthenticated => (
                "authentication_error",
                "unauthenticated",
                MESSAGE_UNAUTHENTICATED.to_string(),
            ),
            AppError::InvalidCredentials(m) => {
                ("authentication_error", "unauthenticated", m.clone())
            }
            AppError::AlreadyExists(m) => ("invalid_request_error", "already_exists", m.clone()),
            AppError::NotFound(m) => ("invalid_request_error", "not_found", m.clone()),
            AppError::Upstream(e) => {
                tracing::error!("User service error: {}", e);
                ("internal_error", "internal", MESSAGE_INTERNAL.to_string())
            }
            AppError::Store(e) => {
                tracing::error!("Revocation store error: {}", e);
                ("internal_error", "internal", MESSAGE_INTERNAL.to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                ("internal_error", "internal", MESSAGE_INTERNAL.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "code": code,
            }
        }));

        (status, body).into_response()
    }
}
