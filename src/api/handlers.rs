use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::{RegisterOutcome, Session, REGISTER_TOKEN_ERROR};
use crate::errors::AppError;
use crate::health::ServingStatus;
use crate::models::{Account, NewAccount};
use crate::AppState;

pub const MESSAGE_OK: &str = "Success";
pub const MESSAGE_CREATED: &str = "Created New Resource";

// ── Request / Response DTOs ──────────────────────────────────

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct Envelope<T> {
    pub message: &'static str,
    pub data: T,
}

#[derive(Serialize)]
pub struct SessionData {
    pub token: Option<String>,
    pub user: Account,
}

#[derive(Serialize)]
pub struct UserData {
    pub user: Account,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: ServingStatus,
}

impl From<Session> for SessionData {
    fn from(s: Session) -> Self {
        Self {
            token: Some(s.token),
            user: s.account,
        }
    }
}

pub const IDEMPOTENCY_KEY: &str = "idempotency-key";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, header::AUTHORIZATION.as_str())
}

// ── Handlers ─────────────────────────────────────────────────

/// POST /v1/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewAccount>,
) -> Result<Response, AppError> {
    let resp = match state.auth.register(payload).await? {
        RegisterOutcome::Registered(session) => (
            StatusCode::CREATED,
            Json(Envelope {
                message: MESSAGE_CREATED,
                data: SessionData::from(session),
            }),
        )
            .into_response(),
        // The account exists now; report it and tell the caller to log in.
        RegisterOutcome::TokenIssuanceFailed { account } => (
            StatusCode::CREATED,
            Json(json!({
                "message": MESSAGE_CREATED,
                "data": SessionData { token: None, user: account },
                "error": {
                    "message": REGISTER_TOKEN_ERROR,
                    "type": "internal_error",
                    "code": "token_issuance_failed",
                }
            })),
        )
            .into_response(),
    };
    Ok(resp)
}

/// POST /v1/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Envelope<SessionData>>, AppError> {
    let session = state.auth.login(&payload.email, &payload.password).await?;
    Ok(Json(Envelope {
        message: MESSAGE_OK,
        data: session.into(),
    }))
}

/// POST /v1/auth/verify
pub async fn verify_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Envelope<UserData>>, AppError> {
    let user = state.auth.verify_token(authorization(&headers)).await?;
    Ok(Json(Envelope {
        message: MESSAGE_OK,
        data: UserData { user },
    }))
}

/// POST /v1/auth/logout
///
/// Clients retrying a logout whose response never arrived should resend the
/// same `Idempotency-Key`.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Envelope<serde_json::Value>>, AppError> {
    state
        .auth
        .logout(authorization(&headers), header_str(&headers, IDEMPOTENCY_KEY))
        .await?;
    Ok(Json(Envelope {
        message: MESSAGE_OK,
        data: json!({}),
    }))
}

/// GET /healthz: always 200, the body carries the verdict.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: state.health.check().await,
    })
}

/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.encode(),
    )
}
