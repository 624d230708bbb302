//! HTTP/JSON client for the user service.
//!
//! Every call is a single attempt bounded by the configured timeout. Retries,
//! if wanted, belong to whoever calls the auth API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{IdentityClient, IdentityError};
use crate::models::{Account, NewAccount};

#[derive(Deserialize)]
struct UserEnvelope {
    data: UserData,
}

#[derive(Deserialize)]
struct UserData {
    user: Account,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    message: Option<String>,
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

#[derive(Deserialize)]
struct HealthBody {
    status: Option<String>,
}

#[derive(Serialize)]
struct CredentialRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Clone, Copy, PartialEq)]
enum Op {
    FindById,
    FindByCredential,
    Create,
}

pub struct HttpIdentityClient {
    base_url: String,
    http: Client,
}

impl HttpIdentityClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, IdentityError> {
        let http = Client::builder()
            .use_rustls_tls()
            .pool_max_idle_per_host(16)
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| IdentityError::Unavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_user(&self, op: Op, resp: reqwest::Response) -> Result<Account, IdentityError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(map_status(op, status, &body));
        }
        let envelope: UserEnvelope = resp.json().await.map_err(|e| IdentityError::Upstream {
            status: status.as_u16(),
            message: format!("malformed user payload: {}", e),
        })?;
        Ok(envelope.data.user)
    }
}

fn transport_error(e: reqwest::Error) -> IdentityError {
    if e.is_timeout() {
        tracing::warn!("user service request timed out");
        IdentityError::Unavailable("request timed out".to_string())
    } else {
        tracing::warn!("user service request failed: {}", e);
        IdentityError::Unavailable(e.to_string())
    }
}

fn map_status(op: Op, status: StatusCode, body: &str) -> IdentityError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .error
        .and_then(|e| e.message)
        .or(parsed.message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });

    match status {
        StatusCode::NOT_FOUND if op == Op::FindByCredential => {
            IdentityError::InvalidCredentials(message)
        }
        StatusCode::NOT_FOUND => IdentityError::NotFound(message),
        StatusCode::CONFLICT => IdentityError::AlreadyExists(message),
        StatusCode::UNAUTHORIZED => IdentityError::InvalidCredentials(message),
        _ => {
            tracing::warn!(status = status.as_u16(), "user service error: {}", message);
            IdentityError::Upstream {
                status: status.as_u16(),
                message,
            }
        }
    }
}

#[async_trait]
impl IdentityClient for HttpIdentityClient {
    async fn find_by_id(&self, id: i64) -> Result<Account, IdentityError> {
        let resp = self
            .http
            .get(self.url(&format!("/v1/users/{}", id)))
            .send()
            .await
            .map_err(transport_error)?;
        self.read_user(Op::FindById, resp).await
    }

    async fn find_by_credential(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Account, IdentityError> {
        let resp = self
            .http
            .post(self.url("/v1/users/credentials"))
            .json(&CredentialRequest { email, password })
            .send()
            .await
            .map_err(transport_error)?;
        self.read_user(Op::FindByCredential, resp).await
    }

    async fn create_account(&self, account: &NewAccount) -> Result<Account, IdentityError> {
        let resp = self
            .http
            .post(self.url("/v1/users"))
            .json(account)
            .send()
            .await
            .map_err(transport_error)?;
        self.read_user(Op::Create, resp).await
    }

    async fn health(&self) -> Result<(), IdentityError> {
        let resp = self
            .http
            .get(self.url("/healthz"))
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(IdentityError::Upstream {
                status: status.as_u16(),
                message: "health check failed".to_string(),
            });
        }

        // A 200 with an explicit NOT_SERVING body is still unhealthy.
        let body = resp.text().await.unwrap_or_default();
        if let Ok(HealthBody { status: Some(s) }) = serde_json::from_str::<HealthBody>(&body) {
            if s != "SERVING" {
                return Err(IdentityError::Unavailable(format!("user service reports {}", s)));
            }
        }
        Ok(())
    }
}
