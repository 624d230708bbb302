use std::sync::Arc;

use crate::auth::bearer::extract_bearer;
use crate::errors::AppError;
use crate::identity::IdentityClient;
use crate::models::{Account, NewAccount};
use crate::tokens::{Claims, TokenManager};

/// Longest accepted `Idempotency-Key`; longer keys are ignored.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

pub const REGISTER_TOKEN_ERROR: &str = "User successfully registered, but there was a problem creating the authentication token. Please try manual login.";

/// A freshly minted token together with the account it was minted for.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub account: Account,
}

/// Register can half-succeed: once the user service has created the account
/// it exists regardless of what happens to the token.
#[derive(Debug, Clone)]
pub enum RegisterOutcome {
    Registered(Session),
    TokenIssuanceFailed { account: Account },
}

/// The four authentication flows.
///
/// VerifyToken and Logout share one prefix, evaluated cheapest first: header
/// extraction, then signature/expiry, then the revocation lookup. Nothing
/// touches the store or the user service until the token has proven itself.
#[derive(Clone)]
pub struct AuthService {
    identity: Arc<dyn IdentityClient>,
    tokens: TokenManager,
}

impl AuthService {
    pub fn new(identity: Arc<dyn IdentityClient>, tokens: TokenManager) -> Self {
        Self { identity, tokens }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub async fn register(&self, new_account: NewAccount) -> Result<RegisterOutcome, AppError> {
        let account = self
            .identity
            .create_account(&new_account)
            .await
            .map_err(|e| {
                tracing::warn!(email = %new_account.email, "account creation failed: {}", e);
                AppError::from(e)
            })?;

        match self.tokens.issue(account.id, &account.email) {
            Ok(token) => {
                tracing::info!(account_id = account.id, "account registered");
                Ok(RegisterOutcome::Registered(Session { token, account }))
            }
            Err(e) => {
                tracing::error!(
                    account_id = account.id,
                    error = %e,
                    "account created but token issuance failed"
                );
                Ok(RegisterOutcome::TokenIssuanceFailed { account })
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let account = self
            .identity
            .find_by_credential(email, password)
            .await
            .map_err(|e| {
                tracing::info!(email, "login rejected: {}", e);
                AppError::from(e)
            })?;

        // Nothing was changed upstream, so a mint failure is a plain auth failure.
        let token = self.tokens.issue(account.id, &account.name).map_err(|e| {
            tracing::error!(account_id = account.id, error = %e, "token issuance failed");
            AppError::Unauthenticated
        })?;

        tracing::info!(account_id = account.id, "login succeeded");
        Ok(Session { token, account })
    }

    /// Returns the account as it is now, not as it was when the token was minted.
    pub async fn verify_token(&self, authorization: Option<&str>) -> Result<Account, AppError> {
        let claims = self.authenticate(authorization).await?;

        self.identity.find_by_id(claims.id).await.map_err(|e| {
            tracing::warn!(account_id = claims.id, "account lookup failed: {}", e);
            AppError::Upstream(e.to_string())
        })
    }

    /// Revoke the presented token.
    ///
    /// The revoke write is awaited inline: dropping the request future drops
    /// the write with it. A caller whose first attempt was cut off after the
    /// write landed can resend with the same `idempotency_key`; the stored tag
    /// then matches and the replay succeeds. Any other repeat is rejected.
    pub async fn logout(
        &self,
        authorization: Option<&str>,
        idempotency_key: Option<&str>,
    ) -> Result<(), AppError> {
        let claims = self.parse(authorization)?;
        let key = idempotency_key.filter(|k| !k.is_empty() && k.len() <= MAX_IDEMPOTENCY_KEY_LEN);

        match self.revocation_tag(&claims).await? {
            None => {}
            Some(tag) if key == Some(tag.as_str()) => {
                tracing::info!(jti = %claims.jti, "logout replay, token already revoked by this request");
                return Ok(());
            }
            Some(_) => {
                tracing::debug!(jti = %claims.jti, "token is revoked");
                return Err(AppError::Unauthenticated);
            }
        }

        self.tokens
            .revoke_with_tag(&claims.jti, claims.exp, key.unwrap_or(""))
            .await?;
        Ok(())
    }

    async fn authenticate(&self, authorization: Option<&str>) -> Result<Claims, AppError> {
        let claims = self.parse(authorization)?;
        match self.revocation_tag(&claims).await? {
            None => Ok(claims),
            Some(_) => {
                tracing::debug!(jti = %claims.jti, "token is revoked");
                Err(AppError::Unauthenticated)
            }
        }
    }

    fn parse(&self, authorization: Option<&str>) -> Result<Claims, AppError> {
        let token = extract_bearer(authorization).ok_or_else(|| {
            tracing::debug!("missing or malformed authorization header");
            AppError::Unauthenticated
        })?;
        Ok(self.tokens.validate(token)?)
    }

    /// Revocation lookup. A store error fails closed.
    async fn revocation_tag(&self, claims: &Claims) -> Result<Option<String>, AppError> {
        self.tokens.revocation_tag(&claims.jti).await.map_err(|e| {
            tracing::warn!(jti = %claims.jti, error = %e, "revocation check failed, rejecting token");
            AppError::Unauthenticated
        })
    }
}
