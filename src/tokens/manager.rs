//! Token lifecycle: issue, validate, revoke.
//!
//! Tokens are HS256 JWTs carrying [`Claims`]. A token is usable while
//! `now < exp` and its `jti` has no revocation entry. Revocation entries live
//! in the [`RevocationStore`] under `token-blacklist:<jti>` with a TTL equal
//! to the token's remaining lifetime, so the store forgets them exactly when
//! the token would have died anyway.
//!
//! Every validation failure (bad structure, foreign algorithm, bad signature,
//! expired) collapses into [`TokenError::Invalid`] so callers cannot tell
//! them apart.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use uuid::Uuid;

use super::claims::Claims;
use super::clock::{Clock, SystemClock};
use crate::store::{RevocationStore, StoreError};

/// Key prefix for revocation entries.
pub const REVOCATION_NAMESPACE: &str = "token-blacklist";

/// Store key for a revoked `jti`.
pub fn revocation_key(jti: &str) -> String {
    format!("{}:{}", REVOCATION_NAMESPACE, jti)
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token")]
    Invalid,

    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("token expiry is not representable")]
    ExpiryOverflow,

    #[error(transparent)]
    Store(#[from] StoreError),
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

#[derive(Clone)]
pub struct TokenManager {
    keys: Arc<Keys>,
    ttl_secs: i64,
    store: Arc<dyn RevocationStore>,
    store_timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenManager {
    pub fn new(
        secret: &[u8],
        ttl: Duration,
        store: Arc<dyn RevocationStore>,
        store_timeout: Duration,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Only the HMAC family; anything else (RS*, ES*, none) is a downgrade attempt.
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        // exp is checked against the injected clock in `validate`.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret),
                decoding: DecodingKey::from_secret(secret),
                validation,
            }),
            ttl_secs: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
            store,
            store_timeout,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs.max(0) as u64)
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Mint a token for `subject_id` with a fresh `jti`, expiring `ttl` from now.
    pub fn issue(&self, subject_id: i64, subject_label: &str) -> Result<String, TokenError> {
        let exp = self
            .clock
            .now()
            .checked_add(self.ttl_secs)
            .ok_or(TokenError::ExpiryOverflow)?;

        let claims = Claims {
            id: subject_id,
            username: subject_label.to_string(),
            exp,
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.keys.encoding)?;
        tracing::debug!(subject_id, jti = %claims.jti, exp, "issued token");
        Ok(token)
    }

    /// Check algorithm, signature and expiry, and decode the claims.
    ///
    /// Revocation is a separate step: see [`TokenManager::is_revoked`].
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.keys.decoding, &self.keys.validation).map_err(
            |e| {
                tracing::debug!(error = %e, "token rejected");
                TokenError::Invalid
            },
        )?;
        let claims = data.claims;

        if claims.jti.is_empty() {
            tracing::debug!("token rejected: empty jti");
            return Err(TokenError::Invalid);
        }
        if claims.is_expired(self.clock.now()) {
            tracing::debug!(exp = claims.exp, "token rejected: expired");
            return Err(TokenError::Invalid);
        }

        Ok(claims)
    }

    /// Record `jti` as revoked until `exp`.
    ///
    /// A token that has already expired needs no entry; this is then a
    /// successful no-op and nothing is written.
    pub async fn revoke(&self, jti: &str, exp: i64) -> Result<(), TokenError> {
        self.revoke_with_tag(jti, exp, "").await
    }

    /// Like [`TokenManager::revoke`], storing `tag` as the entry value so a
    /// replay of the same logout can recognise its own write.
    pub async fn revoke_with_tag(&self, jti: &str, exp: i64, tag: &str) -> Result<(), TokenError> {
        let ttl = exp.saturating_sub(self.clock.now());
        if ttl <= 0 {
            tracing::debug!(jti, "skipping revocation of expired token");
            return Ok(());
        }

        let key = revocation_key(jti);
        self.bounded(self.store.set_ex(&key, tag, Duration::from_secs(ttl as u64)))
            .await?;
        tracing::info!(jti, ttl_secs = ttl, "token revoked");
        Ok(())
    }

    /// Whether `jti` has a live revocation entry. Store failures are returned,
    /// not swallowed; the caller decides how to treat them.
    pub async fn is_revoked(&self, jti: &str) -> Result<bool, StoreError> {
        Ok(self.revocation_tag(jti).await?.is_some())
    }

    /// The value of the live revocation entry for `jti`, if any.
    pub async fn revocation_tag(&self, jti: &str) -> Result<Option<String>, StoreError> {
        let key = revocation_key(jti);
        self.bounded(self.store.get(&key)).await
    }

    async fn bounded<T>(
        &self,
        op: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.store_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.store_timeout)),
        }
    }
}
