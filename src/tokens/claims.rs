use serde::{Deserialize, Serialize};

/// Claims carried by every session token.
///
/// Decoded once into this struct at validation time; a token whose payload
/// does not fit (missing field, wrong type) never reaches the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id in the user service.
    pub id: i64,
    /// Display name (login) or email (register) at issuance time.
    pub username: String,
    /// Expiry, Unix seconds.
    pub exp: i64,
    /// Unique token id; the revocation key.
    pub jti: String,
}

impl Claims {
    /// Seconds of life left at `now`; zero or negative once expired.
    pub fn remaining(&self, now: i64) -> i64 {
        self.exp.saturating_sub(now)
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.remaining(now) <= 0
    }
}
