use std::time::Duration;

use zeroize::Zeroizing;

const PLACEHOLDER_SECRET: &str = "CHANGE_ME_JWT_SECRET";

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    /// Revocation store. `memory://` selects the in-process store.
    pub redis_url: String,
    /// Base URL of the user service.
    pub user_service_url: String,
    /// HMAC secret for session tokens. Never logged.
    pub jwt_secret: Zeroizing<String>,
    /// Token lifetime. Set via JWT_EXPIRY_SECONDS. Default: 3600.
    pub jwt_expiry: Duration,
    /// Upper bound on every outbound call (Redis, user service, health probes).
    /// Set via DEPENDENCY_TIMEOUT_SECONDS. Default: 5.
    pub dependency_timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("redis_url", &self.redis_url)
            .field("user_service_url", &self.user_service_url)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_expiry", &self.jwt_expiry)
            .field("dependency_timeout", &self.dependency_timeout)
            .finish()
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok())
}

/// Build a config from an arbitrary variable source.
pub fn from_lookup<F>(get: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let jwt_secret = get("JWT_SECRET")
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| PLACEHOLDER_SECRET.into());

    if jwt_secret == PLACEHOLDER_SECRET {
        let env_mode = get("AUTHGATE_ENV")
            .or_else(|| get("RUST_ENV"))
            .unwrap_or_default();
        if env_mode == "production" {
            anyhow::bail!(
                "JWT_SECRET is not set. Set a strong random secret before running in production."
            );
        }
        tracing::warn!("JWT_SECRET is not set, using insecure placeholder. Set a strong secret for production.");
    }

    let jwt_expiry_secs: u64 = parse_or(&get, "JWT_EXPIRY_SECONDS", 3600)?;
    if jwt_expiry_secs == 0 {
        anyhow::bail!("JWT_EXPIRY_SECONDS must be greater than zero");
    }
    let timeout_secs: u64 = parse_or(&get, "DEPENDENCY_TIMEOUT_SECONDS", 5)?;
    if timeout_secs == 0 {
        anyhow::bail!("DEPENDENCY_TIMEOUT_SECONDS must be greater than zero");
    }

    Ok(Config {
        port: parse_or(&get, "AUTHGATE_PORT", 5001)?,
        redis_url: get("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".into()),
        user_service_url: get("USER_SERVICE_URL")
            .unwrap_or_else(|| "http://localhost:5000".into()),
        jwt_secret: Zeroizing::new(jwt_secret),
        jwt_expiry: Duration::from_secs(jwt_expiry_secs),
        dependency_timeout: Duration::from_secs(timeout_secs),
    })
}

fn parse_or<F, T>(get: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid value for {}: {:?}", key, raw)),
    }
}
