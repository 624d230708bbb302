//! authgate: session-token issuance and revocation in front of a user service.
//!
//! The binary in `main.rs` wires these modules together; integration tests in
//! `tests/` use them directly with in-process fakes.

use std::sync::Arc;

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod health;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod store;
pub mod tokens;

use auth::AuthService;
use health::HealthAggregator;
use identity::IdentityClient;
use middleware::metrics::Metrics;
use store::RevocationStore;
use tokens::TokenManager;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub auth: AuthService,
    pub health: HealthAggregator,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Wire the core from configuration and already-connected dependencies.
    pub fn new(
        cfg: &config::Config,
        store: Arc<dyn RevocationStore>,
        identity: Arc<dyn IdentityClient>,
    ) -> anyhow::Result<Self> {
        let tokens = TokenManager::new(
            cfg.jwt_secret.as_bytes(),
            cfg.jwt_expiry,
            store.clone(),
            cfg.dependency_timeout,
        );
        Self::from_parts(
            AuthService::new(identity.clone(), tokens),
            store,
            identity,
            cfg.dependency_timeout,
        )
    }

    /// Build around an existing [`AuthService`], e.g. one running on a manual clock.
    pub fn from_parts(
        auth: AuthService,
        store: Arc<dyn RevocationStore>,
        identity: Arc<dyn IdentityClient>,
        health_timeout: std::time::Duration,
    ) -> anyhow::Result<Self> {
        let metrics = Arc::new(Metrics::new()?);
        let health = HealthAggregator::new(store, identity, metrics.service_health(), health_timeout);
        Ok(Self {
            auth,
            health,
            metrics,
        })
    }
}
