//! Composite health: SERVING only when both the revocation store and the
//! user service answer their health checks within the timeout.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use prometheus::IntGauge;
use serde::{Deserialize, Serialize};

use crate::identity::IdentityClient;
use crate::store::RevocationStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServingStatus {
    Serving,
    NotServing,
}

impl ServingStatus {
    pub fn is_serving(self) -> bool {
        self == ServingStatus::Serving
    }
}

impl fmt::Display for ServingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServingStatus::Serving => f.write_str("SERVING"),
            ServingStatus::NotServing => f.write_str("NOT_SERVING"),
        }
    }
}

pub struct HealthAggregator {
    store: Arc<dyn RevocationStore>,
    identity: Arc<dyn IdentityClient>,
    gauge: IntGauge,
    timeout: Duration,
}

impl HealthAggregator {
    pub fn new(
        store: Arc<dyn RevocationStore>,
        identity: Arc<dyn IdentityClient>,
        gauge: IntGauge,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            identity,
            gauge,
            timeout,
        }
    }

    /// Probe both dependencies and publish the result on the gauge.
    /// Never fails: any error or timeout just means NOT_SERVING.
    pub async fn check(&self) -> ServingStatus {
        let (store, identity) = tokio::join!(
            tokio::time::timeout(self.timeout, self.store.health()),
            tokio::time::timeout(self.timeout, self.identity.health()),
        );

        let store_ok = match store {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "revocation store health check failed");
                false
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "revocation store health check timed out");
                false
            }
        };
        let identity_ok = match identity {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "user service health check failed");
                false
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "user service health check timed out");
                false
            }
        };

        let status = if store_ok && identity_ok {
            ServingStatus::Serving
        } else {
            ServingStatus::NotServing
        };

        self.gauge.set(if status.is_serving() { 1 } else { 0 });
        tracing::info!(%status, "overall health status");
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityError;
    use crate::models::{Account, NewAccount};
    use crate::store::{MemoryStore, StoreError};
    use async_trait::async_trait;

    enum Behaviour {
        Healthy,
        Failing,
        Stalled,
    }

    struct StubIdentity(Behaviour);

    #[async_trait]
    impl IdentityClient for StubIdentity {
        async fn find_by_id(&self, _id: i64) -> Result<Account, IdentityError> {
            unreachable!()
        }
        async fn find_by_credential(&self, _e: &str, _p: &str) -> Result<Account, IdentityError> {
            unreachable!()
        }
        async fn create_account(&self, _a: &NewAccount) -> Result<Account, IdentityError> {
            unreachable!()
        }
        async fn health(&self) -> Result<(), IdentityError> {
            match self.0 {
                Behaviour::Healthy => Ok(()),
                Behaviour::Failing => Err(IdentityError::Unavailable("down".into())),
                Behaviour::Stalled => std::future::pending().await,
            }
        }
    }

    struct DownStore;

    #[async_trait]
    impl RevocationStore for DownStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            unreachable!()
        }
        async fn set_ex(&self, _k: &str, _v: &str, _ttl: Duration) -> Result<(), StoreError> {
            unreachable!()
        }
        async fn health(&self) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    fn aggregator(
        store: Arc<dyn RevocationStore>,
        identity: Behaviour,
    ) -> (HealthAggregator, IntGauge) {
        let gauge = IntGauge::new("service_health_status", "test").unwrap();
        let agg = HealthAggregator::new(
            store,
            Arc::new(StubIdentity(identity)),
            gauge.clone(),
            Duration::from_millis(50),
        );
        (agg, gauge)
    }

    #[tokio::test]
    async fn test_both_healthy_is_serving() {
        let (agg, gauge) = aggregator(Arc::new(MemoryStore::new()), Behaviour::Healthy);
        assert_eq!(agg.check().await, ServingStatus::Serving);
        assert_eq!(gauge.get(), 1);
    }

    #[tokio::test]
    async fn test_identity_failing_is_not_serving() {
        let (agg, gauge) = aggregator(Arc::new(MemoryStore::new()), Behaviour::Failing);
        gauge.set(1);
        assert_eq!(agg.check().await, ServingStatus::NotServing);
        assert_eq!(gauge.get(), 0);
    }

    #[tokio::test]
    async fn test_store_failing_is_not_serving() {
        let (agg, gauge) = aggregator(Arc::new(DownStore), Behaviour::Healthy);
        assert_eq!(agg.check().await, ServingStatus::NotServing);
        assert_eq!(gauge.get(), 0);
    }

    #[tokio::test]
    async fn test_stalled_dependency_times_out() {
        let (agg, gauge) = aggregator(Arc::new(MemoryStore::new()), Behaviour::Stalled);
        assert_eq!(agg.check().await, ServingStatus::NotServing);
        assert_eq!(gauge.get(), 0);
    }

    #[tokio::test]
    async fn test_gauge_recovers() {
        let (down, gauge) = aggregator(Arc::new(DownStore), Behaviour::Healthy);
        assert_eq!(down.check().await, ServingStatus::NotServing);

        let up = HealthAggregator::new(
            Arc::new(MemoryStore::new()),
            Arc::new(StubIdentity(Behaviour::Healthy)),
            gauge.clone(),
            Duration::from_millis(50),
        );
        assert_eq!(up.check().await, ServingStatus::Serving);
        assert_eq!(gauge.get(), 1);
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&ServingStatus::NotServing).unwrap(),
            "\"NOT_SERVING\""
        );
        assert_eq!(ServingStatus::Serving.to_string(), "SERVING");
    }
}
