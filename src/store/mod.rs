#[cfg(test)]
mod flaky_store;
pub mod keys;
mod memory_store;
mod redis_store;

use crate::app_config::{StoreBackend, StoreConfig};
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{info, instrument, warn};

#[cfg(test)]
pub use flaky_store::{FlakyStore, Operation};
pub use memory_store::MemoryStore;
#[cfg(test)]
pub use memory_store::{Publication, drain};
pub use redis_store::RedisStore;

/// The primitives the ingestion pipeline needs from the shared store. Implementations must make
/// `incr_with_expiry` and `set_if_absent` atomic.
#[async_trait]
pub trait Store: Debug + Send + Sync {
    /// Increments the counter at `key`, returning the new count. The expiry is only set when the
    /// counter is created, later increments leave it untouched.
    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, StoreError>;

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError>;

    async fn geo_add(&self, index: &str, member: &str, latitude: f64, longitude: f64) -> Result<(), StoreError>;

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Fire-and-forget, subscribers that are not listening miss the message.
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), StoreError>;
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
    #[error("store connection timed out after {0:?}")]
    Timeout(Duration),
    #[error("value at '{0}' is not an integer")]
    NotAnInteger(String),
    #[error("invalid geo position ({latitude}, {longitude})")]
    InvalidGeoPosition { latitude: f64, longitude: f64 },
    #[error("unable to serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[instrument(skip_all, fields(backend = ?config.backend()))]
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn Store>, StoreError> {
    match config.backend() {
        StoreBackend::Memory => {
            warn!("⚠️ Using the in-memory store, nothing is shared between instances or kept across restarts");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Redis => {
            let strategy = ExponentialBackoff::from_millis(config.retry_ms())
                .factor(2)
                .max_delay(Duration::from_secs(5))
                .map(jitter)
                .take(config.connect_retries());

            info!("Connecting to Redis at {}...", config.address());
            let store = Retry::spawn(strategy, || async move {
                RedisStore::connect(config).await.inspect_err(|e| {
                    warn!("⚠️ Unable to connect to Redis at {}: {}", config.address(), e);
                })
            })
            .await?;
            info!("Connecting to Redis at {}... OK", config.address());

            Ok(Arc::new(store))
        }
    }
}
