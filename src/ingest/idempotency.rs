use crate::domain::DriverId;
use crate::store::{Store, StoreError, keys};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

#[derive(Debug)]
pub struct IdempotencyGuard {
    store: Arc<dyn Store>,
    ttl: Duration,
}

impl IdempotencyGuard {
    pub fn new(store: Arc<dyn Store>, ttl: Duration) -> Self {
        IdempotencyGuard { store, ttl }
    }

    #[instrument(skip_all, fields(driver_id = %driver_id, seq = seq))]
    pub async fn admit(&self, driver_id: &DriverId, seq: i64) -> Result<bool, StoreError> {
        self.store.set_if_absent(&keys::idempotency_key(driver_id, seq), "1", self.ttl).await
    }
}
