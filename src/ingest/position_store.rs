use crate::domain::DriverId;
use crate::store::{Store, StoreError, keys};
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

#[derive(Debug)]
pub struct PositionStore {
    store: Arc<dyn Store>,
    heartbeat_ttl: Duration,
}

impl PositionStore {
    pub fn new(store: Arc<dyn Store>, heartbeat_ttl: Duration) -> Self {
        PositionStore { store, heartbeat_ttl }
    }

    /// The geo entry is written first and is not rolled back if the heartbeat fails.
    #[instrument(skip_all, fields(driver_id = %driver_id))]
    pub async fn update(&self, driver_id: &DriverId, latitude: f64, longitude: f64) -> Result<(), StoreError> {
        self.store.geo_add(keys::GEO_INDEX, driver_id.as_str(), latitude, longitude).await?;

        let heartbeat = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        self.store
            .set_with_ttl(&keys::heartbeat_key(driver_id), &heartbeat, self.heartbeat_ttl)
            .await
    }
}
