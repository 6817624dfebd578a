use crate::domain::{DriverId, LocationPoint};
use crate::store::{Store, StoreError, keys};
use std::sync::Arc;
use tracing::{instrument, trace};

#[derive(Debug)]
pub struct Publisher {
    store: Arc<dyn Store>,
}

impl Publisher {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Publisher { store }
    }

    /// Stops at the first failed publication. Earlier publications are not retracted.
    #[instrument(skip_all, fields(driver_id = %driver_id, order_id = order_id))]
    pub async fn publish(&self, order_id: &str, driver_id: &DriverId, point: &LocationPoint) -> Result<(), StoreError> {
        let payload = serde_json::to_string(point)?;

        self.store.publish(&keys::driver_channel(driver_id), &payload).await?;
        trace!("📣 Published to driver channel");

        if !order_id.is_empty() {
            self.store.publish(&keys::order_channel(order_id), &payload).await?;
            trace!("📣 Published to order channel");
        }

        Ok(())
    }
}
