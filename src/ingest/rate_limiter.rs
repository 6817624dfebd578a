use crate::domain::DriverId;
use crate::store::{Store, keys};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};

const WINDOW_TTL: Duration = Duration::from_secs(2);

/// Fixed one-second window counter per driver. A burst straddling two windows can let up to twice
/// the limit through.
#[derive(Debug)]
pub struct RateLimiter {
    store: Arc<dyn Store>,
    limit: i64,
    clock: fn() -> DateTime<Utc>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn Store>, rps: u32, burst: u32) -> Self {
        RateLimiter {
            store,
            limit: i64::from(rps) + i64::from(burst),
            clock: Utc::now,
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    #[instrument(skip_all, fields(driver_id = %driver_id))]
    pub async fn allow(&self, driver_id: &DriverId) -> bool {
        let key = keys::rate_window_key(driver_id, (self.clock)().timestamp());

        match self.store.incr_with_expiry(&key, WINDOW_TTL).await {
            Ok(count) => count <= self.limit,
            Err(e) => {
                warn!("⚠️ Unable to check the rate limit, allowing the request: {}", e);
                true
            }
        }
    }
}
