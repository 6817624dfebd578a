use crate::app_config::AppConfig;
use crate::domain::{DriverId, LocationPoint, ValidationError};
use crate::ingest::{IdempotencyGuard, PositionStore, Publisher, RateLimiter};
use crate::store::{Store, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{Span, debug, error, instrument};

/// Runs one location ping through the ingestion stages, in order:
/// rate check, decode, force identity, validate, idempotency check, position update, publish.
/// The first failing stage ends processing.
#[derive(Debug)]
pub struct Pipeline {
    rate_limiter: RateLimiter,
    idempotency: IdempotencyGuard,
    positions: PositionStore,
    publisher: Publisher,
    max_accuracy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    Duplicate,
}

impl Pipeline {
    pub fn new(store: Arc<dyn Store>, config: &AppConfig) -> Self {
        Pipeline {
            rate_limiter: RateLimiter::new(store.clone(), config.rate_limit().rps(), config.rate_limit().burst()),
            idempotency: IdempotencyGuard::new(store.clone(), config.ingest().idempotency_ttl()),
            positions: PositionStore::new(store.clone(), config.ingest().last_position_ttl()),
            publisher: Publisher::new(store),
            max_accuracy: config.ingest().max_accuracy_m(),
        }
    }

    #[cfg(test)]
    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    #[instrument(skip_all, fields(driver_id = %driver_id, seq = tracing::field::Empty))]
    pub async fn process(&self, driver_id: &DriverId, body: &[u8]) -> Result<Outcome, IngestError> {
        if !self.rate_limiter.allow(driver_id).await {
            debug!("⛔ Rate limit exceeded");
            return Err(IngestError::RateLimited);
        }

        let mut point = serde_json::from_slice::<LocationPoint>(body).map_err(IngestError::Decode)?;
        Span::current().record("seq", point.seq);

        point.force_driver_id(driver_id);
        point.validate(self.max_accuracy)?;

        let is_new = self.idempotency.admit(driver_id, point.seq).await.map_err(|e| {
            error!("❌ Idempotency check failed: {}", e);
            IngestError::Idempotency(e)
        })?;
        if !is_new {
            debug!("🔁 Skipping duplicate point");
            return Ok(Outcome::Duplicate);
        }

        self.positions
            .update(driver_id, point.latitude, point.longitude)
            .await
            .map_err(|e| {
                error!("❌ Updating the last position failed: {}", e);
                IngestError::PositionUpdate(e)
            })?;

        self.publisher.publish(&point.order_id, driver_id, &point).await.map_err(|e| {
            error!("❌ Publishing the point failed: {}", e);
            IngestError::Publish(e)
        })?;

        debug!("📍 Accepted point");
        Ok(Outcome::Accepted)
    }
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("rate limit")]
    RateLimited,
    #[error("bad json: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("invalid payload: {0}")]
    Validation(#[from] ValidationError),
    #[error("idempotency check error")]
    Idempotency(#[source] StoreError),
    #[error("position update error")]
    PositionUpdate(#[source] StoreError),
    #[error("publish error")]
    Publish(#[source] StoreError),
}
