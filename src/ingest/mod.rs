mod idempotency;
mod pipeline;
mod position_store;
mod publisher;
mod rate_limiter;

pub use idempotency::IdempotencyGuard;
pub use pipeline::{IngestError, Outcome, Pipeline};
pub use position_store::PositionStore;
pub use publisher::Publisher;
pub use rate_limiter::RateLimiter;
