use crate::store::{MemoryStore, Store, StoreError};
use async_trait::async_trait;
use redis::{ErrorKind, RedisError};
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Incr,
    SetIfAbsent,
    GeoAdd,
    SetWithTtl,
    Publish,
}

/// Wraps a [`MemoryStore`], records every call and fails the configured operations.
#[derive(Debug)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing: HashSet<Operation>,
    failing_channel_prefix: Option<String>,
    calls: Mutex<Vec<Operation>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        FlakyStore {
            inner: MemoryStore::new(),
            failing: HashSet::new(),
            failing_channel_prefix: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self, operation: Operation) -> Self {
        self.failing.insert(operation);
        self
    }

    pub fn failing_channel(mut self, prefix: &str) -> Self {
        self.failing_channel_prefix = Some(prefix.to_string());
        self
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn calls(&self) -> Vec<Operation> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, operation: Operation) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push(operation);
        if self.failing.contains(&operation) {
            return Err(unavailable());
        }
        Ok(())
    }
}

fn unavailable() -> StoreError {
    StoreError::Redis(RedisError::from((ErrorKind::IoError, "connection refused")))
}

#[async_trait]
impl Store for FlakyStore {
    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        self.record(Operation::Incr)?;
        self.inner.incr_with_expiry(key, ttl).await
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError> {
        self.record(Operation::SetIfAbsent)?;
        self.inner.set_if_absent(key, value, ttl).await
    }

    async fn geo_add(&self, index: &str, member: &str, latitude: f64, longitude: f64) -> Result<(), StoreError> {
        self.record(Operation::GeoAdd)?;
        self.inner.geo_add(index, member, latitude, longitude).await
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.record(Operation::SetWithTtl)?;
        self.inner.set_with_ttl(key, value, ttl).await
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), StoreError> {
        self.record(Operation::Publish)?;
        if self.failing_channel_prefix.as_deref().is_some_and(|prefix| channel.starts_with(prefix)) {
            return Err(unavailable());
        }
        self.inner.publish(channel, payload).await
    }
}
