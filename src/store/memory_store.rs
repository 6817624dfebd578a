use crate::store::{Store, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast};
use tokio::time::Instant;
use tracing::debug;

// Same bounds Redis enforces for GEOADD
const MAX_GEO_LATITUDE: f64 = 85.051_128_78;
const MAX_GEO_LONGITUDE: f64 = 180.0;

const PUBLICATION_BUFFER_SIZE: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct Publication {
    pub channel: String,
    pub payload: String,
}

/// Single-process store with the same semantics as the Redis backed one.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
    publications: broadcast::Sender<Publication>,
}

#[derive(Debug, Default)]
struct State {
    values: HashMap<String, Entry>,
    geo_indexes: HashMap<String, HashMap<String, (f64, f64)>>,
}

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl State {
    fn purge_expired(&mut self, now: Instant) {
        self.values.retain(|_, entry| entry.expires_at > now);
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (publications, _) = broadcast::channel(PUBLICATION_BUFFER_SIZE);
        MemoryStore {
            state: Mutex::new(State::default()),
            publications,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        state.purge_expired(now);

        let (count, expires_at) = match state.values.get(key) {
            Some(entry) => {
                let count = entry.value.parse::<i64>().map_err(|_| StoreError::NotAnInteger(key.to_string()))?;
                (count + 1, entry.expires_at)
            }
            None => (1, now + ttl),
        };

        state.values.insert(
            key.to_string(),
            Entry {
                value: count.to_string(),
                expires_at,
            },
        );
        Ok(count)
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        state.purge_expired(now);

        if state.values.contains_key(key) {
            return Ok(false);
        }

        state.values.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn geo_add(&self, index: &str, member: &str, latitude: f64, longitude: f64) -> Result<(), StoreError> {
        if !(latitude.abs() <= MAX_GEO_LATITUDE && longitude.abs() <= MAX_GEO_LONGITUDE) {
            return Err(StoreError::InvalidGeoPosition { latitude, longitude });
        }

        let mut state = self.state.lock().await;
        state
            .geo_indexes
            .entry(index.to_string())
            .or_default()
            .insert(member.to_string(), (latitude, longitude));
        Ok(())
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        state.purge_expired(now);

        state.values.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), StoreError> {
        let publication = Publication {
            channel: channel.to_string(),
            payload: payload.to_string(),
        };

        // Without subscribers the message is dropped, like Redis pub/sub
        let receivers = self.publications.send(publication).unwrap_or_default();
        debug!(channel, receivers, "📣 Published to '{}'", channel);
        Ok(())
    }
}

#[cfg(test)]
impl MemoryStore {
    pub fn subscribe(&self) -> broadcast::Receiver<Publication> {
        self.publications.subscribe()
    }

    pub async fn value(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let state = self.state.lock().await;
        state.values.get(key).filter(|entry| entry.expires_at > now).map(|entry| entry.value.clone())
    }

    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let state = self.state.lock().await;
        state.values.get(key).filter(|entry| entry.expires_at > now).map(|entry| entry.expires_at - now)
    }

    pub async fn position(&self, index: &str, member: &str) -> Option<(f64, f64)> {
        let state = self.state.lock().await;
        state.geo_indexes.get(index).and_then(|members| members.get(member)).copied()
    }
}

#[cfg(test)]
pub fn drain(rx: &mut broadcast::Receiver<Publication>) -> Vec<Publication> {
    let mut publications = Vec::new();
    while let Ok(publication) = rx.try_recv() {
        publications.push(publication);
    }
    publications
}
