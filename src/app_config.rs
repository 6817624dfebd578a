use config::{Config, ConfigError};
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::Level;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    core: Core,
    server: Server,
    auth: Auth,
    rate_limit: RateLimit,
    ingest: Ingest,
    store: StoreConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, AppConfigError> {
        let config: AppConfig = Config::builder()
            .set_default("core.log_level", "info")?
            .set_default("server.port", 8080_i64)?
            .set_default("server.max_body_bytes", 65_536_i64)?
            .set_default("auth.jwt_secret", "")?
            .set_default("rate_limit.rps", 2_i64)?
            .set_default("rate_limit.burst", 4_i64)?
            .set_default("ingest.max_accuracy_m", 50.0)?
            .set_default("ingest.idempotency_ttl", "1h")?
            .set_default("ingest.last_position_ttl", "48h")?
            .set_default("store.backend", "redis")?
            .set_default("store.address", "localhost:6379")?
            .set_default("store.password", "")?
            .set_default("store.db", 0_i64)?
            .set_default("store.connect_timeout", "2s")?
            .set_default("store.connect_retries", 3_i64)?
            .set_default("store.retry_ms", 100_i64)?
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::File::with_name("config_local").required(false))
            .add_source(config::Environment::with_prefix("INGEST").prefix_separator("_").separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppConfigError> {
        if Level::from_str(&self.core.log_level).is_err() {
            return Err(AppConfigError::Invalid(format!("unknown log level '{}'", self.core.log_level)));
        }
        if !(self.ingest.max_accuracy_m > 0.0) {
            return Err(AppConfigError::Invalid(format!(
                "ingest.max_accuracy_m must be positive, got {}",
                self.ingest.max_accuracy_m
            )));
        }
        if self.ingest.idempotency_ttl.is_zero() || self.ingest.last_position_ttl.is_zero() {
            return Err(AppConfigError::Invalid("ingest TTLs must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn core(&self) -> &Core {
        &self.core
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    pub fn rate_limit(&self) -> &RateLimit {
        &self.rate_limit
    }

    pub fn ingest(&self) -> &Ingest {
        &self.ingest
    }

    pub fn store(&self) -> &StoreConfig {
        &self.store
    }
}

#[derive(Error, Debug)]
pub enum AppConfigError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Core {
    log_level: String,
}

impl Core {
    pub fn log_level(&self) -> Level {
        Level::from_str(&self.log_level).unwrap_or(Level::INFO)
    }
}

#[derive(Debug, Deserialize)]
pub struct Server {
    port: u16,
    max_body_bytes: usize,
}

impl Server {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    jwt_secret: String,
}

impl Auth {
    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }
}

#[derive(Debug, Deserialize)]
pub struct RateLimit {
    rps: u32,
    burst: u32,
}

impl RateLimit {
    pub fn rps(&self) -> u32 {
        self.rps
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }
}

#[derive(Debug, Deserialize)]
pub struct Ingest {
    max_accuracy_m: f64,
    #[serde(with = "humantime_serde")]
    idempotency_ttl: Duration,
    #[serde(with = "humantime_serde")]
    last_position_ttl: Duration,
}

impl Ingest {
    pub fn max_accuracy_m(&self) -> f64 {
        self.max_accuracy_m
    }

    pub fn idempotency_ttl(&self) -> Duration {
        self.idempotency_ttl
    }

    pub fn last_position_ttl(&self) -> Duration {
        self.last_position_ttl
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    Memory,
}

#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    backend: StoreBackend,
    address: String,
    password: String,
    db: i64,
    #[serde(with = "humantime_serde")]
    connect_timeout: Duration,
    connect_retries: usize,
    retry_ms: u64,
}

impl StoreConfig {
    pub fn backend(&self) -> StoreBackend {
        self.backend
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn password(&self) -> Option<&str> {
        Some(self.password.as_str()).filter(|password| !password.is_empty())
    }

    pub fn db(&self) -> i64 {
        self.db
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn connect_retries(&self) -> usize {
        self.connect_retries
    }

    pub fn retry_ms(&self) -> u64 {
        self.retry_ms
    }
}

#[cfg(test)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

#[cfg(test)]
impl AppConfigBuilder {
    pub fn new() -> Self {
        AppConfigBuilder {
            config: AppConfig {
                core: Core {
                    log_level: "debug".to_string(),
                },
                server: Server {
                    port: 0,
                    max_body_bytes: 4096,
                },
                auth: Auth {
                    jwt_secret: "test-secret".to_string(),
                },
                rate_limit: RateLimit { rps: 2, burst: 4 },
                ingest: Ingest {
                    max_accuracy_m: 50.0,
                    idempotency_ttl: Duration::from_secs(3600),
                    last_position_ttl: Duration::from_secs(172_800),
                },
                store: StoreConfig {
                    backend: StoreBackend::Memory,
                    address: "localhost:6379".to_string(),
                    password: String::new(),
                    db: 0,
                    connect_timeout: Duration::from_secs(2),
                    connect_retries: 1,
                    retry_ms: 10,
                },
            },
        }
    }

    pub fn rate_limit(mut self, rps: u32, burst: u32) -> Self {
        self.config.rate_limit = RateLimit { rps, burst };
        self
    }

    pub fn max_accuracy_m(mut self, max_accuracy_m: f64) -> Self {
        self.config.ingest.max_accuracy_m = max_accuracy_m;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}
