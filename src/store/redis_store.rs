use crate::app_config::StoreConfig;
use crate::store::{Store, StoreError};
use async_trait::async_trait;
use redis::IntoConnectionInfo;
use redis::aio::ConnectionManager;
use std::fmt::{Debug, Formatter};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{instrument, trace};

#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl Debug for RedisStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RedisStore {
    #[instrument(skip_all, fields(address = config.address(), db = config.db()))]
    pub async fn connect(config: &StoreConfig) -> Result<RedisStore, StoreError> {
        let mut connection_info = format!("redis://{}/{}", config.address(), config.db()).into_connection_info()?;
        connection_info.redis.password = config.password().map(str::to_string);
        let client = redis::Client::open(connection_info)?;

        let connect = async {
            let mut connection = ConnectionManager::new(client).await?;
            let pong: String = redis::cmd("PING").query_async(&mut connection).await?;
            trace!(pong, "PING");
            Ok::<_, StoreError>(connection)
        };

        let connection = timeout(config.connect_timeout(), connect)
            .await
            .map_err(|_| StoreError::Timeout(config.connect_timeout()))??;

        Ok(RedisStore { connection })
    }
}

fn millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl Store for RedisStore {
    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        let mut connection = self.connection.clone();
        // SET NX only creates the counter, INCR keeps the TTL of an existing key
        let (count,): (i64,) = redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(key)
            .arg(0)
            .arg("NX")
            .arg("PX")
            .arg(millis(ttl))
            .ignore()
            .cmd("INCR")
            .arg(key)
            .query_async(&mut connection)
            .await?;
        Ok(count)
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut connection = self.connection.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(millis(ttl))
            .query_async(&mut connection)
            .await?;
        Ok(reply.is_some())
    }

    async fn geo_add(&self, index: &str, member: &str, latitude: f64, longitude: f64) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let _: i64 = redis::cmd("GEOADD")
            .arg(index)
            .arg(longitude)
            .arg(latitude)
            .arg(member)
            .query_async(&mut connection)
            .await?;
        Ok(())
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis(ttl))
            .query_async(&mut connection)
            .await?;
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let receivers: i64 = redis::cmd("PUBLISH").arg(channel).arg(payload).query_async(&mut connection).await?;
        trace!(channel, receivers, "PUBLISH");
        Ok(())
    }
}
