use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tracing::debug;

use crate::store::{Fields, KeyValueStore, StoreError};

pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)
            .map_err(|err| StoreError::Connect(format!("invalid redis url {url}: {err}")))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|err| StoreError::Connect(format!("redis at {url}: {err}")))?;
        debug!(url, "connected to key-value store");
        Ok(Self { conn })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn hash_fields(&self, key: &str, fields: &[&str]) -> Result<Fields, StoreError> {
        let mut conn = self.conn.clone();
        let values: Vec<Option<String>> = redis::cmd("HMGET")
            .arg(key)
            .arg(fields)
            .query_async(&mut conn)
            .await
            .map_err(|err| StoreError::Read(format!("HMGET {key}: {err}")))?;

        Ok(fields
            .iter()
            .zip(values)
            .filter_map(|(field, value)| value.map(|v| (*field, v)))
            .collect())
    }
}
