/// Redis-backed session cache
///
/// Entries are plain strings written with `SET key value EX ttl`, so Redis
/// handles expiry. Every command is bounded by the client's command timeout;
/// a timeout is reported as a [`CacheError`] like any other failure.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use super::client::RedisClient;
use crate::session::{CacheError, SessionCache};

#[derive(Clone)]
pub struct RedisSessionCache {
    client: RedisClient,
}

impl RedisSessionCache {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        F: std::future::Future<Output = redis::RedisResult<T>>,
    {
        self.client
            .bounded(op)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.client.connection();
        self.bounded(conn.get::<_, Option<String>>(key)).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.client.connection();
        // SET EX rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        self.bounded(conn.set_ex::<_, _, ()>(key, value, seconds)).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.client.connection();
        self.bounded(conn.del::<_, ()>(key)).await
    }
}
