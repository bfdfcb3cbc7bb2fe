//! Redis integration service implementation
//!
//! Prefix-scoped JSON caching used for catalog listings.

use redis::{Client, AsyncCommands, RedisResult};
use serde::{Serialize, Deserialize};
use tracing::{info, warn, debug};
use crate::config::settings::RedisConfig;
use crate::utils::errors::Result;

/// Redis service for caching
#[derive(Clone, Debug)]
pub struct RedisService {
    client: Client,
    prefix: String,
    default_ttl: u64,
}

impl RedisService {
    /// Create a new RedisService instance; does not connect yet
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        Ok(Self {
            client,
            prefix: config.prefix.clone(),
            default_ttl: config.ttl_seconds,
        })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    async fn get_connection(&self) -> Result<redis::aio::Connection> {
        Ok(self.client.get_async_connection().await?)
    }

    /// Set a value in Redis with TTL
    pub async fn set<T>(&self, key: &str, value: &T, ttl_seconds: Option<u64>) -> Result<()>
    where
        T: Serialize,
    {
        let mut conn = self.get_connection().await?;
        let serialized = serde_json::to_string(value)?;
        let full_key = self.full_key(key);
        let ttl = ttl_seconds.unwrap_or(self.default_ttl);

        let _: () = conn.set_ex(&full_key, serialized, ttl).await?;

        debug!(key = %full_key, ttl = ttl, "Value set in Redis");
        Ok(())
    }

    /// Get a value from Redis
    pub async fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let mut conn = self.get_connection().await?;
        let full_key = self.full_key(key);

        let result: Option<String> = conn.get(&full_key).await?;

        match result {
            Some(data) => {
                let deserialized = serde_json::from_str::<T>(&data)?;
                debug!(key = %full_key, "Value retrieved from Redis");
                Ok(Some(deserialized))
            }
            None => {
                debug!(key = %full_key, "Key not found in Redis");
                Ok(None)
            }
        }
    }

    /// Delete a key from Redis
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let full_key = self.full_key(key);

        let deleted: i32 = conn.del(&full_key).await?;

        debug!(key = %full_key, deleted = deleted > 0, "Key deletion attempted");
        Ok(deleted > 0)
    }

    /// Delete all keys matching a pattern
    pub async fn delete_pattern(&self, pattern: &str) -> Result<u64> {
        let mut conn = self.get_connection().await?;
        let full_pattern = self.full_key(pattern);

        let keys: Vec<String> = conn.keys(&full_pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }

        let deleted: u64 = conn.del(&keys).await?;
        info!(pattern = %full_pattern, deleted = deleted, "Keys deleted by pattern");
        Ok(deleted)
    }

    /// Health check for Redis connection
    pub async fn health_check(&self) -> bool {
        match self.get_connection().await {
            Ok(mut conn) => {
                let result: RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
                match result {
                    Ok(response) => {
                        debug!(response = %response, "Redis health check successful");
                        response == "PONG"
                    }
                    Err(e) => {
                        warn!(error = %e, "Redis health check failed");
                        false
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Redis connection failed");
                false
            }
        }
    }
}
