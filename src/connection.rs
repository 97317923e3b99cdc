//! Redis connection management
//!
//! This module provides [`RedisBackend`], the production implementation of
//! [`StoreBackend`] over a multiplexed `redis` connection, and
//! [`StoreConfig`], the URL-plus-timeout settings it is built from.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{CacheError, Result};
use crate::store::{BatchOp, StoreBackend};

/// Default connection URL when `REDIS_URL` is not set.
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379/0";

/// Connection settings for the remote store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Redis connection URL, e.g. `redis://localhost:6379/0`
    pub url: String,
    /// Socket timeout applied to every command
    pub response_timeout: Duration,
    /// Timeout for establishing the connection
    pub connect_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REDIS_URL.to_string(),
            response_timeout: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(1),
        }
    }
}

impl StoreConfig {
    /// Build a config for the given URL with the default timeouts.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Read the connection URL from the environment (`REDIS_URL`), falling
    /// back to [`DEFAULT_REDIS_URL`]. A `.env` file is honored when present.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string());
        Self::new(url)
    }
}

/// Production [`StoreBackend`] over a multiplexed Redis connection.
///
/// The connection is cheap to clone; every operation clones it and issues
/// exactly one round trip (batches go through one atomic `MULTI`/`EXEC`
/// pipeline). Failures propagate as [`CacheError::Store`]; nothing is
/// retried here.
pub struct RedisBackend {
    conn: MultiplexedConnection,
    config: StoreConfig,
}

impl RedisBackend {
    /// Connect with the given settings.
    pub async fn connect(config: StoreConfig) -> Result<Self> {
        info!("Connecting to Redis at {}", config.url);

        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| CacheError::Config(format!("invalid Redis URL: {e}")))?;

        let conn = client
            .get_multiplexed_tokio_connection_with_response_timeouts(
                config.response_timeout,
                config.connect_timeout,
            )
            .await
            .map_err(|e| CacheError::StoreUnavailable(e.to_string()))?;

        info!("Successfully connected to Redis");
        Ok(Self { conn, config })
    }

    /// Connect using `REDIS_URL` from the environment.
    pub async fn from_env() -> Result<Self> {
        Self::connect(StoreConfig::from_env()).await
    }

    /// The settings this backend was built with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn connection(&self) -> MultiplexedConnection {
        self.conn.clone()
    }

    /// Collect all keys matching `prefix*` via cursor scans.
    async fn scan_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut conn = self.connection();
        let pattern = format!("{}*", escape_pattern(prefix));
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(200)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        Ok(keys)
    }
}

/// Escape Redis glob metacharacters so a prefix matches literally.
fn escape_pattern(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn ttl_millis(ttl: Duration) -> u64 {
    // Redis rejects zero expirations; clamp to the smallest it accepts.
    (ttl.as_millis() as u64).max(1)
}

#[async_trait]
impl StoreBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.connection();
        match ttl {
            Some(ttl) => {
                let _: () = redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("PX")
                    .arg(ttl_millis(ttl))
                    .query_async(&mut conn)
                    .await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection();
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection();
        let found: bool = conn.exists(key).await?;
        Ok(found)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.connection();
        let updated: i64 = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(updated > 0)
    }

    async fn run_batch(&self, ops: Vec<BatchOp>) -> Result<()> {
        if ops.is_empty() {
            return Ok(());
        }

        let mut conn = self.connection();
        let mut pipe = redis::pipe();
        pipe.atomic();

        for op in &ops {
            match op {
                BatchOp::Set { key, value, ttl } => match ttl {
                    Some(ttl) => {
                        pipe.cmd("SET")
                            .arg(key)
                            .arg(value)
                            .arg("PX")
                            .arg(ttl_millis(*ttl))
                            .ignore();
                    }
                    None => {
                        pipe.cmd("SET").arg(key).arg(value).ignore();
                    }
                },
                BatchOp::Delete { key } => {
                    pipe.cmd("DEL").arg(key).ignore();
                }
            }
        }

        let _: () = pipe.query_async(&mut conn).await?;
        debug!("Applied batch of {} operations", ops.len());
        Ok(())
    }

    async fn count_prefix(&self, prefix: &str) -> Result<u64> {
        let keys = self.scan_keys(prefix).await?;
        Ok(keys.len() as u64)
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let keys = self.scan_keys(prefix).await?;
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connection();
        let removed: i64 = redis::cmd("UNLINK").arg(&keys).query_async(&mut conn).await?;
        debug!("Unlinked {} keys under prefix {}", removed, prefix);
        Ok(removed as u64)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(CacheError::StoreUnavailable(format!(
                "unexpected PING reply: {pong}"
            )))
        }
    }
}
