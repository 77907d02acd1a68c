//! Distributed primary backend on Redis
//!
//! The connection is established lazily and shared through a
//! `ConnectionManager`, which reconnects on its own after a dropped
//! connection. Pattern deletes iterate with `SCAN`, never `KEYS`.

use super::{BackendKind, CacheBackend, KeyTtl, Removal};
use crate::errors::{CacheError, Result};
use ::redis::aio::ConnectionManager;
use ::redis::{Client, RedisResult};
use async_trait::async_trait;
use std::future::Future;
use tokio::sync::Mutex;
use warden_utils::Deadline;

const SCAN_BATCH: usize = 200;

pub struct RedisBackend {
    client: Client,
    /// Host and port only, safe to log
    endpoint: String,
    connection: Mutex<Option<ConnectionManager>>,
    /// Bound on each command round trip
    deadline: Deadline,
    /// Bound on establishing the connection
    connect_deadline: Deadline,
    /// Globs removed by `clear_all`
    namespaces: Vec<String>,
}

impl RedisBackend {
    /// Create a backend for `url`. No connection is made until first use.
    pub fn new(url: &str, namespaces: Vec<String>) -> Result<Self> {
        let client = Client::open(url).map_err(|e| {
            CacheError::configuration(format!("invalid redis url: {e}"))
        })?;
        let endpoint = client.get_connection_info().addr.to_string();
        Ok(Self {
            client,
            endpoint,
            connection: Mutex::new(None),
            deadline: Deadline::none(),
            connect_deadline: Deadline::none(),
            namespaces,
        })
    }

    pub fn with_deadlines(mut self, command: Deadline, connect: Deadline) -> Self {
        self.deadline = command;
        self.connect_deadline = connect;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        let mut slot = self.connection.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }
        match self
            .connect_deadline
            .run(ConnectionManager::new(self.client.clone()))
            .await
        {
            Some(Ok(conn)) => {
                tracing::info!(endpoint = %self.endpoint, "Connected to redis");
                *slot = Some(conn.clone());
                Ok(conn)
            }
            Some(Err(e)) => Err(CacheError::unavailable(
                BackendKind::Redis,
                &self.endpoint,
                e.to_string(),
            )),
            None => Err(CacheError::timeout(
                "CONNECT",
                self.connect_deadline.limit().unwrap_or_default(),
            )),
        }
    }

    async fn run<T, F, Fut>(&self, operation: &'static str, command: F) -> Result<T>
    where
        F: FnOnce(ConnectionManager) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        let conn = self.connection().await?;
        match self.deadline.run(command(conn)).await {
            Some(Ok(value)) => Ok(value),
            Some(Err(e)) => Err(CacheError::network(&self.endpoint, operation, e)),
            None => Err(CacheError::timeout(
                operation,
                self.deadline.limit().unwrap_or_default(),
            )),
        }
    }

    /// Log a failed operation and substitute the neutral value
    fn neutral<T>(&self, key: &str, result: Result<T>, fallback: T) -> T {
        result.unwrap_or_else(|e| {
            tracing::warn!(
                backend = "redis",
                key,
                transient = e.is_transient(),
                recovery = ?e.recovery_hint(),
                "Redis operation failed: {}",
                e
            );
            fallback
        })
    }

    async fn scan_delete(&self, pattern: &str) -> Result<u64> {
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = self
                .run("SCAN", |mut conn| async move {
                    ::redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH)
                        .query_async(&mut conn)
                        .await
                })
                .await?;
            if !keys.is_empty() {
                let deleted: u64 = self
                    .run("DEL", |mut conn| async move {
                        ::redis::cmd("DEL").arg(&keys).query_async(&mut conn).await
                    })
                    .await?;
                removed += deleted;
            }
            if next == 0 {
                return Ok(removed);
            }
            cursor = next;
        }
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Redis
    }

    async fn get(&self, key: &str) -> Option<String> {
        let result: Result<Option<String>> = self
            .run("GET", |mut conn| async move {
                ::redis::cmd("GET").arg(key).query_async(&mut conn).await
            })
            .await;
        self.neutral(key, result, None)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        let result: Result<()> = self
            .run("SET", |mut conn| async move {
                let mut cmd = ::redis::cmd("SET");
                cmd.arg(key).arg(value);
                if ttl_secs > 0 {
                    cmd.arg("EX").arg(ttl_secs);
                }
                cmd.query_async(&mut conn).await
            })
            .await;
        self.neutral(key, result.map(|()| true), false)
    }

    async fn delete(&self, key: &str) -> bool {
        self.remove(key).await == Removal::Removed
    }

    async fn remove(&self, key: &str) -> Removal {
        let result: Result<u64> = self
            .run("DEL", |mut conn| async move {
                ::redis::cmd("DEL").arg(key).query_async(&mut conn).await
            })
            .await;
        let removal = result.map(|n| if n > 0 { Removal::Removed } else { Removal::Absent });
        self.neutral(key, removal, Removal::Failed)
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> bool {
        let result: Result<u64> = self
            .run("EXPIRE", |mut conn| async move {
                if ttl_secs > 0 {
                    ::redis::cmd("EXPIRE")
                        .arg(key)
                        .arg(ttl_secs)
                        .query_async(&mut conn)
                        .await
                } else {
                    // PERSIST answers 0 for a key that already had no expiry
                    let exists: u64 = ::redis::cmd("EXISTS").arg(key).query_async(&mut conn).await?;
                    if exists > 0 {
                        let _: u64 = ::redis::cmd("PERSIST").arg(key).query_async(&mut conn).await?;
                    }
                    Ok(exists)
                }
            })
            .await;
        self.neutral(key, result.map(|n| n > 0), false)
    }

    async fn delete_pattern(&self, pattern: &str) -> u64 {
        let result = self.scan_delete(pattern).await;
        self.neutral(pattern, result, 0)
    }

    async fn ttl(&self, key: &str) -> KeyTtl {
        let result: Result<i64> = self
            .run("TTL", |mut conn| async move {
                ::redis::cmd("TTL").arg(key).query_async(&mut conn).await
            })
            .await;
        self.neutral(key, result.map(KeyTtl::from_seconds), KeyTtl::Missing)
    }

    async fn clear_all(&self) -> bool {
        let mut ok = true;
        for pattern in &self.namespaces {
            match self.scan_delete(pattern).await {
                Ok(removed) => {
                    tracing::debug!(pattern = %pattern, removed, "Cleared redis namespace");
                }
                Err(e) => {
                    tracing::warn!(pattern = %pattern, "Failed to clear redis namespace: {}", e);
                    ok = false;
                }
            }
        }
        ok
    }

    async fn ping(&self) -> bool {
        let result: Result<String> = self
            .run("PING", |mut conn| async move {
                ::redis::cmd("PING").query_async(&mut conn).await
            })
            .await;
        match result {
            Ok(reply) => reply == "PONG",
            Err(e) => {
                tracing::debug!(endpoint = %self.endpoint, "Redis health probe failed: {}", e);
                false
            }
        }
    }

    async fn key_count(&self) -> u64 {
        let result: Result<u64> = self
            .run("DBSIZE", |mut conn| async move {
                ::redis::cmd("DBSIZE").query_async(&mut conn).await
            })
            .await;
        self.neutral("*", result, 0)
    }
}
