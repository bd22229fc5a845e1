//! Bounded Redis connection pools, one per logical database index

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use ::redis::aio::ConnectionManager;
use ::redis::{Client, Cmd, FromRedisValue, RedisResult};
use tokio::sync::Semaphore;

use crate::error::{StoreError, StoreResult};

/// Redis connection settings
#[derive(Clone)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    /// Database indices to open pools for; the first one is the default
    pub databases: Vec<i64>,
    /// Concurrent commands allowed per pool
    pub max_connections: usize,
    /// How long a caller waits for a free slot (and for the initial connect)
    pub wait_timeout: Duration,
    /// Per-command reply timeout
    pub command_timeout: Duration,
}

impl RedisSettings {
    /// Settings for `host:port` with database 0
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            password: None,
            databases: vec![0],
            max_connections: 50,
            wait_timeout: Duration::from_secs(120),
            command_timeout: Duration::from_secs(2),
        }
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_databases(mut self, databases: Vec<i64>) -> Self {
        self.databases = databases;
        self
    }

    #[must_use]
    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    #[must_use]
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Connection URL for database `db`
    pub fn url(&self, db: i64) -> String {
        match &self.password {
            Some(password) => format!("redis://:{}@{}:{}/{}", password, self.host, self.port, db),
            None => format!("redis://{}:{}/{}", self.host, self.port, db),
        }
    }
}

impl std::fmt::Debug for RedisSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("databases", &self.databases)
            .field("max_connections", &self.max_connections)
            .field("wait_timeout", &self.wait_timeout)
            .field("command_timeout", &self.command_timeout)
            .finish_non_exhaustive()
    }
}

/// A multiplexed connection to one database, bounded by a semaphore.
///
/// A slot is held for the duration of a command and returned when the
/// command's future completes or is dropped.
pub struct RedisPool {
    db: i64,
    manager: RwLock<Option<ConnectionManager>>,
    slots: Arc<Semaphore>,
    wait_timeout: Duration,
    command_timeout: Duration,
}

impl RedisPool {
    /// Connect to database `db`
    pub async fn connect(settings: &RedisSettings, db: i64) -> StoreResult<Self> {
        let client = Client::open(settings.url(db))?;
        let manager = tokio::time::timeout(settings.wait_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Timeout(settings.wait_timeout))??;

        tracing::info!(
            db,
            max_connections = settings.max_connections,
            "Redis pool connected"
        );

        Ok(Self {
            db,
            manager: RwLock::new(Some(manager)),
            slots: Arc::new(Semaphore::new(settings.max_connections.max(1))),
            wait_timeout: settings.wait_timeout,
            command_timeout: settings.command_timeout,
        })
    }

    /// Pool with no connection, for exercising the closed paths
    #[cfg(test)]
    pub(crate) fn unconnected(settings: &RedisSettings, db: i64) -> Self {
        Self {
            db,
            manager: RwLock::new(None),
            slots: Arc::new(Semaphore::new(settings.max_connections.max(1))),
            wait_timeout: settings.wait_timeout,
            command_timeout: settings.command_timeout,
        }
    }

    /// Database index this pool talks to
    pub fn db(&self) -> i64 {
        self.db
    }

    /// Run one command, bounded by the pool's wait and reply timeouts
    pub async fn query<T: FromRedisValue>(&self, cmd: Cmd) -> StoreResult<T> {
        let _slot = match tokio::time::timeout(self.wait_timeout, self.slots.acquire()).await {
            Ok(Ok(slot)) => slot,
            Ok(Err(_)) => return Err(StoreError::Closed),
            Err(_) => {
                tracing::warn!(db = self.db, "Timed out waiting for a Redis connection");
                return Err(StoreError::Timeout(self.wait_timeout));
            }
        };

        let mut conn = self
            .manager
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(StoreError::Closed)?;

        let reply = tokio::time::timeout(self.command_timeout, async {
            let reply: RedisResult<T> = cmd.query_async(&mut conn).await;
            reply
        })
        .await
        .map_err(|_| StoreError::Timeout(self.command_timeout))?;

        Ok(reply?)
    }

    /// Stop accepting commands and drop the connection
    pub fn close(&self) {
        self.slots.close();
        let manager = self
            .manager
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if manager.is_some() {
            tracing::info!(db = self.db, "Redis pool closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.slots.is_closed()
    }
}

impl std::fmt::Debug for RedisPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPool")
            .field("db", &self.db)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Pools keyed by database index
#[derive(Debug)]
pub struct RedisPools {
    pools: BTreeMap<i64, RedisPool>,
    default_db: i64,
}

impl RedisPools {
    /// Open one pool per configured database
    pub async fn connect(settings: &RedisSettings) -> StoreResult<Self> {
        let default_db = *settings
            .databases
            .first()
            .ok_or_else(|| StoreError::Unavailable("no Redis databases configured".to_string()))?;

        let mut pools = BTreeMap::new();
        for &db in &settings.databases {
            if !pools.contains_key(&db) {
                pools.insert(db, RedisPool::connect(settings, db).await?);
            }
        }

        Ok(Self { pools, default_db })
    }

    #[cfg(test)]
    pub(crate) fn unconnected(settings: &RedisSettings) -> Self {
        let pools = settings
            .databases
            .iter()
            .map(|&db| (db, RedisPool::unconnected(settings, db)))
            .collect();
        Self {
            pools,
            default_db: settings.databases.first().copied().unwrap_or_default(),
        }
    }

    /// Pool for database `db`
    pub fn get(&self, db: i64) -> Option<&RedisPool> {
        self.pools.get(&db)
    }

    /// Index of the first configured database
    pub fn default_db(&self) -> i64 {
        self.default_db
    }

    pub fn iter(&self) -> impl Iterator<Item = &RedisPool> {
        self.pools.values()
    }

    /// Close every pool
    pub fn close_all(&self) {
        for pool in self.pools.values() {
            pool.close();
        }
    }
}
