//! Redis revocation store
//!
//! Entries are `SET {prefix}:{sha256(token)} {principal_id} EX {ttl}`, so
//! Redis expires them together with the token they revoke.

use ::redis::Cmd;
use async_trait::async_trait;
use keygate_types::PrincipalId;

use super::pool::{RedisPool, RedisPools};
use crate::error::{StoreError, StoreResult};
use crate::repo::{revocation_key, RevocationStore, DEFAULT_KEY_PREFIX};

/// Revocation store backed by Redis
#[derive(Debug)]
pub struct RedisRevocationStore {
    pools: RedisPools,
    db: i64,
    key_prefix: String,
}

impl RedisRevocationStore {
    /// Store using the default database and key prefix
    pub fn new(pools: RedisPools) -> Self {
        let db = pools.default_db();
        Self {
            pools,
            db,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }

    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    fn pool(&self) -> StoreResult<&RedisPool> {
        self.pools
            .get(self.db)
            .ok_or_else(|| StoreError::Unavailable(format!("no pool for database {}", self.db)))
    }

    fn key(&self, token: &str) -> String {
        revocation_key(&self.key_prefix, token)
    }
}

/// `EXISTS {key}`
fn exists_cmd(key: &str) -> Cmd {
    let mut cmd = ::redis::cmd("EXISTS");
    cmd.arg(key);
    cmd
}

/// `SET {key} {principal_id} EX {ttl_secs}`
fn revoke_cmd(key: &str, principal_id: PrincipalId, ttl_secs: u64) -> Cmd {
    let mut cmd = ::redis::cmd("SET");
    cmd.arg(key)
        .arg(principal_id.to_string())
        .arg("EX")
        .arg(ttl_secs);
    cmd
}

/// `FLUSHDB ASYNC`
fn flush_cmd() -> Cmd {
    let mut cmd = ::redis::cmd("FLUSHDB");
    cmd.arg("ASYNC");
    cmd
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn is_revoked(&self, token: &str) -> StoreResult<bool> {
        self.pool()?.query(exists_cmd(&self.key(token))).await
    }

    async fn revoke(
        &self,
        token: &str,
        principal_id: PrincipalId,
        ttl_secs: u64,
    ) -> StoreResult<()> {
        if ttl_secs == 0 {
            return Ok(());
        }

        let cmd = revoke_cmd(&self.key(token), principal_id, ttl_secs);
        self.pool()?.query::<()>(cmd).await?;

        tracing::debug!(principal_id = %principal_id, ttl_secs, "Token revoked");
        Ok(())
    }

    async fn clear(&self) -> StoreResult<bool> {
        self.pool()?.query::<()>(flush_cmd()).await?;

        tracing::info!(db = self.db, "Revocation store cleared");
        Ok(true)
    }

    async fn close(&self) {
        self.pools.close_all();
    }

    async fn ping(&self) -> StoreResult<()> {
        for pool in self.pools.iter() {
            pool.query::<String>(::redis::cmd("PING")).await?;
        }
        Ok(())
    }
}
