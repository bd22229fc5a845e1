//! In-process revocation store
//!
//! Each entry expires after its own TTL, mirroring Redis `EX`. Suitable for
//! tests and single-node deployments.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use keygate_types::PrincipalId;
use moka::future::Cache;
use moka::Expiry;

use crate::error::{StoreError, StoreResult};
use crate::repo::{revocation_key, RevocationStore, DEFAULT_KEY_PREFIX};

#[derive(Debug, Clone)]
struct RevokedEntry {
    principal_id: PrincipalId,
    ttl: Duration,
}

/// Expire each entry after the TTL it was revoked with
struct EntryTtl;

impl Expiry<String, RevokedEntry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &RevokedEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &RevokedEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Revocation store held in memory
pub struct MemoryRevocationStore {
    entries: Cache<String, RevokedEntry>,
    key_prefix: String,
    closed: AtomicBool,
}

impl MemoryRevocationStore {
    /// Create a store holding at most `max_capacity` revoked tokens
    pub fn new(max_capacity: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(EntryTtl)
                .build(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            closed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Principal a revoked token belonged to, if it is still revoked
    pub async fn revoked_by(&self, token: &str) -> Option<PrincipalId> {
        self.entries
            .get(&revocation_key(&self.key_prefix, token))
            .await
            .map(|entry| entry.principal_id)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.is_closed() {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryRevocationStore {
    fn default() -> Self {
        Self::new(100_000)
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn is_revoked(&self, token: &str) -> StoreResult<bool> {
        self.ensure_open()?;
        Ok(self
            .entries
            .contains_key(&revocation_key(&self.key_prefix, token)))
    }

    async fn revoke(
        &self,
        token: &str,
        principal_id: PrincipalId,
        ttl_secs: u64,
    ) -> StoreResult<()> {
        self.ensure_open()?;
        if ttl_secs == 0 {
            return Ok(());
        }

        let entry = RevokedEntry {
            principal_id,
            ttl: Duration::from_secs(ttl_secs),
        };
        self.entries
            .insert(revocation_key(&self.key_prefix, token), entry)
            .await;
        Ok(())
    }

    async fn clear(&self) -> StoreResult<bool> {
        self.ensure_open()?;
        self.entries.invalidate_all();
        Ok(true)
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::info!("In-memory revocation store closed");
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        self.ensure_open()
    }
}

impl std::fmt::Debug for MemoryRevocationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRevocationStore")
            .field("key_prefix", &self.key_prefix)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
