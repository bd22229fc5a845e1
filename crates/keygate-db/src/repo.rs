//! Repository traits
//!
//! Define async interfaces for the user store and the revocation store.

use async_trait::async_trait;
use keygate_types::PrincipalId;
use sha2::{Digest, Sha256};

use crate::error::{DbResult, StoreResult};
use crate::models::PrincipalRow;

/// Default namespace for revocation keys
pub const DEFAULT_KEY_PREFIX: &str = "user";

/// Principal repository trait
#[async_trait]
pub trait PrincipalRepository: Send + Sync {
    /// Find a principal by ID
    async fn find_by_id(&self, id: PrincipalId) -> DbResult<Option<PrincipalRow>>;

    /// Find a principal by email (case-insensitive)
    async fn find_by_email(&self, email: &str) -> DbResult<Option<PrincipalRow>>;

    /// Round-trip to the user store (readiness checks)
    async fn ping(&self) -> DbResult<()> {
        Ok(())
    }
}

/// Set of revoked tokens, each kept until its own expiry.
///
/// Implementations must be interchangeable: the auth core only relies on
/// this contract.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Whether `token` has been revoked
    async fn is_revoked(&self, token: &str) -> StoreResult<bool>;

    /// Revoke `token` for `ttl_secs` seconds.
    ///
    /// Revoking the same token again refreshes its TTL. A zero TTL is a
    /// no-op since the token has already expired.
    async fn revoke(&self, token: &str, principal_id: PrincipalId, ttl_secs: u64)
        -> StoreResult<()>;

    /// Remove every entry. Returns whether the backend acknowledged.
    async fn clear(&self) -> StoreResult<bool>;

    /// Release connections. Safe to call more than once.
    async fn close(&self);

    /// Round-trip to the backend (readiness checks)
    async fn ping(&self) -> StoreResult<()>;
}

/// Store key for a token: `{prefix}:{sha256(token)}`
///
/// Raw tokens never reach the store.
pub fn revocation_key(prefix: &str, token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    format!("{}:{}", prefix, hex::encode(digest))
}
