//! Keygate DB - Persistence seams for the auth core
//!
//! - [`PrincipalRepository`]: read access to the user store (PostgreSQL via SQLx)
//! - [`RevocationStore`]: revoked-token set with per-entry TTL (Redis or in-memory)
//!
//! # Example
//!
//! ```rust,ignore
//! use keygate_db::{create_pool, PgPrincipalRepository, RedisPools, RedisRevocationStore, RedisSettings};
//!
//! let pool = create_pool("postgres://localhost/keygate").await?;
//! let principals = PgPrincipalRepository::new(pool);
//!
//! let pools = RedisPools::connect(&RedisSettings::new("localhost", 6379)).await?;
//! let revocations = RedisRevocationStore::new(pools);
//! revocations.revoke(&token, principal_id, 3600).await?;
//! ```

pub mod error;
pub mod memory;
pub mod models;
pub mod pg;
pub mod pool;
pub mod redis;
pub mod repo;

pub use error::{DbError, DbResult, StoreError, StoreResult};
pub use memory::MemoryRevocationStore;
pub use models::*;
pub use pg::PgPrincipalRepository;
pub use pool::{create_pool, create_pool_with_options, DbPool, PoolOptions};
pub use crate::redis::{RedisPool, RedisPools, RedisRevocationStore, RedisSettings};
pub use repo::*;
