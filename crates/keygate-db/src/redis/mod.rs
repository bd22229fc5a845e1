//! Redis-backed revocation store

mod pool;
mod revocation;

pub use pool::{RedisPool, RedisPools, RedisSettings};
pub use revocation::RedisRevocationStore;
