//! Database and store errors

use std::time::Duration;
use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Revocation store errors.
///
/// Every variant means the store could not answer; callers must not read
/// any of them as "token not revoked".
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend refused or dropped the request
    #[error("revocation store unavailable: {0}")]
    Unavailable(String),

    /// Waiting for a connection or a reply took too long
    #[error("revocation store timed out after {0:?}")]
    Timeout(Duration),

    /// Store was closed during shutdown
    #[error("revocation store is closed")]
    Closed,
}

impl From<::redis::RedisError> for StoreError {
    fn from(err: ::redis::RedisError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
