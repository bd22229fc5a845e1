//! Common error types

use thiserror::Error;

/// Errors produced when parsing domain values from strings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Token kind claim had an unexpected value
    #[error("unknown token kind: {0}")]
    UnknownTokenKind(String),

    /// Principal id is not a valid UUID
    #[error("invalid principal id: {0}")]
    InvalidPrincipalId(String),
}
