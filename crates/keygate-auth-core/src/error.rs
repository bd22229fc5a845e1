//! Auth errors

use keygate_types::PolicyDenial;
use thiserror::Error;

/// Authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Signature mismatch, malformed token or disallowed algorithm
    #[error("invalid token signature")]
    SignatureInvalid,

    /// Wrong audience, wrong token kind or missing claim
    #[error("token claims do not match")]
    ClaimMismatch,

    /// Token has expired
    #[error("token expired")]
    Expired,

    /// Token was revoked at logout
    #[error("token revoked")]
    Revoked,

    /// Token subject does not resolve to a principal
    #[error("principal not found")]
    PrincipalNotFound,

    /// No usable credential was presented
    #[error("authentication required")]
    Unauthenticated,

    /// Principal exists but fails the route's policy
    #[error("access denied: principal is {0}")]
    PolicyDenied(PolicyDenial),

    /// Revocation store could not confirm the token is not revoked
    #[error("revocation store unavailable: {0}")]
    StoreUnavailable(String),

    /// Transport has no clearable channel for logout
    #[error("transport does not support logout")]
    TransportUnsupported,

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::SignatureInvalid
            | Self::ClaimMismatch
            | Self::Expired
            | Self::Revoked
            | Self::PrincipalNotFound
            | Self::Unauthenticated
            | Self::PolicyDenied(PolicyDenial::Inactive) => 401,
            Self::PolicyDenied(_) => 403,
            Self::StoreUnavailable(_) => 503,
            Self::TransportUnsupported => 501,
            Self::Database(_) | Self::Configuration(_) | Self::Internal(_) => 500,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SignatureInvalid => "INVALID_TOKEN",
            Self::ClaimMismatch => "CLAIM_MISMATCH",
            Self::Expired => "TOKEN_EXPIRED",
            Self::Revoked => "TOKEN_REVOKED",
            Self::PrincipalNotFound => "PRINCIPAL_NOT_FOUND",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::PolicyDenied(PolicyDenial::Inactive) => "PRINCIPAL_INACTIVE",
            Self::PolicyDenied(PolicyDenial::Unverified) => "PRINCIPAL_UNVERIFIED",
            Self::PolicyDenied(PolicyDenial::NotSuperuser) => "SUPERUSER_REQUIRED",
            Self::StoreUnavailable(_) => "REVOCATION_STORE_UNAVAILABLE",
            Self::TransportUnsupported => "TRANSPORT_UNSUPPORTED",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Short label used in logs and metrics
    pub fn reason(&self) -> &'static str {
        match self {
            Self::SignatureInvalid => "signature_invalid",
            Self::ClaimMismatch => "claim_mismatch",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
            Self::PrincipalNotFound => "principal_not_found",
            Self::Unauthenticated => "unauthenticated",
            Self::PolicyDenied(_) => "policy_denied",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::TransportUnsupported => "transport_unsupported",
            Self::Database(_) => "database",
            Self::Configuration(_) => "configuration",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<keygate_db::DbError> for AuthError {
    fn from(err: keygate_db::DbError) -> Self {
        tracing::error!("Database error: {}", err);
        Self::Database(err.to_string())
    }
}

impl From<keygate_db::StoreError> for AuthError {
    fn from(err: keygate_db::StoreError) -> Self {
        tracing::error!("Revocation store error: {}", err);
        Self::StoreUnavailable(err.to_string())
    }
}
