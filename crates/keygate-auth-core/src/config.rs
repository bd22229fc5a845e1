//! Configuration types for the token core

use std::path::Path;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use keygate_types::TokenKind;

use crate::AuthError;

/// Default `aud` claim for issued tokens
pub const DEFAULT_AUDIENCE: &str = "backend:authentication";

/// Token core configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// PEM private key used to sign tokens
    pub private_key_pem: String,
    /// PEM public key used to verify tokens
    pub public_key_pem: String,
    /// Signing algorithm (asymmetric only)
    pub algorithm: Algorithm,
    /// Audience written to and required from every token
    pub audience: String,
    /// Access token lifetime
    pub access_token_lifetime: Duration,
    /// Refresh token lifetime
    pub refresh_token_lifetime: Duration,
    /// Accept tokens when the revocation store cannot be reached
    pub revocation_fail_open: bool,
}

impl AuthConfig {
    /// Create a config from PEM-encoded keys
    pub fn new(private_key_pem: impl Into<String>, public_key_pem: impl Into<String>) -> Self {
        Self {
            private_key_pem: private_key_pem.into(),
            public_key_pem: public_key_pem.into(),
            algorithm: Algorithm::RS256,
            audience: DEFAULT_AUDIENCE.to_string(),
            access_token_lifetime: Duration::from_secs(60 * 60), // 1 hour
            refresh_token_lifetime: Duration::from_secs(14 * 24 * 60 * 60), // 14 days
            revocation_fail_open: false,
        }
    }

    /// Read both keys from PEM files
    pub fn from_pem_files(
        private_key_path: impl AsRef<Path>,
        public_key_path: impl AsRef<Path>,
    ) -> Result<Self, AuthError> {
        let private_key_pem = read_key(private_key_path.as_ref())?;
        let public_key_pem = read_key(public_key_path.as_ref())?;
        Ok(Self::new(private_key_pem, public_key_pem))
    }

    /// Lifetime of tokens of the given kind
    pub fn lifetime(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::AccessToken => self.access_token_lifetime,
            TokenKind::RefreshToken => self.refresh_token_lifetime,
        }
    }

    #[must_use]
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }

    #[must_use]
    pub fn with_access_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.access_token_lifetime = lifetime;
        self
    }

    #[must_use]
    pub fn with_refresh_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.refresh_token_lifetime = lifetime;
        self
    }

    #[must_use]
    pub fn with_revocation_fail_open(mut self, fail_open: bool) -> Self {
        self.revocation_fail_open = fail_open;
        self
    }
}

fn read_key(path: &Path) -> Result<String, AuthError> {
    std::fs::read_to_string(path).map_err(|e| {
        AuthError::Configuration(format!("cannot read key {}: {}", path.display(), e))
    })
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("private_key_pem", &"[REDACTED]")
            .field("algorithm", &self.algorithm)
            .field("audience", &self.audience)
            .field("access_token_lifetime", &self.access_token_lifetime)
            .field("refresh_token_lifetime", &self.refresh_token_lifetime)
            .field("revocation_fail_open", &self.revocation_fail_open)
            .finish_non_exhaustive()
    }
}
