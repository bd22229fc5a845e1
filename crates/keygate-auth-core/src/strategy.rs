//! Token strategy - issuance, validation and revocation of credential pairs

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use keygate_db::{PrincipalRepository, RevocationStore};
use keygate_types::{Principal, PrincipalId, TokenKind};

use crate::codec::{Claims, TokenCodec};
use crate::{AuthConfig, AuthError};

/// A freshly signed token
#[derive(Clone)]
pub struct IssuedToken {
    pub token: String,
    pub kind: TokenKind,
    pub expires_in: Duration,
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("kind", &self.kind)
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Result of a login: always an access token, a refresh token unless the
/// login was itself a refresh
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: Option<IssuedToken>,
}

/// A token that passed every check, with the principal it names
#[derive(Clone)]
pub struct AuthenticatedToken {
    pub principal: Principal,
    pub token: String,
    pub kind: TokenKind,
    pub expires_at: DateTime<Utc>,
}

impl AuthenticatedToken {
    /// Time left before the token expires on its own
    pub fn remaining_ttl(&self) -> Duration {
        (self.expires_at - Utc::now()).to_std().unwrap_or(Duration::ZERO)
    }
}

impl std::fmt::Debug for AuthenticatedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedToken")
            .field("principal_id", &self.principal.id)
            .field("kind", &self.kind)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Outcome of validating one token
#[derive(Debug)]
pub enum TokenOutcome {
    Valid(AuthenticatedToken),
    /// Token must not be trusted. The reason is for logs and metrics only.
    Rejected(AuthError),
}

impl TokenOutcome {
    pub fn into_valid(self) -> Option<AuthenticatedToken> {
        match self {
            Self::Valid(token) => Some(token),
            Self::Rejected(_) => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Valid(_) => "valid",
            Self::Rejected(err) => err.reason(),
        }
    }
}

/// Issues and validates access/refresh tokens.
///
/// Holds no per-request state; share it behind an `Arc`.
pub struct TokenStrategy<U: PrincipalRepository + ?Sized, S: RevocationStore + ?Sized> {
    codec: TokenCodec,
    principals: Arc<U>,
    revocations: Arc<S>,
    access_token_lifetime: Duration,
    refresh_token_lifetime: Duration,
    revocation_fail_open: bool,
}

impl<U: PrincipalRepository + ?Sized, S: RevocationStore + ?Sized> TokenStrategy<U, S> {
    /// Create a strategy with default lifetimes (1 hour / 14 days)
    pub fn new(codec: TokenCodec, principals: Arc<U>, revocations: Arc<S>) -> Self {
        Self {
            codec,
            principals,
            revocations,
            access_token_lifetime: Duration::from_secs(60 * 60),
            refresh_token_lifetime: Duration::from_secs(14 * 24 * 60 * 60),
            revocation_fail_open: false,
        }
    }

    /// Load the codec and lifetimes from `config`
    pub fn from_config(
        config: &AuthConfig,
        principals: Arc<U>,
        revocations: Arc<S>,
    ) -> Result<Self, AuthError> {
        let codec = TokenCodec::from_config(config)?;
        Ok(Self::new(codec, principals, revocations)
            .with_lifetime(TokenKind::AccessToken, config.access_token_lifetime)
            .with_lifetime(TokenKind::RefreshToken, config.refresh_token_lifetime)
            .with_revocation_fail_open(config.revocation_fail_open))
    }

    #[must_use]
    pub fn with_lifetime(mut self, kind: TokenKind, lifetime: Duration) -> Self {
        match kind {
            TokenKind::AccessToken => self.access_token_lifetime = lifetime,
            TokenKind::RefreshToken => self.refresh_token_lifetime = lifetime,
        }
        self
    }

    #[must_use]
    pub fn with_revocation_fail_open(mut self, fail_open: bool) -> Self {
        self.revocation_fail_open = fail_open;
        self
    }

    pub fn lifetime(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::AccessToken => self.access_token_lifetime,
            TokenKind::RefreshToken => self.refresh_token_lifetime,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn principals(&self) -> &Arc<U> {
        &self.principals
    }

    pub fn revocations(&self) -> &Arc<S> {
        &self.revocations
    }

    // =========================================================================
    // Write path
    // =========================================================================

    /// Sign a token of `kind` for `principal`
    pub fn write_token(&self, principal: &Principal, kind: TokenKind) -> Result<IssuedToken, AuthError> {
        let lifetime = self.lifetime(kind);
        let token = self
            .codec
            .issue(&Claims::new(principal.id.to_string(), kind), lifetime)?;

        metrics::counter!("keygate_tokens_issued_total", "kind" => kind.label()).increment(1);

        Ok(IssuedToken {
            token,
            kind,
            expires_in: lifetime,
        })
    }

    /// Issue an access token, plus a refresh token unless `is_refresh`
    pub fn login(&self, principal: &Principal, is_refresh: bool) -> Result<TokenPair, AuthError> {
        let access = self.write_token(principal, TokenKind::AccessToken)?;
        let refresh = if is_refresh {
            None
        } else {
            Some(self.write_token(principal, TokenKind::RefreshToken)?)
        };

        tracing::debug!(principal_id = %principal.id, is_refresh, "Issued credentials");
        Ok(TokenPair { access, refresh })
    }

    /// New access token for a principal that presented a valid refresh token.
    ///
    /// The refresh token itself is kept, not reissued.
    pub fn refresh(&self, principal: &Principal) -> Result<IssuedToken, AuthError> {
        Ok(self.login(principal, true)?.access)
    }

    // =========================================================================
    // Read path
    // =========================================================================

    /// Check `token` as a `kind` token.
    ///
    /// Order: revocation, signature and claims, kind, principal lookup. Only
    /// an unreachable revocation store (unless failing open) or a database
    /// failure is an `Err`; every reason to distrust the token is `Rejected`.
    pub async fn validate(&self, token: &str, kind: TokenKind) -> Result<TokenOutcome, AuthError> {
        let outcome = self.check(token, kind).await?;

        if let TokenOutcome::Rejected(ref reason) = outcome {
            tracing::debug!(kind = %kind, reason = reason.reason(), "Token rejected");
        }
        metrics::counter!(
            "keygate_token_reads_total",
            "kind" => kind.label(),
            "outcome" => outcome.label()
        )
        .increment(1);

        Ok(outcome)
    }

    async fn check(&self, token: &str, kind: TokenKind) -> Result<TokenOutcome, AuthError> {
        match self.revocations.is_revoked(token).await {
            Ok(true) => return Ok(TokenOutcome::Rejected(AuthError::Revoked)),
            Ok(false) => {}
            Err(err) if self.revocation_fail_open => {
                tracing::warn!(error = %err, "Revocation store unavailable, accepting token unchecked");
            }
            Err(err) => return Err(err.into()),
        }

        let claims = match self.codec.verify(token) {
            Ok(claims) => claims,
            Err(err) => return Ok(TokenOutcome::Rejected(err)),
        };

        if claims.token_type != kind {
            return Ok(TokenOutcome::Rejected(AuthError::ClaimMismatch));
        }

        let Ok(principal_id) = PrincipalId::parse(&claims.sub) else {
            return Ok(TokenOutcome::Rejected(AuthError::PrincipalNotFound));
        };

        let Some(row) = self.principals.find_by_id(principal_id).await? else {
            return Ok(TokenOutcome::Rejected(AuthError::PrincipalNotFound));
        };

        let Some(expires_at) = DateTime::from_timestamp(claims.exp, 0) else {
            return Ok(TokenOutcome::Rejected(AuthError::ClaimMismatch));
        };

        Ok(TokenOutcome::Valid(AuthenticatedToken {
            principal: row.into(),
            token: token.to_string(),
            kind,
            expires_at,
        }))
    }

    /// Principal named by `token`, or `None` for any untrustworthy token
    pub async fn read_token(
        &self,
        token: &str,
        kind: TokenKind,
    ) -> Result<Option<AuthenticatedToken>, AuthError> {
        Ok(self.validate(token, kind).await?.into_valid())
    }

    // =========================================================================
    // Revocation
    // =========================================================================

    /// Revoke the access token and, when presented, the refresh token.
    ///
    /// Each entry lives exactly as long as the token it revokes. A refresh
    /// token that belongs to another principal is left alone.
    pub async fn logout(
        &self,
        principal_id: PrincipalId,
        access: &AuthenticatedToken,
        refresh: Option<&AuthenticatedToken>,
    ) -> Result<(), AuthError> {
        self.revoke(principal_id, access).await?;

        if let Some(refresh) = refresh {
            if refresh.principal.id == principal_id {
                self.revoke(principal_id, refresh).await?;
            } else {
                tracing::warn!(
                    principal_id = %principal_id,
                    refresh_principal_id = %refresh.principal.id,
                    "Refresh token belongs to another principal, not revoking it"
                );
            }
        }

        tracing::info!(principal_id = %principal_id, "Principal logged out");
        Ok(())
    }

    async fn revoke(&self, principal_id: PrincipalId, token: &AuthenticatedToken) -> Result<(), AuthError> {
        let ttl = token.remaining_ttl().as_secs();
        if ttl == 0 {
            return Ok(());
        }

        self.revocations.revoke(&token.token, principal_id, ttl).await?;
        metrics::counter!("keygate_revocations_total", "kind" => token.kind.label()).increment(1);
        Ok(())
    }
}

impl<U: PrincipalRepository + ?Sized, S: RevocationStore + ?Sized> std::fmt::Debug for TokenStrategy<U, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStrategy")
            .field("codec", &self.codec)
            .field("access_token_lifetime", &self.access_token_lifetime)
            .field("refresh_token_lifetime", &self.refresh_token_lifetime)
            .field("revocation_fail_open", &self.revocation_fail_open)
            .finish_non_exhaustive()
    }
}
