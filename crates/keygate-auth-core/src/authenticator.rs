//! Policy-driven principal resolution
//!
//! A [`Resolver`] is built once per route from an [`AuthPolicy`]. It knows
//! which credentials the transport must extract and applies the policy flags
//! in a fixed order, so every combination of flags shares one code path.

use keygate_db::{PrincipalRepository, RevocationStore};
use keygate_types::{PolicyDenial, TokenKind};

use crate::strategy::{AuthenticatedToken, TokenStrategy};
use crate::AuthError;

/// What a route demands of the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthPolicy {
    /// Kind of token that authenticates the request
    pub kind: TokenKind,
    /// Resolve to `None` instead of failing
    pub optional: bool,
    /// Principal must be active
    pub active: bool,
    /// Principal must have verified its email
    pub verified: bool,
    /// Principal must be a superuser
    pub superuser: bool,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            kind: TokenKind::AccessToken,
            optional: false,
            active: true,
            verified: true,
            superuser: false,
        }
    }
}

impl AuthPolicy {
    /// Default policy for tokens of `kind`
    #[must_use]
    pub fn new(kind: TokenKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    #[must_use]
    pub fn verified(mut self, verified: bool) -> Self {
        self.verified = verified;
        self
    }

    #[must_use]
    pub fn superuser(mut self, superuser: bool) -> Self {
        self.superuser = superuser;
        self
    }
}

/// Transport fields a resolver reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialFields {
    /// Bearer field
    pub access: bool,
    /// Refresh cookie
    pub refresh: bool,
}

impl CredentialFields {
    pub fn for_kind(kind: TokenKind) -> Self {
        Self {
            access: true,
            refresh: kind == TokenKind::RefreshToken,
        }
    }
}

/// Raw tokens pulled from a request
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

impl Credentials {
    /// Token carried in the field for `kind`
    pub fn token(&self, kind: TokenKind) -> Option<&str> {
        match kind {
            TokenKind::AccessToken => self.access.as_deref(),
            TokenKind::RefreshToken => self.refresh.as_deref(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access", &self.access.is_some())
            .field("refresh", &self.refresh.is_some())
            .finish()
    }
}

/// Resolves the principal for one policy
#[derive(Debug, Clone, Copy)]
pub struct Resolver {
    policy: AuthPolicy,
    fields: CredentialFields,
}

impl Resolver {
    pub fn new(policy: AuthPolicy) -> Self {
        Self {
            fields: CredentialFields::for_kind(policy.kind),
            policy,
        }
    }

    pub fn policy(&self) -> &AuthPolicy {
        &self.policy
    }

    /// Fields the transport must extract for this resolver
    pub fn fields(&self) -> CredentialFields {
        self.fields
    }

    /// Validate the credential of the required kind and apply the policy.
    ///
    /// An inactive principal counts as absent (401). An unverified principal
    /// or a missing superuser flag is a 403. With `optional`, both resolve to
    /// `Ok(None)`. A revocation store outage is never masked.
    pub async fn resolve<U, S>(
        &self,
        strategy: &TokenStrategy<U, S>,
        credentials: &Credentials,
    ) -> Result<Option<AuthenticatedToken>, AuthError>
    where
        U: PrincipalRepository + ?Sized,
        S: RevocationStore + ?Sized,
    {
        let policy = &self.policy;
        let authenticated = match credentials.token(policy.kind) {
            Some(token) => strategy.read_token(token, policy.kind).await?,
            None => None,
        };

        let mut failure = AuthError::Unauthenticated;
        let authenticated = match authenticated {
            Some(auth) if policy.active && !auth.principal.is_active => {
                failure = AuthError::PolicyDenied(PolicyDenial::Inactive);
                None
            }
            Some(auth) if policy.verified && !auth.principal.is_verified => {
                failure = AuthError::PolicyDenied(PolicyDenial::Unverified);
                None
            }
            Some(auth) if policy.superuser && !auth.principal.is_superuser => {
                failure = AuthError::PolicyDenied(PolicyDenial::NotSuperuser);
                None
            }
            other => other,
        };

        match authenticated {
            Some(auth) => Ok(Some(auth)),
            None if policy.optional => Ok(None),
            None => {
                tracing::debug!(kind = %policy.kind, reason = failure.reason(), "Authentication failed");
                Err(failure)
            }
        }
    }
}
