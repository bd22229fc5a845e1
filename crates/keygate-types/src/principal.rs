//! Principal types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ParseError;

/// Unique principal identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub Uuid);

impl PrincipalId {
    /// Create a new random principal ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a principal ID from a string
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| ParseError::InvalidPrincipalId(s.to_string()))
    }

    /// The underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PrincipalId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for PrincipalId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// An authenticated identity as seen by the auth core.
///
/// Owned by the user store; the auth core only reads the flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub email: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub is_superuser: bool,
}

impl Principal {
    /// Create an active, unverified, non-superuser principal
    pub fn new(id: PrincipalId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            is_active: true,
            is_verified: false,
            is_superuser: false,
        }
    }

    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    #[must_use]
    pub fn with_verified(mut self, verified: bool) -> Self {
        self.is_verified = verified;
        self
    }

    #[must_use]
    pub fn with_superuser(mut self, superuser: bool) -> Self {
        self.is_superuser = superuser;
        self
    }
}
