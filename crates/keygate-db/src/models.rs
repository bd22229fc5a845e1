//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.

use chrono::{DateTime, Utc};
use keygate_types::{Principal, PrincipalId};
use sqlx::FromRow;
use uuid::Uuid;

/// Principal row from the `users` table
#[derive(Clone, FromRow)]
pub struct PrincipalRow {
    pub id: Uuid,
    pub email: String,
    pub hashed_password: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PrincipalRow {
    pub fn principal_id(&self) -> PrincipalId {
        PrincipalId(self.id)
    }

    /// Domain view of this row, without the password hash
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.principal_id(),
            email: self.email.clone(),
            is_active: self.is_active,
            is_verified: self.is_verified,
            is_superuser: self.is_superuser,
        }
    }
}

impl From<PrincipalRow> for Principal {
    fn from(row: PrincipalRow) -> Self {
        Self {
            id: PrincipalId(row.id),
            email: row.email,
            is_active: row.is_active,
            is_verified: row.is_verified,
            is_superuser: row.is_superuser,
        }
    }
}

impl std::fmt::Debug for PrincipalRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrincipalRow")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("is_active", &self.is_active)
            .field("is_verified", &self.is_verified)
            .field("is_superuser", &self.is_superuser)
            .finish_non_exhaustive()
    }
}
