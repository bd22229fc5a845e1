//! PostgreSQL principal repository implementation

use async_trait::async_trait;
use keygate_types::PrincipalId;
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::PrincipalRow;
use crate::repo::PrincipalRepository;

/// PostgreSQL principal repository
#[derive(Clone)]
pub struct PgPrincipalRepository {
    pool: PgPool,
}

impl PgPrincipalRepository {
    /// Create a new principal repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrincipalRepository for PgPrincipalRepository {
    async fn find_by_id(&self, id: PrincipalId) -> DbResult<Option<PrincipalRow>> {
        let principal = sqlx::query_as::<_, PrincipalRow>(
            r#"
            SELECT id, email, hashed_password, is_active, is_verified, is_superuser,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(principal)
    }

    async fn find_by_email(&self, email: &str) -> DbResult<Option<PrincipalRow>> {
        let principal = sqlx::query_as::<_, PrincipalRow>(
            r#"
            SELECT id, email, hashed_password, is_active, is_verified, is_superuser,
                   created_at, updated_at
            FROM users
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(principal)
    }

    async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

impl std::fmt::Debug for PgPrincipalRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgPrincipalRepository").finish_non_exhaustive()
    }
}
