//! Mock repositories for testing

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use keygate_db::{
    DbResult, PrincipalRepository, PrincipalRow, RevocationStore, StoreError, StoreResult,
};
use keygate_types::{Principal, PrincipalId};
use std::sync::Arc;
use uuid::Uuid;

/// In-memory principal repository for testing
#[derive(Default, Clone)]
pub struct MockPrincipalRepository {
    principals: Arc<DashMap<Uuid, PrincipalRow>>,
}

impl MockPrincipalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a test principal directly
    pub fn insert(&self, row: PrincipalRow) {
        self.principals.insert(row.id, row);
    }

    /// Insert a principal with the given flags and return its domain view
    #[allow(dead_code)]
    pub fn add(&self, active: bool, verified: bool, superuser: bool) -> Principal {
        let row = Self::create_test_principal(active, verified, superuser);
        let principal = row.principal();
        self.insert(row);
        principal
    }

    #[allow(dead_code)]
    pub fn remove(&self, id: PrincipalId) {
        self.principals.remove(&id.as_uuid());
    }

    /// Create a test principal row with the given flags
    pub fn create_test_principal(active: bool, verified: bool, superuser: bool) -> PrincipalRow {
        PrincipalRow {
            id: Uuid::new_v4(),
            email: format!("test-{}@example.com", Uuid::new_v4()),
            hashed_password: String::new(),
            is_active: active,
            is_verified: verified,
            is_superuser: superuser,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

#[async_trait]
impl PrincipalRepository for MockPrincipalRepository {
    async fn find_by_id(&self, id: PrincipalId) -> DbResult<Option<PrincipalRow>> {
        Ok(self.principals.get(&id.as_uuid()).map(|r| r.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> DbResult<Option<PrincipalRow>> {
        Ok(self
            .principals
            .iter()
            .find(|r| r.value().email.eq_ignore_ascii_case(email))
            .map(|r| r.value().clone()))
    }
}

/// Revocation store whose backend is always down
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingRevocationStore;

#[async_trait]
impl RevocationStore for FailingRevocationStore {
    async fn is_revoked(&self, _token: &str) -> StoreResult<bool> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn revoke(&self, _token: &str, _principal_id: PrincipalId, _ttl_secs: u64) -> StoreResult<()> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn clear(&self) -> StoreResult<bool> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn close(&self) {}

    async fn ping(&self) -> StoreResult<()> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}
