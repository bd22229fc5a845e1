//! Common test utilities for keygate-axum integration tests

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use keygate_auth_core::{AuthConfig, TokenStrategy};
use keygate_db::{DbResult, MemoryRevocationStore, PrincipalRepository, PrincipalRow};
use keygate_types::{Principal, PrincipalId};
use uuid::Uuid;

const PRIVATE_PEM: &str = include_str!("../../../keygate-auth-core/tests/fixtures/rsa_private.pem");
const PUBLIC_PEM: &str = include_str!("../../../keygate-auth-core/tests/fixtures/rsa_public.pem");

/// In-memory principal repository for testing
#[derive(Default)]
pub struct MockPrincipalRepository {
    principals: DashMap<Uuid, PrincipalRow>,
}

impl MockPrincipalRepository {
    pub fn add(&self, active: bool, verified: bool, superuser: bool) -> Principal {
        let row = PrincipalRow {
            id: Uuid::new_v4(),
            email: format!("test-{}@example.com", Uuid::new_v4()),
            hashed_password: String::new(),
            is_active: active,
            is_verified: verified,
            is_superuser: superuser,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let principal = row.principal();
        self.principals.insert(row.id, row);
        principal
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

pub type TestStrategy = TokenStrategy<dyn PrincipalRepository, MemoryRevocationStore>;

/// Strategy over trait-object principals, as the service wires it
pub fn test_strategy() -> (Arc<TestStrategy>, Arc<MockPrincipalRepository>, Arc<MemoryRevocationStore>) {
    let principals = Arc::new(MockPrincipalRepository::default());
    let revocations = Arc::new(MemoryRevocationStore::default());
    let dyn_principals: Arc<dyn PrincipalRepository> = principals.clone();
    let strategy = TokenStrategy::from_config(
        &AuthConfig::new(PRIVATE_PEM, PUBLIC_PEM),
        dyn_principals,
        Arc::clone(&revocations),
    )
    .expect("test keys load");
    (Arc::new(strategy), principals, revocations)
}
