//! Test key material and ready-made strategies

use std::sync::Arc;

use keygate_auth_core::{AuthConfig, TokenStrategy};
use keygate_db::MemoryRevocationStore;

use super::MockPrincipalRepository;

pub const PRIVATE_PEM: &str = include_str!("../fixtures/rsa_private.pem");
pub const PUBLIC_PEM: &str = include_str!("../fixtures/rsa_public.pem");
#[allow(dead_code)]
pub const OTHER_PRIVATE_PEM: &str = include_str!("../fixtures/rsa_other_private.pem");
#[allow(dead_code)]
pub const OTHER_PUBLIC_PEM: &str = include_str!("../fixtures/rsa_other_public.pem");
#[allow(dead_code)]
pub const EC_PRIVATE_PEM: &str = include_str!("../fixtures/ec_private.pem");
#[allow(dead_code)]
pub const EC_PUBLIC_PEM: &str = include_str!("../fixtures/ec_public.pem");

/// RS256 config with the default lifetimes
pub fn test_config() -> AuthConfig {
    AuthConfig::new(PRIVATE_PEM, PUBLIC_PEM)
}

/// Strategy over a mock principal store and an in-memory revocation store
#[allow(dead_code)]
pub fn test_strategy() -> (
    TokenStrategy<MockPrincipalRepository, MemoryRevocationStore>,
    Arc<MockPrincipalRepository>,
    Arc<MemoryRevocationStore>,
) {
    let principals = Arc::new(MockPrincipalRepository::new());
    let revocations = Arc::new(MemoryRevocationStore::default());
    let strategy = TokenStrategy::from_config(
        &test_config(),
        Arc::clone(&principals),
        Arc::clone(&revocations),
    )
    .expect("test keys load");
    (strategy, principals, revocations)
}
