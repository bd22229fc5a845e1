//! Common test utilities for keygate-auth-core integration tests

pub mod keys;
pub mod mock_repos;

#[allow(unused_imports)]
pub use keys::{test_config, test_strategy, EC_PRIVATE_PEM, EC_PUBLIC_PEM, OTHER_PRIVATE_PEM, OTHER_PUBLIC_PEM, PRIVATE_PEM, PUBLIC_PEM};
#[allow(unused_imports)]
pub use mock_repos::{FailingRevocationStore, MockPrincipalRepository};
