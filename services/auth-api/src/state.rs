//! Application state

use std::sync::Arc;

use keygate_auth_core::{AuthPolicy, TokenStrategy};
use keygate_axum::{AuthLayer, Transport};
use keygate_db::{PrincipalRepository, RevocationStore};
use keygate_types::TokenKind;

use crate::config::Config;

/// Token strategy over swappable stores
pub type Strategy = TokenStrategy<dyn PrincipalRepository, dyn RevocationStore>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Issues, validates and revokes tokens
    pub strategy: Arc<Strategy>,
    /// How tokens travel to and from the client
    pub transport: Arc<dyn Transport>,
    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state
    pub fn new(strategy: Strategy, transport: Arc<dyn Transport>, config: Config) -> Self {
        Self {
            strategy: Arc::new(strategy),
            transport,
            config: Arc::new(config),
        }
    }

    pub fn principals(&self) -> &Arc<dyn PrincipalRepository> {
        self.strategy.principals()
    }

    pub fn revocations(&self) -> &Arc<dyn RevocationStore> {
        self.strategy.revocations()
    }

    /// Authentication layer for routes requiring a token of `kind`
    pub fn auth_layer(&self, kind: TokenKind) -> AuthLayer<dyn PrincipalRepository, dyn RevocationStore> {
        let policy = AuthPolicy::new(kind).verified(self.config.require_verification);
        AuthLayer::new(Arc::clone(&self.strategy), Arc::clone(&self.transport), policy)
    }

    /// Get request timeout from config
    pub fn request_timeout(&self) -> std::time::Duration {
        self.config.request_timeout
    }
}
