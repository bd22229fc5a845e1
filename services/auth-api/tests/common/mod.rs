//! Common test utilities for auth-api integration tests

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use auth_api::{build_router, AppState, Config, Strategy};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use chrono::Utc;
use dashmap::DashMap;
use keygate_auth_core::{hash_password, AuthConfig};
use keygate_axum::{BearerTransport, Transport};
use keygate_db::{
    DbResult, MemoryRevocationStore, PrincipalRepository, PrincipalRow, RedisSettings,
    RevocationStore,
};
use keygate_types::{Principal, PrincipalId};
use uuid::Uuid;

const PRIVATE_PEM: &str =
    include_str!("../../../../crates/keygate-auth-core/tests/fixtures/rsa_private.pem");
const PUBLIC_PEM: &str =
    include_str!("../../../../crates/keygate-auth-core/tests/fixtures/rsa_public.pem");

pub const PASSWORD: &str = "correct-horse-battery-staple";

/// Argon2 is slow; hash the shared test password once
fn password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(PASSWORD).expect("hash test password"))
}

/// In-memory principal repository for testing
#[derive(Default)]
pub struct MockPrincipalRepository {
    principals: DashMap<Uuid, PrincipalRow>,
}

impl MockPrincipalRepository {
    /// Add a principal whose password is [`PASSWORD`]
    pub fn add(&self, email: &str, active: bool, verified: bool) -> Principal {
        let row = PrincipalRow {
            id: Uuid::new_v4(),
            email: email.to_string(),
            hashed_password: password_hash().to_string(),
            is_active: active,
            is_verified: verified,
            is_superuser: false,
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

pub struct TestApp {
    pub router: Router,
    pub principals: Arc<MockPrincipalRepository>,
    pub revocations: Arc<MemoryRevocationStore>,
}

pub fn test_config(require_verification: bool) -> Config {
    Config {
        http_port: 8080,
        database_url: "postgres://localhost/keygate_test".to_string(),
        environment: "local".to_string(),
        domain: None,
        redis: RedisSettings::new("localhost", 6379),
        auth: AuthConfig::new(PRIVATE_PEM, PUBLIC_PEM),
        refresh_cookie_name: "refresh_token".to_string(),
        require_verification,
        request_timeout: Duration::from_secs(30),
        metrics_enabled: false,
    }
}

/// Full router over in-memory stores
pub fn test_app(require_verification: bool) -> TestApp {
    let config = test_config(require_verification);
    let principals = Arc::new(MockPrincipalRepository::default());
    let revocations = Arc::new(MemoryRevocationStore::default());

    let dyn_principals: Arc<dyn PrincipalRepository> = principals.clone();
    let dyn_revocations: Arc<dyn RevocationStore> = revocations.clone();
    let strategy = Strategy::from_config(&config.auth, dyn_principals, dyn_revocations)
        .expect("test keys load");
    let transport: Arc<dyn Transport> = Arc::new(BearerTransport::new(config.cookie_settings()));

    let router = build_router(AppState::new(strategy, transport, config), None);
    TestApp {
        router,
        principals,
        revocations,
    }
}

pub fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("username={}&password={}", username, password)))
        .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// `name=value` part of a `Set-Cookie` header
pub fn set_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap_or_default().to_string()
}
