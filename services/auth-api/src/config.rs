//! Configuration for the Auth API service.

use std::str::FromStr;
use std::time::Duration;

use keygate_auth_core::{Algorithm, AuthConfig};
use keygate_axum::{CookieSettings, DEFAULT_REFRESH_COOKIE};
use keygate_db::RedisSettings;

/// Auth API configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,

    /// Database URL
    pub database_url: String,

    /// Deployment environment (`local`, `staging`, `production`, ...)
    pub environment: String,

    /// Cookie domain
    pub domain: Option<String>,

    /// Revocation store connection settings
    pub redis: RedisSettings,

    /// Token core configuration
    pub auth: AuthConfig,

    /// Name of the refresh token cookie
    pub refresh_cookie_name: String,

    /// Refuse unverified principals at login and on protected routes
    pub require_verification: bool,

    /// Request timeout for API routes
    pub request_timeout: Duration,

    /// Metrics enabled
    pub metrics_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Database
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let http_port = std::env::var("HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("HTTP_PORT"))?;

        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "local".to_string());
        let domain = std::env::var("DOMAIN").ok().filter(|d| !d.is_empty());

        // Revocation store
        let redis_host = std::env::var("REDIS_HOST").unwrap_or_else(|_| "localhost".to_string());

        let redis_port = std::env::var("REDIS_PORT")
            .unwrap_or_else(|_| "6379".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("REDIS_PORT"))?;

        let redis_databases = parse_list::<i64>(
            &std::env::var("REDIS_TOKEN_BLACKLIST_DB").unwrap_or_else(|_| "0".to_string()),
        )
        .ok_or(ConfigError::Invalid("REDIS_TOKEN_BLACKLIST_DB"))?;

        let redis_max_connections = std::env::var("REDIS_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("REDIS_MAX_CONNECTIONS"))?;

        let redis_timeout_secs: u64 = std::env::var("REDIS_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("REDIS_TIMEOUT_SECS"))?;

        let redis_command_timeout_ms: u64 = std::env::var("REDIS_COMMAND_TIMEOUT_MS")
            .unwrap_or_else(|_| "2000".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("REDIS_COMMAND_TIMEOUT_MS"))?;

        let mut redis = RedisSettings::new(redis_host, redis_port)
            .with_databases(redis_databases)
            .with_max_connections(redis_max_connections)
            .with_wait_timeout(Duration::from_secs(redis_timeout_secs))
            .with_command_timeout(Duration::from_millis(redis_command_timeout_ms));
        if let Some(password) = std::env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty()) {
            redis = redis.with_password(password);
        }

        // Signing keys
        let private_key_path = std::env::var("JWT_PRIVATE_KEY_PATH")
            .map_err(|_| ConfigError::Missing("JWT_PRIVATE_KEY_PATH"))?;
        let public_key_path = std::env::var("JWT_PUBLIC_KEY_PATH")
            .map_err(|_| ConfigError::Missing("JWT_PUBLIC_KEY_PATH"))?;

        let algorithm = Algorithm::from_str(
            &std::env::var("JWT_ALGORITHM").unwrap_or_else(|_| "RS256".to_string()),
        )
        .map_err(|_| ConfigError::Invalid("JWT_ALGORITHM"))?;

        let access_lifetime_secs: u64 = std::env::var("ACCESS_TOKEN_LIFETIME_SECONDS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("ACCESS_TOKEN_LIFETIME_SECONDS"))?;

        let refresh_lifetime_secs: u64 = std::env::var("REFRESH_TOKEN_LIFETIME_SECONDS")
            .unwrap_or_else(|_| "1209600".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("REFRESH_TOKEN_LIFETIME_SECONDS"))?;

        let revocation_fail_open = std::env::var("REVOCATION_FAIL_OPEN")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("REVOCATION_FAIL_OPEN"))?;

        let require_verification = std::env::var("REQUIRE_VERIFICATION")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("REQUIRE_VERIFICATION"))?;

        let refresh_cookie_name = std::env::var("REFRESH_COOKIE_NAME")
            .unwrap_or_else(|_| DEFAULT_REFRESH_COOKIE.to_string());

        // Request timeout (default 30 seconds)
        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("REQUEST_TIMEOUT_SECS"))?;

        // Metrics
        let metrics_enabled = std::env::var("METRICS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        let mut auth = AuthConfig::from_pem_files(&private_key_path, &public_key_path)
            .map_err(|e| ConfigError::AuthConfig(e.to_string()))?
            .with_algorithm(algorithm)
            .with_access_token_lifetime(Duration::from_secs(access_lifetime_secs))
            .with_refresh_token_lifetime(Duration::from_secs(refresh_lifetime_secs))
            .with_revocation_fail_open(revocation_fail_open);
        if let Ok(audience) = std::env::var("JWT_AUDIENCE") {
            auth = auth.with_audience(audience);
        }

        Ok(Self {
            http_port,
            database_url,
            environment,
            domain,
            redis,
            auth,
            refresh_cookie_name,
            require_verification,
            request_timeout: Duration::from_secs(request_timeout_secs),
            metrics_enabled,
        })
    }

    pub fn is_local(&self) -> bool {
        self.environment.eq_ignore_ascii_case("local")
    }

    /// Refresh cookie attributes for this deployment
    pub fn cookie_settings(&self) -> CookieSettings {
        let cookie = CookieSettings::new()
            .name(&self.refresh_cookie_name)
            .secure(!self.is_local())
            .max_age(self.auth.refresh_token_lifetime);

        match &self.domain {
            Some(domain) => cookie.domain(domain),
            None => cookie,
        }
    }
}

/// Parse a comma-separated list, ignoring blanks. `None` if any item is
/// invalid or the list is empty.
fn parse_list<T: FromStr>(raw: &str) -> Option<Vec<T>> {
    let items = raw
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| item.parse().ok())
        .collect::<Option<Vec<T>>>()?;

    (!items.is_empty()).then_some(items)
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Auth config error: {0}")]
    AuthConfig(String),
}
