//! How tokens travel between client and server.
//!
//! The access token rides in the `Authorization: Bearer` header and the
//! response body; the refresh token rides in an HTTP-only cookie.

use std::time::Duration;

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use keygate_auth_core::{AuthError, CredentialFields, Credentials, IssuedToken};
use keygate_types::BearerTokenResponse;

/// Default refresh cookie name
pub const DEFAULT_REFRESH_COOKIE: &str = "refresh_token";

/// Encodes issued tokens into responses and reads them back from requests.
pub trait Transport: Send + Sync {
    /// Response carrying a fresh access token and, if present, a refresh token
    fn login_response(&self, access: &IssuedToken, refresh: Option<&IssuedToken>) -> Response;

    /// Response that clears client-held credentials.
    ///
    /// Transports without a clearable channel return
    /// [`AuthError::TransportUnsupported`].
    fn logout_response(&self) -> Result<Response, AuthError> {
        Err(AuthError::TransportUnsupported)
    }

    /// Access token from the bearer field
    fn read_access(&self, headers: &HeaderMap) -> Option<String>;

    /// Refresh token from the secondary channel
    fn read_refresh(&self, _headers: &HeaderMap) -> Option<String> {
        None
    }

    /// Read only the fields a resolver asked for
    fn extract(&self, headers: &HeaderMap, fields: CredentialFields) -> Credentials {
        Credentials {
            access: fields.access.then(|| self.read_access(headers)).flatten(),
            refresh: fields.refresh.then(|| self.read_refresh(headers)).flatten(),
        }
    }
}

/// `SameSite` cookie attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

/// Attributes of the refresh cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettings {
    pub name: String,
    pub domain: Option<String>,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    /// Used when the issued token does not say how long it lives
    pub max_age: Duration,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_REFRESH_COOKIE.to_string(),
            domain: None,
            path: "/".to_string(),
            secure: true,
            http_only: true,
            same_site: SameSite::Lax,
            max_age: Duration::from_secs(14 * 24 * 60 * 60),
        }
    }
}

impl CookieSettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    #[must_use]
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// `Set-Cookie` value for `value` living `max_age`
    pub fn header_value(&self, value: &str, max_age: Duration) -> String {
        let mut cookie = format!(
            "{}={}; Max-Age={}; Path={}",
            self.name,
            value,
            max_age.as_secs(),
            self.path
        );
        if let Some(domain) = &self.domain {
            cookie.push_str("; Domain=");
            cookie.push_str(domain);
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        cookie.push_str("; SameSite=");
        cookie.push_str(self.same_site.as_str());
        cookie
    }

    /// `Set-Cookie` value that deletes the cookie
    pub fn clear_value(&self) -> String {
        self.header_value("", Duration::ZERO)
    }

    /// This cookie's value from the request's `Cookie` headers
    pub fn read(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.name)
            .map(|(_, value)| value.trim_matches('"').to_string())
            .filter(|value| !value.is_empty())
    }
}

/// Token from an `Authorization: Bearer <token>` header (scheme is
/// case-insensitive)
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

/// Bearer header for access tokens, cookie for refresh tokens
#[derive(Debug, Clone, Default)]
pub struct BearerTransport {
    cookie: CookieSettings,
}

impl BearerTransport {
    pub fn new(cookie: CookieSettings) -> Self {
        Self { cookie }
    }

    pub fn cookie(&self) -> &CookieSettings {
        &self.cookie
    }
}

impl Transport for BearerTransport {
    fn login_response(&self, access: &IssuedToken, refresh: Option<&IssuedToken>) -> Response {
        let body = Json(BearerTokenResponse::new(access.token.clone()));

        match refresh {
            Some(refresh) => {
                let max_age = if refresh.expires_in.is_zero() {
                    self.cookie.max_age
                } else {
                    refresh.expires_in
                };
                let cookie = self.cookie.header_value(&refresh.token, max_age);
                (StatusCode::OK, [(header::SET_COOKIE, cookie)], body).into_response()
            }
            None => (StatusCode::OK, body).into_response(),
        }
    }

    fn logout_response(&self) -> Result<Response, AuthError> {
        Ok((
            StatusCode::NO_CONTENT,
            [(header::SET_COOKIE, self.cookie.clear_value())],
        )
            .into_response())
    }

    fn read_access(&self, headers: &HeaderMap) -> Option<String> {
        bearer_token(headers)
    }

    fn read_refresh(&self, headers: &HeaderMap) -> Option<String> {
        self.cookie.read(headers)
    }
}
