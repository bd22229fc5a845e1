//! Axum extractors for the principal resolved by [`AuthLayer`](crate::AuthLayer).
//!
//! # Usage
//!
//! ```ignore
//! use keygate_axum::{CurrentPrincipal, MaybePrincipal};
//!
//! // 401 if the layer did not resolve a principal
//! async fn me(auth: CurrentPrincipal) -> String {
//!     auth.principal.email.clone()
//! }
//!
//! // Routes behind an optional policy
//! async fn greet(auth: MaybePrincipal) -> String {
//!     match auth.0 {
//!         Some(token) => format!("Hello, {}!", token.principal.email),
//!         None => "Hello, guest!".to_string(),
//!     }
//! }
//! ```

use std::ops::Deref;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use keygate_auth_core::AuthenticatedToken;

use crate::error::AuthRejection;

/// Extractor that requires an authenticated principal.
///
/// Returns 401 Unauthorized if the request was not authenticated.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub AuthenticatedToken);

impl Deref for CurrentPrincipal {
    type Target = AuthenticatedToken;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedToken>()
            .cloned()
            .map(Self)
            .ok_or_else(AuthRejection::unauthenticated)
    }
}

/// Extractor for optional authentication.
#[derive(Debug, Clone)]
pub struct MaybePrincipal(pub Option<AuthenticatedToken>);

impl Deref for MaybePrincipal {
    type Target = Option<AuthenticatedToken>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for MaybePrincipal
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<AuthenticatedToken>().cloned()))
    }
}
