//! Keygate Axum Integration
//!
//! Carries Keygate tokens over HTTP and authenticates axum routes.
//!
//! - **Transport**: [`BearerTransport`] puts access tokens in the
//!   `Authorization` header and refresh tokens in an HTTP-only cookie
//! - **Middleware**: [`AuthLayer`] resolves the principal for an
//!   [`AuthPolicy`](keygate_auth_core::AuthPolicy)
//! - **Extractors**: [`CurrentPrincipal`], [`MaybePrincipal`]
//!
//! # Quick Start
//!
//! ```ignore
//! use keygate_auth_core::AuthPolicy;
//! use keygate_axum::{AuthLayer, BearerTransport, CurrentPrincipal};
//! use axum::{Router, routing::get};
//!
//! async fn me(auth: CurrentPrincipal) -> String {
//!     format!("Hello, {}!", auth.principal.email)
//! }
//!
//! let app = Router::new()
//!     .route("/me", get(me))
//!     .route_layer(AuthLayer::new(strategy, transport, AuthPolicy::default()));
//! ```

pub mod error;
pub mod extractors;
pub mod layer;
pub mod transport;

pub use error::AuthRejection;
pub use extractors::{CurrentPrincipal, MaybePrincipal};
pub use layer::{AuthLayer, AuthMiddleware};
pub use transport::{bearer_token, BearerTransport, CookieSettings, SameSite, Transport, DEFAULT_REFRESH_COOKIE};
